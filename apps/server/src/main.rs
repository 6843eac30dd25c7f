use actix_web::{middleware, web, App, HttpServer};

use condozap::batch::BatchRunner;
use condozap::bootstrap;
use condozap::config;
use condozap::db;
use condozap::services::whatsapp::build_http_client;
use condozap::services::NotificationDispatcher;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load configuration
    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Starting CondoZap server on {}:{}", config.host, config.port);

    // Create database pool
    let db_pool = db::create_pool(&config.database).await.map_err(|e| {
        log::error!("Database pool error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // Run migrations
    db::run_migrations(&db_pool).await.map_err(|e| {
        log::error!("Migration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // Bootstrap: create initial admin token if none exist
    match bootstrap::create_admin_token_if_needed(&db_pool).await {
        Ok(Some(token)) => {
            // Print to stderr directly (not logs) to avoid token in log aggregators
            eprintln!();
            eprintln!("==============================================");
            eprintln!("BOOTSTRAP ADMIN TOKEN CREATED - SAVE THIS NOW!");
            eprintln!("Token: {}", token.token);
            eprintln!("This token will NOT be shown again.");
            eprintln!("==============================================");
            eprintln!();
        }
        Ok(None) => {}
        Err(e) => log::error!("Failed to bootstrap admin token: {}", e),
    }

    if config.security.cron_secret.is_none() {
        log::warn!("CRON_SECRET not set, batch runs can only be triggered with an admin token");
    }

    // One HTTP client for every gateway call
    let client = build_http_client(config.dispatch.http_timeout).map_err(|e| {
        log::error!("HTTP client error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let dispatcher = NotificationDispatcher::new(db_pool.clone(), client, config.dispatch.clone());
    let runner = BatchRunner::new(dispatcher.clone());

    // Clone values for the closure
    let host = config.host.clone();
    let port = config.port;

    let server = HttpServer::new(move || {
        App::new()
            // Share state with all handlers
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(runner.clone()))
            // Middleware
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(condozap::cors())
            .configure(condozap::configure_app)
    })
    .bind((host.as_str(), port))?
    .shutdown_timeout(30)
    .run();

    // Spawn graceful shutdown handler
    let server_handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                // Wait forever if signal handler fails
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
