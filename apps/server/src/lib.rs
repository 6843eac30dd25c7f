//! CondoZap Server Library
//!
//! WhatsApp notification dispatch for condominium management. The HTTP
//! wiring lives here so the binary and the integration tests mount the
//! same application.

pub mod auth;
pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;

use actix_cors::Cors;
use actix_web::{http::header, web};

use crate::error::AppError;

/// Registers every route and the extractor error handlers.
///
/// Shared state (`DbPool`, `Config`, `NotificationDispatcher`,
/// `BatchRunner`) is registered by the caller.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid path parameter: {}", err)).into()
    }))
    // Health check routes (no auth required)
    .configure(routes::health::configure)
    .configure(routes::dispatch::configure)
    .configure(routes::jobs::configure)
    .configure(routes::gateway::configure)
    .configure(routes::templates::configure)
    .configure(routes::deliveries::configure)
    .configure(routes::tokens::configure);
}

/// Permissive CORS: the dashboard and edge callers run on other origins
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-client-info"),
            header::HeaderName::from_static("apikey"),
        ])
        .max_age(3600)
}
