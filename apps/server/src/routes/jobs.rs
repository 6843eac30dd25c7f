use actix_web::{web, HttpResponse};

use crate::auth::{AuthenticatedCaller, SchedulerAuth};
use crate::batch::BatchRunner;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{ListJobLogsQuery, NotificationType, RunJobQuery};
use crate::services::JobService;

/// POST /api/jobs/{notification_type}/run - Trigger a batch run
pub async fn run_job(
    auth: SchedulerAuth,
    runner: web::Data<BatchRunner>,
    path: web::Path<String>,
    query: web::Query<RunJobQuery>,
) -> AppResult<HttpResponse> {
    let notification_type: NotificationType = path.into_inner().parse()?;

    let result = runner
        .run_scheduled(notification_type, query.date, auth.trigger)
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/jobs/{notification_type}/logs - Recent runs
pub async fn list_logs(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    query: web::Query<ListJobLogsQuery>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let notification_type: NotificationType = path.into_inner().parse()?;
    let logs = JobService::list_logs(
        pool.get_ref(),
        &notification_type.function_name(),
        query.limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(logs))
}

/// POST /api/jobs/{notification_type}/pause
pub async fn pause_job(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    set_paused(caller, pool, path, true).await
}

/// POST /api/jobs/{notification_type}/resume
pub async fn resume_job(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    set_paused(caller, pool, path, false).await
}

async fn set_paused(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    paused: bool,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let notification_type: NotificationType = path.into_inner().parse()?;
    let control =
        JobService::set_paused(pool.get_ref(), &notification_type.function_name(), paused).await?;

    Ok(HttpResponse::Ok().json(control))
}

/// Configure job routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/jobs/{notification_type}")
            .route("/run", web::post().to(run_job))
            .route("/logs", web::get().to(list_logs))
            .route("/pause", web::post().to(pause_job))
            .route("/resume", web::post().to(resume_job)),
    );
}
