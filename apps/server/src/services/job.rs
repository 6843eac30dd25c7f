use chrono::Utc;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{JobControl, JobExecutionLog, JobStatus, TriggerType};

const LOG_COLUMNS: &str = "id, function_name, trigger_type, status, started_at, ended_at, \
                           duration_ms, result_summary, error_message";

/// Hard cap on log rows returned by one listing
const MAX_LOG_LIMIT: i64 = 100;

pub struct JobService;

impl JobService {
    /// Inserts a `running` log row for a new run
    pub async fn start(
        pool: &PgPool,
        function_name: &str,
        trigger: TriggerType,
    ) -> AppResult<JobExecutionLog> {
        let log = sqlx::query_as::<_, JobExecutionLog>(&format!(
            r#"
            INSERT INTO job_execution_logs (function_name, trigger_type, status)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            LOG_COLUMNS
        ))
        .bind(function_name)
        .bind(trigger)
        .bind(JobStatus::Running)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// Closes a run with its final status; duration is measured from `started_at`
    pub async fn finish(
        pool: &PgPool,
        log: &JobExecutionLog,
        status: JobStatus,
        summary: Option<serde_json::Value>,
        error_message: Option<&str>,
    ) -> AppResult<JobExecutionLog> {
        let ended_at = Utc::now();
        let duration_ms = (ended_at - log.started_at).num_milliseconds().max(0);

        let log = sqlx::query_as::<_, JobExecutionLog>(&format!(
            r#"
            UPDATE job_execution_logs
            SET status = $2, ended_at = $3, duration_ms = $4, result_summary = $5, error_message = $6
            WHERE id = $1
            RETURNING {}
            "#,
            LOG_COLUMNS
        ))
        .bind(log.id)
        .bind(status)
        .bind(ended_at)
        .bind(duration_ms)
        .bind(summary)
        .bind(error_message)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// Recent runs of a job, newest first
    pub async fn list_logs(
        pool: &PgPool,
        function_name: &str,
        limit: i64,
    ) -> AppResult<Vec<JobExecutionLog>> {
        if limit < 1 {
            return Err(AppError::Validation(
                "limit must be a positive number".to_string(),
            ));
        }

        let logs = sqlx::query_as::<_, JobExecutionLog>(&format!(
            "SELECT {} FROM job_execution_logs WHERE function_name = $1 ORDER BY started_at DESC, id DESC LIMIT $2",
            LOG_COLUMNS
        ))
        .bind(function_name)
        .bind(limit.min(MAX_LOG_LIMIT))
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    /// Reads the pause flag. Jobs without a control row are not paused.
    pub async fn is_paused(pool: &PgPool, function_name: &str) -> AppResult<bool> {
        let paused: Option<(bool,)> =
            sqlx::query_as("SELECT paused FROM job_controls WHERE function_name = $1")
                .bind(function_name)
                .fetch_optional(pool)
                .await?;

        Ok(paused.is_some_and(|(p,)| p))
    }

    /// Sets the pause flag, creating the control row if needed
    pub async fn set_paused(
        pool: &PgPool,
        function_name: &str,
        paused: bool,
    ) -> AppResult<JobControl> {
        let control = sqlx::query_as::<_, JobControl>(
            r#"
            INSERT INTO job_controls (function_name, paused)
            VALUES ($1, $2)
            ON CONFLICT (function_name)
            DO UPDATE SET paused = EXCLUDED.paused, updated_at = NOW()
            RETURNING function_name, paused, updated_at
            "#,
        )
        .bind(function_name)
        .bind(paused)
        .fetch_one(pool)
        .await?;

        log::info!(
            "Job {} {}",
            function_name,
            if paused { "paused" } else { "resumed" }
        );

        Ok(control)
    }
}
