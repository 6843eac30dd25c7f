use chrono::{NaiveDate, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{
    GatewayConfig, ItemStatus, JobExecutionLog, JobItemResult, JobRunResult, JobStatus,
    JobSummary, NotificationTarget, NotificationType, TriggerType,
};
use crate::services::whatsapp::create_adapter;
use crate::services::{GatewayService, JobService, NotificationDispatcher, TargetService};

/// Runs scheduled notifications for one type, one target at a time
#[derive(Clone)]
pub struct BatchRunner {
    dispatcher: NotificationDispatcher,
}

impl BatchRunner {
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Runs one batch and records it in the job log.
    ///
    /// `window` defaults to the type's own window (tomorrow for reminders,
    /// today for packages) in the recipients' offset.
    pub async fn run_scheduled(
        &self,
        notification_type: NotificationType,
        window: Option<NaiveDate>,
        trigger: TriggerType,
    ) -> AppResult<JobRunResult> {
        if !notification_type.is_schedulable() {
            return Err(AppError::Validation(format!(
                "'{}' notifications cannot be scheduled",
                notification_type
            )));
        }

        let pool = self.dispatcher.pool();
        let function_name = notification_type.function_name();

        // 1. Open the log row
        let log = JobService::start(pool, &function_name, trigger).await?;

        // 2. Pause flag
        if JobService::is_paused(pool, &function_name).await? {
            log::info!("{} is paused, skipping run", function_name);
            JobService::finish(
                pool,
                &log,
                JobStatus::Skipped,
                Some(serde_json::json!({"message": "Function is paused"})),
                None,
            )
            .await?;
            return Ok(JobRunResult::paused());
        }

        // 3..7. Everything else closes the log as an error on failure
        match self.execute(notification_type, window).await {
            Ok(summary) => {
                let (status, error_message) = if summary.all_failed() {
                    (
                        JobStatus::Error,
                        Some(format!("All {} delivery attempts failed", summary.failed)),
                    )
                } else {
                    (JobStatus::Completed, None)
                };

                JobService::finish(
                    pool,
                    &log,
                    status,
                    serde_json::to_value(&summary).ok(),
                    error_message.as_deref(),
                )
                .await?;

                log::info!(
                    "{} finished for {}: {} sent, {} failed, {} skipped",
                    function_name,
                    summary.date,
                    summary.sent,
                    summary.failed,
                    summary.skipped
                );

                Ok(JobRunResult::Finished(summary))
            }
            Err(e) => {
                log::error!("{} aborted: {}", function_name, e);
                close_with_error(&log, pool, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        notification_type: NotificationType,
        window: Option<NaiveDate>,
    ) -> AppResult<JobSummary> {
        let pool = self.dispatcher.pool();
        let settings = self.dispatcher.settings();

        // 3. Gateway must be usable before any target is touched
        let config = GatewayService::get_active(pool).await?;
        let provider = config.provider()?;
        create_adapter(provider, self.dispatcher.client().clone())
            .validate_config(&config)
            .map_err(|e| AppError::Configuration(format!("Active gateway is invalid: {}", e)))?;

        // 4. Window in the recipients' fixed offset, never the host's
        let offset = settings.tz_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let window = window.unwrap_or_else(|| notification_type.default_window(today));

        // 5. Eligible targets
        let targets = TargetService::eligible(
            pool,
            notification_type,
            window,
            offset,
            settings.max_delivery_attempts,
        )
        .await?;

        log::info!(
            "{} targets eligible for {} on {}",
            targets.len(),
            notification_type,
            window
        );

        // 6. Sequential sends with pacing
        let mut results = Vec::with_capacity(targets.len());
        let mut attempted = false;

        for target in &targets {
            if attempted && !settings.inter_message_delay.is_zero() {
                tokio::time::sleep(settings.inter_message_delay).await;
            }

            let result = self.process_target(target, notification_type, &config).await;
            attempted |= result.status != ItemStatus::Skipped;
            results.push(result);
        }

        // 7. Aggregate
        Ok(JobSummary::new(window, results))
    }

    /// Claims, sends and (on failure) releases one target. Never fails the batch.
    async fn process_target(
        &self,
        target: &NotificationTarget,
        notification_type: NotificationType,
        config: &GatewayConfig,
    ) -> JobItemResult {
        let pool = self.dispatcher.pool();

        let claimed_at = match TargetService::try_claim(pool, notification_type, target.id).await {
            Ok(Some(at)) => at,
            Ok(None) => {
                log::debug!("Target {} already claimed, skipping", target.id);
                return JobItemResult {
                    target_id: target.id,
                    status: ItemStatus::Skipped,
                    message_id: None,
                    error: Some("Already notified by another run".to_string()),
                };
            }
            Err(e) => {
                log::error!("Failed to claim target {}: {}", target.id, e);
                return JobItemResult {
                    target_id: target.id,
                    status: ItemStatus::Failed,
                    message_id: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let (message_id, error) = match self
            .dispatcher
            .dispatch_one(target, notification_type, config)
            .await
        {
            Ok(outcome) if outcome.success => {
                return JobItemResult {
                    target_id: target.id,
                    status: ItemStatus::Sent,
                    message_id: outcome.message_id,
                    error: None,
                };
            }
            Ok(outcome) => (outcome.message_id, outcome.error),
            Err(e) => {
                log::error!("Dispatch for target {} errored: {}", target.id, e);
                (None, Some(e.to_string()))
            }
        };

        if let Err(e) =
            TargetService::release_claim(pool, notification_type, target.id, claimed_at).await
        {
            log::error!("Failed to release claim on target {}: {}", target.id, e);
        }

        JobItemResult {
            target_id: target.id,
            status: ItemStatus::Failed,
            message_id,
            error,
        }
    }
}

async fn close_with_error(log: &JobExecutionLog, pool: &sqlx::PgPool, error: &AppError) {
    let message = error.to_string();
    if let Err(e) = JobService::finish(pool, log, JobStatus::Error, None, Some(&message)).await {
        log::error!("Failed to close job log {}: {}", log.id, e);
    }
}
