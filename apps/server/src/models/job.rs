//! Batch job bookkeeping: execution logs, pause flags and run summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Skipped,
    Error,
}

/// Who started a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Scheduled,
    Manual,
}

/// One row per batch runner invocation
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutionLog {
    pub id: i64,
    pub function_name: String,
    pub trigger_type: TriggerType,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub result_summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

/// Pause flag for a job
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobControl {
    pub function_name: String,
    pub paused: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Sent,
    Failed,
    Skipped,
}

/// Per-target entry of a batch run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobItemResult {
    pub target_id: Uuid,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub success: bool,
    pub date: NaiveDate,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<JobItemResult>,
}

impl JobSummary {
    pub fn new(date: NaiveDate, results: Vec<JobItemResult>) -> Self {
        let count = |status: ItemStatus| results.iter().filter(|r| r.status == status).count();
        let sent = count(ItemStatus::Sent);
        let failed = count(ItemStatus::Failed);
        let skipped = count(ItemStatus::Skipped);

        let mut summary = Self {
            success: true,
            date,
            total: results.len(),
            sent,
            failed,
            skipped,
            results,
        };
        summary.success = !summary.all_failed();
        summary
    }

    /// A run is an error when something was attempted and nothing got through
    pub fn all_failed(&self) -> bool {
        let attempted = self.sent + self.failed;
        attempted > 0 && self.sent == 0
    }
}

/// Response of the batch trigger endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobRunResult {
    Paused { success: bool, message: String },
    Finished(JobSummary),
}

impl JobRunResult {
    pub fn paused() -> Self {
        JobRunResult::Paused {
            success: true,
            message: "Function is paused".to_string(),
        }
    }
}

/// Query parameters of the batch trigger endpoint
#[derive(Debug, Deserialize)]
pub struct RunJobQuery {
    pub date: Option<NaiveDate>,
}

/// Query parameters for listing job logs
#[derive(Debug, Deserialize)]
pub struct ListJobLogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    20
}
