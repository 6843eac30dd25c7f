pub mod auth_token;
pub mod delivery;
pub mod gateway;
pub mod job;
pub mod target;
pub mod template;
pub mod tenant;

pub use auth_token::{AuthToken, CreateAuthToken};
pub use delivery::{
    DeliveryOutcome, DeliveryRecord, DeliveryStatus, ListDeliveriesQuery, NewDeliveryRecord,
};
pub use gateway::{
    CreateGatewayConfig, GatewayConfig, GatewayConfigResponse, GatewayProvider,
    TestGatewayRequest,
};
pub use job::{
    ItemStatus, JobControl, JobExecutionLog, JobItemResult, JobRunResult, JobStatus, JobSummary,
    ListJobLogsQuery, RunJobQuery, TriggerType,
};
pub use target::{
    BookingRow, NotificationTarget, NotificationType, OccurrenceRow, PackageRow, TargetDetails,
    TargetKind,
};
pub use template::{
    MessageTemplate, ResolvedTemplate, TemplateSource, TenantTemplateOverride,
    UpsertTemplateOverride,
};
pub use tenant::{ChecklistItem, Tenant};
