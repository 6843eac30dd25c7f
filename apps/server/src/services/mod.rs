pub mod auth_token;
pub mod delivery;
pub mod dispatcher;
pub mod gateway;
pub mod job;
pub mod phone;
pub mod target;
pub mod template;
pub mod tenant;
pub mod whatsapp;

pub use auth_token::AuthTokenService;
pub use delivery::DeliveryService;
pub use dispatcher::NotificationDispatcher;
pub use gateway::GatewayService;
pub use job::JobService;
pub use target::TargetService;
pub use template::TemplateService;
pub use tenant::TenantService;
