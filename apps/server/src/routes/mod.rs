pub mod deliveries;
pub mod dispatch;
pub mod gateway;
pub mod health;
pub mod jobs;
pub mod templates;
pub mod tokens;
