pub mod extractors;
pub mod token;

pub use extractors::{AuthenticatedCaller, SchedulerAuth};
pub use token::generate_token;
