//! Scheduled notification runs.

pub mod runner;

pub use runner::BatchRunner;
