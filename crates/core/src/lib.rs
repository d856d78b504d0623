//! Shared plumbing for the Virtual TA crates: the `AppError` type every
//! layer returns, layered YAML/env configuration, and the stderr tracing
//! subscriber installed by the `vta` binary.

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
