//! Command handlers for the Virtual TA CLI.

pub mod ask;
pub mod course;
pub mod records;
pub mod scrape;
pub mod serve;

pub use ask::AskCommand;
pub use course::CourseCommand;
pub use records::{CleanCommand, GetCommand, StatsCommand};
pub use scrape::ScrapeCommand;
pub use serve::ServeCommand;

use vta_core::AppResult;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
