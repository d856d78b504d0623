//! Discourse forum ingestion for the Virtual TA.
//!
//! The [`Ingestor`] pages through topic listings on a Discourse instance,
//! fetches each topic's posts, and normalizes them into
//! [`vta_knowledge::ContentRecord`]s for the record store.

pub mod error;
pub mod export;
pub mod ingest;
pub mod source;
pub mod types;

pub use error::FetchError;
pub use export::{read_records_json, write_records_json};
pub use ingest::{IngestOptions, IngestOutcome, IngestReport, Ingestor};
pub use source::{DiscourseClient, ForumSource};
pub use types::{DateRange, RawPost, RawTopic, TopicQuery};

use std::sync::Arc;

use vta_core::{AppConfig, AppResult};

/// Build an ingestor for the forum configured in `config`.
pub fn ingestor_from_config(config: &AppConfig) -> AppResult<Ingestor> {
    let client = DiscourseClient::from_config(&config.forum, config.forum_api_key())?;
    Ok(Ingestor::new(Arc::new(client), IngestOptions::from(&config.forum)))
}

/// Date range configured in `config`.
pub fn configured_range(config: &AppConfig) -> AppResult<DateRange> {
    DateRange::new(config.forum.start_date, config.forum.end_date)
}
