//! Scrape command handler.
//!
//! Pulls forum posts for a date range into the record store, optionally
//! writing them to a JSON dump, or loads a previously written dump.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use vta_core::{config::AppConfig, AppError, AppResult};
use vta_forum::{
    ingestor_from_config, read_records_json, write_records_json, DateRange, IngestReport,
};
use vta_knowledge::{open_store, ContentStore, SourceType};

use super::print_json;

/// Ingest forum posts into the record store
#[derive(Args, Debug)]
pub struct ScrapeCommand {
    /// First day to include (YYYY-MM-DD, default from config)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, default from config)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Also write the scraped records to this JSON file
    #[arg(long, conflicts_with = "from_json")]
    pub output: Option<PathBuf>,

    /// Load records from a JSON dump instead of the forum
    #[arg(long)]
    pub from_json: Option<PathBuf>,

    /// Remove stored forum records first
    #[arg(long)]
    pub reset: bool,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ScrapeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;

        if self.reset {
            let removed = store.clear(Some(SourceType::Forum))?;
            tracing::info!("Removed {} forum records before scraping", removed);
        }

        let report = match &self.from_json {
            Some(path) => {
                let records = read_records_json(path)?;
                let stored = store.put_many(&records)?;
                IngestReport {
                    records_stored: stored,
                    topics: count_threads(&records),
                    failures: Vec::new(),
                }
            }
            None => self.scrape(config, &store).await?,
        };

        if self.json {
            print_json(&report)?;
        } else {
            println!(
                "Stored {} forum posts from {} topics",
                report.records_stored, report.topics
            );
            for failure in &report.failures {
                eprintln!("  failed: {}", failure);
            }
        }

        if report.is_success() {
            Ok(())
        } else {
            Err(AppError::Ingest(format!(
                "{} forum requests failed",
                report.failures.len()
            )))
        }
    }

    fn range(&self, config: &AppConfig) -> AppResult<DateRange> {
        DateRange::new(
            self.start.unwrap_or(config.forum.start_date),
            self.end.unwrap_or(config.forum.end_date),
        )
    }

    async fn scrape(&self, config: &AppConfig, store: &dyn ContentStore) -> AppResult<IngestReport> {
        let range = self.range(config)?;
        let ingestor = ingestor_from_config(config)?;

        let Some(output) = &self.output else {
            return ingestor.ingest(store, range).await;
        };

        let outcome = ingestor.collect(range).await;
        let stored = store.put_many(&outcome.records)?;
        write_records_json(output, &outcome.records)?;

        Ok(IngestReport {
            records_stored: stored,
            topics: count_threads(&outcome.records),
            failures: outcome.failures.iter().map(ToString::to_string).collect(),
        })
    }
}

fn count_threads(records: &[vta_knowledge::ContentRecord]) -> usize {
    records
        .iter()
        .filter_map(|r| r.thread_id.as_deref())
        .collect::<std::collections::HashSet<_>>()
        .len()
}
