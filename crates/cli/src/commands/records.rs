//! Record store inspection: get, stats and clean.

use clap::{Args, ValueEnum};
use vta_core::{config::AppConfig, AppResult};
use vta_knowledge::{open_store, ContentStore, SourceType};

use super::print_json;

/// Print a stored record
#[derive(Args, Debug)]
pub struct GetCommand {
    /// Record id (e.g. forum-post-123456)
    pub id: String,
}

impl GetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let record = store.get(&self.id)?;
        print_json(&record)
    }
}

/// Show record store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let path = config.database_path();
        let store = open_store(config)?;
        let stats = store.stats()?;

        if self.json {
            return print_json(&stats);
        }

        println!("Record store: {}", path.display());
        println!("  Course records: {}", stats.course_records);
        println!("  Forum records:  {} ({} topics)", stats.forum_records, stats.threads);
        if let Some(latest) = stats.latest_post_at {
            println!("  Latest post:    {}", latest.format("%Y-%m-%d %H:%M UTC"));
        }
        if let Some(size) = stats.db_size_bytes {
            println!("  Size:           {:.1} KiB", size as f64 / 1024.0);
        }

        Ok(())
    }
}

/// Which records `clean` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CleanTarget {
    Course,
    Forum,
    All,
}

impl CleanTarget {
    fn source(self) -> Option<SourceType> {
        match self {
            Self::Course => Some(SourceType::Course),
            Self::Forum => Some(SourceType::Forum),
            Self::All => None,
        }
    }
}

/// Remove stored records
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Records to remove
    #[arg(value_enum)]
    pub target: CleanTarget,
}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;
        let removed = store.clear(self.target.source())?;
        println!("Removed {} records", removed);
        Ok(())
    }
}
