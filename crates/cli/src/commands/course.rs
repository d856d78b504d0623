//! Course command handler.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use vta_core::{config::AppConfig, AppResult};
use vta_knowledge::{load_course, open_store, CourseLoadOptions};

use super::print_json;

/// Course material management
#[derive(Args, Debug)]
pub struct CourseCommand {
    #[command(subcommand)]
    pub action: CourseAction,
}

#[derive(Subcommand, Debug)]
pub enum CourseAction {
    /// Load course material (markdown, HTML, text) from a directory
    Load(CourseLoadCommand),
}

/// Load course material
#[derive(Args, Debug)]
pub struct CourseLoadCommand {
    /// Directory or file holding the material
    pub path: PathBuf,

    /// Site the material is published at, used for source links
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum characters per record
    #[arg(long, default_value = "1500")]
    pub chunk_size: usize,

    /// Characters shared between consecutive records
    #[arg(long, default_value = "150")]
    pub chunk_overlap: usize,

    /// Remove stored course records first
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CourseCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            CourseAction::Load(cmd) => cmd.execute(config),
        }
    }
}

impl CourseLoadCommand {
    fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Loading course material from {:?}", self.path);

        let store = open_store(config)?;
        let options = CourseLoadOptions {
            root: self.path.clone(),
            base_url: self.base_url.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            reset: self.reset,
        };

        let report = load_course(&store, &options)?;

        if self.json {
            print_json(&report)?;
        } else {
            println!(
                "Loaded {} files ({} records, {} skipped) in {:.2}s",
                report.files, report.records, report.skipped, report.duration_secs
            );
        }

        Ok(())
    }
}
