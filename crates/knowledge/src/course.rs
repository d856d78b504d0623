//! One-time load of course material into the store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use vta_core::{AppError, AppResult};
use walkdir::WalkDir;

use crate::chunker::{chunk_text, split_markdown_sections};
use crate::parser::{clean_markdown, read_source, ContentType};
use crate::store::ContentStore;
use crate::types::{ContentRecord, SourceType};

/// Options for loading a course directory.
#[derive(Debug, Clone)]
pub struct CourseLoadOptions {
    /// Directory (or single file) holding the course material
    pub root: PathBuf,

    /// Site the material is published at; records get `<base>/#/<page>` urls
    pub base_url: Option<String>,

    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// Remove existing course records first
    pub reset: bool,
}

impl CourseLoadOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
            chunk_size: 1500,
            chunk_overlap: 150,
            reset: false,
        }
    }
}

/// Outcome of a course load.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseLoadReport {
    pub files: u32,
    pub records: u32,
    pub skipped: u32,
    pub duration_secs: f64,
}

/// Walk `options.root` and store every supported file as course records.
///
/// Record ids are `course-<page slug>-<n>`, so reloading the same tree
/// replaces rather than duplicates. Files whose paths slug to the same
/// value (`docker.md` and `docker.html`) get `-2`, `-3`... suffixes in walk
/// order.
pub fn load_course(store: &dyn ContentStore, options: &CourseLoadOptions) -> AppResult<CourseLoadReport> {
    let start = Instant::now();

    if !options.root.exists() {
        return Err(AppError::Config(format!(
            "Course directory does not exist: {:?}",
            options.root
        )));
    }

    if options.reset {
        store.clear(Some(SourceType::Course))?;
    }

    let mut report = CourseLoadReport::default();
    let mut slugs = HashSet::new();

    let entries = WalkDir::new(&options.root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());

    for entry in entries {
        let path = entry.path();
        if !ContentType::from_path(path).is_supported() {
            continue;
        }

        match file_records(path, &options.root, options, &mut slugs) {
            Ok(records) => {
                report.files += 1;
                report.records += store.put_many(&records)? as u32;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                report.skipped += 1;
            }
        }
    }

    report.duration_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Loaded course material: {} files, {} records, {} skipped in {:.2}s",
        report.files,
        report.records,
        report.skipped,
        report.duration_secs
    );

    Ok(report)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || n.starts_with('_'))
        .unwrap_or(false)
}

/// Build the records for one file.
fn file_records(
    path: &Path,
    root: &Path,
    options: &CourseLoadOptions,
    slugs: &mut HashSet<String>,
) -> AppResult<Vec<ContentRecord>> {
    let (content_type, text) = read_source(path)?;

    let relative = path.strip_prefix(root).unwrap_or(path);
    let page = relative.with_extension("").to_string_lossy().replace('\\', "/");
    let page = if page.is_empty() {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    } else {
        page
    };
    let natural = slugify(&page);
    let slug = claim_slug(natural.clone(), slugs);
    if slug != natural {
        tracing::warn!("{:?} shares its id slug with another page, using '{}'", path, slug);
    }
    let page_title = page.rsplit('/').next().unwrap_or(&page).replace(['-', '_'], " ");

    let sections: Vec<(Option<String>, String)> = match content_type {
        ContentType::Markdown => split_markdown_sections(&text)
            .into_iter()
            .map(|s| (s.heading, clean_markdown(&s.body)))
            .collect(),
        _ => vec![(None, text)],
    };

    let url = options
        .base_url
        .as_ref()
        .map(|base| format!("{}/#/{}", base.trim_end_matches('/'), page));

    let mut records = Vec::new();
    for (heading, body) in sections {
        let title = match heading {
            Some(h) => format!("{}: {}", page_title, h),
            None => page_title.clone(),
        };

        for piece in chunk_text(&body, options.chunk_size, options.chunk_overlap) {
            let mut record = ContentRecord::new(
                format!("course-{}-{}", slug, records.len()),
                SourceType::Course,
                piece,
            )
            .with_title(title.clone());
            if let Some(url) = &url {
                record = record.with_url(url.clone());
            }
            records.push(record);
        }
    }

    tracing::debug!("{:?}: {} records", path, records.len());
    Ok(records)
}

/// Lowercase ASCII alphanumerics joined by single dashes.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Reserve `slug`, suffixing it until it is unused.
fn claim_slug(slug: String, used: &mut HashSet<String>) -> String {
    let mut candidate = slug.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", slug, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("week-2/Docker Basics"), "week-2-docker-basics");
    }

    #[test]
    fn test_load_course_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docker.md", "# Docker\nContainers package apps.\n## Compose\nMulti-container setups.\n");
        write(dir.path(), "week1/notes.txt", "Install uv before the first session.");
        write(dir.path(), ".git/config", "ignored");
        write(dir.path(), "logo.png", "binary");

        let store = SqliteStore::in_memory().unwrap();
        let mut options = CourseLoadOptions::new(dir.path());
        options.base_url = Some("https://tds.example/".to_string());

        let report = load_course(&store, &options).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.records, 3);

        let record = store.get("course-docker-1").unwrap();
        assert_eq!(record.title.as_deref(), Some("docker: Compose"));
        assert_eq!(record.url.as_deref(), Some("https://tds.example/#/docker"));
        assert_eq!(store.get("course-week1-notes-0").unwrap().source, SourceType::Course);
    }

    #[test]
    fn test_colliding_slugs_keep_every_page() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docker.html", "<p>HTML page about docker compose.</p>");
        write(dir.path(), "docker.md", "Markdown page about podman compose.");
        write(dir.path(), "week-1/intro.md", "Nested intro about uv.");
        write(dir.path(), "week-1-intro.md", "Flat intro about pip.");

        let store = SqliteStore::in_memory().unwrap();
        let report = load_course(&store, &CourseLoadOptions::new(dir.path())).unwrap();

        assert_eq!(report.files, 4);
        assert_eq!(report.records, 4);
        assert_eq!(store.count(Some(SourceType::Course)).unwrap(), 4);

        let texts: HashSet<String> = ["course-docker-0", "course-docker-2-0", "course-week-1-intro-0", "course-week-1-intro-2-0"]
            .iter()
            .map(|id| store.get(id).unwrap().text)
            .collect();
        assert!(texts.contains("HTML page about docker compose."));
        assert!(texts.contains("Markdown page about podman compose."));
        assert!(texts.contains("Nested intro about uv."));
        assert!(texts.contains("Flat intro about pip."));
    }

    #[test]
    fn test_claim_slug_skips_taken_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(claim_slug("docker".into(), &mut used), "docker");
        assert_eq!(claim_slug("docker-2".into(), &mut used), "docker-2");
        assert_eq!(claim_slug("docker".into(), &mut used), "docker-3");
    }

    #[test]
    fn test_reload_replaces_records() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "intro.md", "Welcome to the course.");

        let store = SqliteStore::in_memory().unwrap();
        let options = CourseLoadOptions::new(dir.path());
        load_course(&store, &options).unwrap();
        load_course(&store, &options).unwrap();

        assert_eq!(store.count(Some(SourceType::Course)).unwrap(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let store = SqliteStore::in_memory().unwrap();
        let options = CourseLoadOptions::new("/definitely/not/here");
        assert!(matches!(load_course(&store, &options), Err(AppError::Config(_))));
    }
}
