//! JSON dumps of scraped records.

use std::path::Path;

use vta_core::AppResult;
use vta_knowledge::ContentRecord;

/// Write records as a pretty-printed JSON array, creating parent directories.
pub fn write_records_json(path: &Path, records: &[ContentRecord]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;

    tracing::info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// Read a dump written by [`write_records_json`].
pub fn read_records_json(path: &Path) -> AppResult<Vec<ContentRecord>> {
    let contents = std::fs::read_to_string(path)?;
    let records: Vec<ContentRecord> = serde_json::from_str(&contents)?;

    tracing::debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vta_core::AppError;
    use vta_knowledge::SourceType;

    #[test]
    fn test_dump_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/discourse_posts.json");
        let records = vec![
            ContentRecord::new("forum-post-1", SourceType::Forum, "Hello")
                .with_thread("10")
                .with_created_at("2025-02-01T10:00:00Z".parse().unwrap()),
        ];

        write_records_json(&path, &records).unwrap();
        assert_eq!(read_records_json(&path).unwrap(), records);
    }

    #[test]
    fn test_reject_malformed_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"not\": \"a list\"}").unwrap();

        assert!(matches!(read_records_json(&path), Err(AppError::Serialization(_))));
    }
}
