//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Pre-loaded course material
    Course,
    /// A post scraped from the course forum
    Forum,
}

impl SourceType {
    /// Get string representation (as stored in SQLite).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Forum => "forum",
        }
    }

    /// Parse a stored or user-supplied source name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "course" => Some(Self::Course),
            "forum" | "discourse" => Some(Self::Forum),
            _ => None,
        }
    }

    /// Label used when presenting a record as LLM context.
    pub fn context_label(&self) -> &'static str {
        match self {
            Self::Course => "Course Content",
            Self::Forum => "Discourse Post",
        }
    }
}

/// A unit of course or forum content.
///
/// Records are immutable once stored; re-ingesting the same id replaces
/// the stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Unique identifier within the store
    pub id: String,

    /// Course material or forum post
    pub source: SourceType,

    /// Text body
    pub text: String,

    /// Topic title or course section heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Forum username of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// When the post was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Forum topic the post belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Canonical link to the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContentRecord {
    /// Create a record with the required fields.
    pub fn new(id: impl Into<String>, source: SourceType, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            text: text.into(),
            title: None,
            author: None,
            created_at: None,
            thread_id: None,
            url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A search hit with its keyword score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: ContentRecord,
    pub score: u32,
}

/// Statistics for a record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub course_records: u32,
    pub forum_records: u32,

    /// Distinct forum topics
    pub threads: u32,

    /// Newest forum post timestamp
    pub latest_post_at: Option<DateTime<Utc>>,

    /// Database file size (None for in-memory stores)
    pub db_size_bytes: Option<u64>,
}
