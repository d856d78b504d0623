//! Discourse payloads and ingestion parameters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vta_core::{AppError, AppResult};

/// Inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Config(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        day >= self.start && day <= self.end
    }

    /// Whether activity spanning `[first, last]` touches the range.
    pub fn overlaps(&self, first: DateTime<Utc>, last: DateTime<Utc>) -> bool {
        first.date_naive() <= self.end && last.date_naive() >= self.start
    }
}

/// A topic listing to page through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicQuery {
    /// `/c/<id>.json`
    Category(u64),
    /// `/search.json?q=<term> after:<start> before:<end>`
    Search(String),
}

impl TopicQuery {
    /// Discourse numbers category pages from 0 and search pages from 1.
    pub fn first_page(&self) -> u32 {
        match self {
            Self::Category(_) => 0,
            Self::Search(_) => 1,
        }
    }

    /// Build the query list from configuration: category first, then terms.
    pub fn from_settings(category_id: Option<u64>, search_terms: &[String]) -> Vec<Self> {
        category_id
            .map(Self::Category)
            .into_iter()
            .chain(
                search_terms
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(|t| Self::Search(t.to_string())),
            )
            .collect()
    }
}

impl std::fmt::Display for TopicQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category(id) => write!(f, "category {}", id),
            Self::Search(term) => write!(f, "search '{}'", term),
        }
    }
}

/// A topic as it appears in listings and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTopic {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub posts_count: Option<u32>,
}

/// A single forum post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: u64,
    #[serde(default)]
    pub post_number: Option<u32>,
    #[serde(default)]
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Markdown source; only present for some endpoints and permissions
    #[serde(default)]
    pub raw: Option<String>,
    /// Rendered HTML
    #[serde(default)]
    pub cooked: Option<String>,
    #[serde(default)]
    pub topic_id: Option<u64>,
    #[serde(default)]
    pub topic_slug: Option<String>,
}

/// `/search.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub topics: Vec<RawTopic>,
}

/// `/c/<id>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryResponse {
    pub topic_list: TopicList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicList {
    #[serde(default)]
    pub topics: Vec<RawTopic>,
}

/// `/t/<id>.json` and `/t/<id>/posts.json`
#[derive(Debug, Clone, Deserialize)]
pub struct TopicResponse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    pub post_stream: PostStream,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostStream {
    #[serde(default)]
    pub posts: Vec<RawPost>,

    /// Ids of every post in the topic, including ones not inlined
    #[serde(default)]
    pub stream: Vec<u64>,
}

/// `/t/<id>/posts.json?post_ids[]=..`
#[derive(Debug, Clone, Deserialize)]
pub struct PostsResponse {
    pub post_stream: PostStream,
}
