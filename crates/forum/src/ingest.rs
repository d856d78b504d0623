//! Forum ingestion: topic listings to content records.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use vta_core::config::ForumConfig;
use vta_core::{AppError, AppResult};
use vta_knowledge::parser::clean_html;
use vta_knowledge::{ContentRecord, ContentStore, SourceType};

use crate::error::FetchError;
use crate::source::ForumSource;
use crate::types::{DateRange, RawPost, RawTopic, TopicQuery};

/// Records written to the store per transaction.
const STORE_BATCH: usize = 100;

/// Ingestion tuning.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub queries: Vec<TopicQuery>,
    pub max_pages: u32,
    pub max_retries: u32,
    /// Pause before every request after the first; retries back off in
    /// multiples of it
    pub request_delay: Duration,
    pub max_posts_per_topic: Option<usize>,
}

impl From<&ForumConfig> for IngestOptions {
    fn from(config: &ForumConfig) -> Self {
        Self {
            queries: TopicQuery::from_settings(config.category_id, &config.search_terms),
            max_pages: config.max_pages,
            max_retries: config.max_retries,
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_posts_per_topic: config.max_posts_per_topic,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub records_stored: usize,
    pub topics: usize,
    pub failures: Vec<String>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Records and failures gathered from a full stream.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub records: Vec<ContentRecord>,
    pub failures: Vec<AppError>,
}

/// Pulls forum posts for a date range and normalizes them.
pub struct Ingestor {
    source: Arc<dyn ForumSource>,
    options: IngestOptions,
}

/// Where the stream is in its walk over queries, pages and topics.
struct Cursor<'a> {
    ingestor: &'a Ingestor,
    range: DateRange,
    queries: VecDeque<TopicQuery>,
    listing: Option<(TopicQuery, u32, u32)>,
    topics: VecDeque<RawTopic>,
    records: VecDeque<ContentRecord>,
    seen_topics: HashSet<u64>,
    requests: u32,
}

impl Ingestor {
    pub fn new(source: Arc<dyn ForumSource>, options: IngestOptions) -> Self {
        Self { source, options }
    }

    /// Lazily walk the configured topic queries and yield one record per
    /// post in `range`.
    ///
    /// A page or topic that keeps failing is yielded as an `Err` and the
    /// walk moves on; the stream ends when every query is exhausted.
    pub fn records(&self, range: DateRange) -> impl Stream<Item = AppResult<ContentRecord>> + '_ {
        let cursor = Cursor {
            ingestor: self,
            range,
            queries: self.options.queries.iter().cloned().collect(),
            listing: None,
            topics: VecDeque::new(),
            records: VecDeque::new(),
            seen_topics: HashSet::new(),
            requests: 0,
        };

        stream::unfold(cursor, |mut cursor| async move {
            let item = cursor.next_item().await?;
            Some((item, cursor))
        })
    }

    /// Drain the stream, keeping records and failures apart.
    pub async fn collect(&self, range: DateRange) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let mut records = Box::pin(self.records(range));

        while let Some(item) = records.next().await {
            match item {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    tracing::warn!("{}", e);
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }

    /// Drain the stream into `store`.
    ///
    /// Failures are reported rather than returned; only store errors abort.
    pub async fn ingest(&self, store: &dyn ContentStore, range: DateRange) -> AppResult<IngestReport> {
        tracing::info!(
            "Ingesting forum posts from {} to {} ({} queries)",
            range.start,
            range.end,
            self.options.queries.len()
        );

        let mut report = IngestReport::default();
        let mut threads = HashSet::new();
        let mut batch = Vec::with_capacity(STORE_BATCH);
        let mut records = Box::pin(self.records(range));

        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    if let Some(thread) = &record.thread_id {
                        threads.insert(thread.clone());
                    }
                    batch.push(record);
                    if batch.len() >= STORE_BATCH {
                        report.records_stored += store.put_many(&batch)?;
                        batch.clear();
                    }
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e.to_string());
                }
            }
        }

        if !batch.is_empty() {
            report.records_stored += store.put_many(&batch)?;
        }
        report.topics = threads.len();

        tracing::info!(
            "Ingestion finished: {} records from {} topics, {} failures",
            report.records_stored,
            report.topics,
            report.failures.len()
        );

        Ok(report)
    }

    /// Map a topic's posts to records, dropping posts outside `range` and
    /// posts without text.
    fn normalize(&self, topic: &RawTopic, posts: Vec<RawPost>, range: &DateRange) -> Vec<ContentRecord> {
        let limit = self.options.max_posts_per_topic.unwrap_or(usize::MAX);

        posts
            .into_iter()
            .filter(|post| range.contains(post.created_at))
            .filter_map(|post| {
                let text = post_text(&post)?;
                let mut record = ContentRecord::new(format!("forum-post-{}", post.id), SourceType::Forum, text)
                    .with_created_at(post.created_at)
                    .with_thread(topic.id.to_string())
                    .with_url(self.source.post_url(topic, &post));
                if !topic.title.trim().is_empty() {
                    record = record.with_title(topic.title.trim());
                }
                if let Some(author) = post.username.as_deref().filter(|u| !u.is_empty()) {
                    record = record.with_author(author);
                }
                Some(record)
            })
            .take(limit)
            .collect()
    }

    /// Run `op` with retries, pausing before each request to rate-limit.
    async fn fetch<T, F, Fut>(&self, requests: &mut u32, what: &str, op: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            if *requests > 0 && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay * (attempt + 1)).await;
            }
            *requests += 1;

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.options.max_retries,
                        e
                    );
                }
                Err(e) => {
                    return Err(AppError::Ingest(format!("{}: {}", what, e)));
                }
            }
        }
    }
}

impl Cursor<'_> {
    /// Advance until a record or failure is available. `None` ends the stream.
    async fn next_item(&mut self) -> Option<AppResult<ContentRecord>> {
        let ingestor = self.ingestor;
        loop {
            if let Some(record) = self.records.pop_front() {
                return Some(Ok(record));
            }

            if let Some(topic) = self.topics.pop_front() {
                let what = format!("posts of topic {}", topic.id);
                let posts = ingestor
                    .fetch(&mut self.requests, &what, || ingestor.source.topic_posts(topic.id))
                    .await;
                match posts {
                    Ok(posts) => {
                        self.records = ingestor.normalize(&topic, posts, &self.range).into();
                        tracing::debug!("Topic {}: {} posts in range", topic.id, self.records.len());
                        continue;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            if let Some((query, page, fetched)) = self.listing.take() {
                if fetched >= ingestor.options.max_pages {
                    continue;
                }

                let what = format!("{} page {}", query, page);
                let range = self.range;
                let topics = ingestor
                    .fetch(&mut self.requests, &what, || {
                        ingestor.source.topic_page(&query, &range, page)
                    })
                    .await;

                match topics {
                    Ok(topics) if topics.is_empty() => continue,
                    Ok(topics) => {
                        let found = topics.len();
                        for topic in topics {
                            if self.accepts(&topic) {
                                self.topics.push_back(topic);
                            }
                        }
                        tracing::debug!("{}: {} topics, {} new", what, found, self.topics.len());
                        self.listing = Some((query, page + 1, fetched + 1));
                        continue;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            let query = self.queries.pop_front()?;
            let first = query.first_page();
            self.listing = Some((query, first, 0));
        }
    }

    /// Keep topics with activity in range that no earlier listing produced.
    fn accepts(&mut self, topic: &RawTopic) -> bool {
        if let Some(created) = topic.created_at {
            let last = topic.last_posted_at.unwrap_or(created);
            if !self.range.overlaps(created, last) {
                return false;
            }
        }
        self.seen_topics.insert(topic.id)
    }
}

/// Post body: markdown source when present, otherwise the rendered HTML
/// stripped to text.
fn post_text(post: &RawPost) -> Option<String> {
    let raw = post.raw.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let text = match raw {
        Some(raw) => raw.to_string(),
        None => clean_html(post.cooked.as_deref().unwrap_or("")),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use vta_knowledge::SqliteStore;

    /// In-memory forum with scripted failures.
    #[derive(Default)]
    struct FakeForum {
        pages: HashMap<(String, u32), Vec<RawTopic>>,
        posts: HashMap<u64, Vec<RawPost>>,
        /// Remaining failures per request key
        failures: Mutex<HashMap<String, (u32, u16)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeForum {
        fn key(query: &TopicQuery) -> String {
            query.to_string()
        }

        fn with_page(mut self, query: &TopicQuery, page: u32, topics: Vec<RawTopic>) -> Self {
            self.pages.insert((Self::key(query), page), topics);
            self
        }

        fn with_posts(mut self, topic_id: u64, posts: Vec<RawPost>) -> Self {
            self.posts.insert(topic_id, posts);
            self
        }

        fn failing(self, key: &str, times: u32, status: u16) -> Self {
            self.failures.lock().insert(key.to_string(), (times, status));
            self
        }

        fn check_failure(&self, key: &str) -> Result<(), FetchError> {
            let mut failures = self.failures.lock();
            if let Some((remaining, status)) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    let (status, url) = (*status, key.to_string());
                    return Err(if status == 401 || status == 403 {
                        FetchError::Auth { status, url }
                    } else {
                        FetchError::Status { status, url }
                    });
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ForumSource for FakeForum {
        async fn topic_page(
            &self,
            query: &TopicQuery,
            _range: &DateRange,
            page: u32,
        ) -> Result<Vec<RawTopic>, FetchError> {
            let key = format!("{}#{}", Self::key(query), page);
            self.calls.lock().push(key.clone());
            self.check_failure(&key)?;
            Ok(self.pages.get(&(Self::key(query), page)).cloned().unwrap_or_default())
        }

        async fn topic_posts(&self, topic_id: u64) -> Result<Vec<RawPost>, FetchError> {
            let key = format!("topic#{}", topic_id);
            self.calls.lock().push(key.clone());
            self.check_failure(&key)?;
            Ok(self.posts.get(&topic_id).cloned().unwrap_or_default())
        }

        fn post_url(&self, topic: &RawTopic, post: &RawPost) -> String {
            format!("https://forum.test/t/{}/{}", topic.id, post.post_number.unwrap_or(1))
        }
    }

    fn topic(id: u64, title: &str, created: &str) -> RawTopic {
        RawTopic {
            id,
            title: title.to_string(),
            slug: None,
            created_at: Some(created.parse().unwrap()),
            last_posted_at: None,
            posts_count: None,
        }
    }

    fn post(id: u64, number: u32, created: &str, cooked: &str) -> RawPost {
        RawPost {
            id,
            post_number: Some(number),
            username: Some(format!("user{}", id)),
            created_at: created.parse().unwrap(),
            raw: None,
            cooked: Some(cooked.to_string()),
            topic_id: None,
            topic_slug: None,
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
        )
        .unwrap()
    }

    fn options(queries: Vec<TopicQuery>) -> IngestOptions {
        IngestOptions {
            queries,
            max_pages: 5,
            max_retries: 2,
            request_delay: Duration::ZERO,
            max_posts_per_topic: None,
        }
    }

    fn tds() -> TopicQuery {
        TopicQuery::Search("TDS".to_string())
    }

    fn sample_forum() -> FakeForum {
        FakeForum::default()
            .with_page(
                &tds(),
                1,
                vec![
                    topic(10, "GA1 help", "2025-01-10T09:00:00Z"),
                    topic(11, "Old topic", "2024-06-01T09:00:00Z"),
                ],
            )
            .with_page(&tds(), 2, vec![topic(12, "Project 1", "2025-02-01T09:00:00Z")])
            .with_posts(
                10,
                vec![
                    post(100, 1, "2025-01-10T09:00:00Z", "<p>How do I install <b>uv</b>?</p>"),
                    post(101, 2, "2025-01-10T10:00:00Z", "<p>Use pip install uv</p>"),
                    post(102, 3, "2025-05-01T10:00:00Z", "<p>Late reply</p>"),
                    post(103, 4, "2025-01-11T10:00:00Z", "<p></p>"),
                ],
            )
            .with_posts(12, vec![post(120, 1, "2025-02-01T09:00:00Z", "<p>Deadline?</p>")])
    }

    #[tokio::test]
    async fn test_stream_yields_posts_in_range() {
        let forum = Arc::new(sample_forum());
        let ingestor = Ingestor::new(forum.clone(), options(vec![tds()]));

        let outcome = ingestor.collect(range()).await;
        let ids: Vec<_> = outcome.records.iter().map(|r| r.id.as_str()).collect();

        assert!(outcome.failures.is_empty());
        assert_eq!(ids, vec!["forum-post-100", "forum-post-101", "forum-post-120"]);

        let first = &outcome.records[0];
        assert_eq!(first.text, "How do I install uv?");
        assert_eq!(first.title.as_deref(), Some("GA1 help"));
        assert_eq!(first.author.as_deref(), Some("user100"));
        assert_eq!(first.thread_id.as_deref(), Some("10"));
        assert_eq!(first.url.as_deref(), Some("https://forum.test/t/10/1"));

        // Old topic is never fetched; listing stops at the first empty page.
        let calls = forum.calls.lock();
        assert!(!calls.contains(&"topic#11".to_string()));
        assert!(calls.contains(&"search 'TDS'#3".to_string()));
        assert!(!calls.contains(&"search 'TDS'#4".to_string()));
    }

    #[tokio::test]
    async fn test_raw_markdown_preferred() {
        let mut p = post(200, 1, "2025-03-01T00:00:00Z", "<p>rendered</p>");
        p.raw = Some("**source** text".to_string());
        let forum = FakeForum::default()
            .with_page(&tds(), 1, vec![topic(20, "Raw", "2025-03-01T00:00:00Z")])
            .with_posts(20, vec![p]);
        let ingestor = Ingestor::new(Arc::new(forum), options(vec![tds()]));

        let outcome = ingestor.collect(range()).await;
        assert_eq!(outcome.records[0].text, "**source** text");
    }

    #[tokio::test]
    async fn test_topics_deduplicated_across_queries() {
        let project = TopicQuery::Search("project".to_string());
        let forum = Arc::new(
            sample_forum().with_page(&project, 1, vec![topic(12, "Project 1", "2025-02-01T09:00:00Z")]),
        );
        let ingestor = Ingestor::new(forum.clone(), options(vec![tds(), project]));

        let outcome = ingestor.collect(range()).await;
        assert_eq!(outcome.records.len(), 3);
        let topic_fetches = forum.calls.lock().iter().filter(|c| *c == "topic#12").count();
        assert_eq!(topic_fetches, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let forum = Arc::new(sample_forum().failing("search 'TDS'#1", 2, 503));
        let ingestor = Ingestor::new(forum.clone(), options(vec![tds()]));

        let outcome = ingestor.collect(range()).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.records.len(), 3);
        let attempts = forum.calls.lock().iter().filter(|c| *c == "search 'TDS'#1").count();
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces_and_moves_on() {
        let forum = Arc::new(sample_forum().failing("topic#10", 10, 500));
        let ingestor = Ingestor::new(forum, options(vec![tds()]));

        let outcome = ingestor.collect(range()).await;
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(&outcome.failures[0], AppError::Ingest(msg) if msg.contains("topic 10")));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id, "forum-post-120");
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let forum = Arc::new(sample_forum().failing("search 'TDS'#1", 1, 403));
        let ingestor = Ingestor::new(forum.clone(), options(vec![tds()]));

        let outcome = ingestor.collect(range()).await;
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].to_string().contains("authentication rejected"));
        assert!(outcome.records.is_empty());
        assert_eq!(forum.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_limits_listing() {
        let mut opts = options(vec![tds()]);
        opts.max_pages = 1;
        let forum = Arc::new(sample_forum());
        let ingestor = Ingestor::new(forum.clone(), opts);

        let outcome = ingestor.collect(range()).await;
        assert_eq!(outcome.records.len(), 2);
        assert!(!forum.calls.lock().contains(&"search 'TDS'#2".to_string()));
    }

    #[tokio::test]
    async fn test_ingest_twice_has_no_duplicates() {
        let ingestor = Ingestor::new(Arc::new(sample_forum()), options(vec![tds()]));
        let store = SqliteStore::in_memory().unwrap();

        let first = ingestor.ingest(&store, range()).await.unwrap();
        let second = ingestor.ingest(&store, range()).await.unwrap();

        assert_eq!(first.records_stored, 3);
        assert_eq!(first.topics, 2);
        assert!(first.is_success() && second.is_success());
        assert_eq!(store.count(Some(SourceType::Forum)).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_max_posts_per_topic() {
        let mut opts = options(vec![tds()]);
        opts.max_posts_per_topic = Some(1);
        let ingestor = Ingestor::new(Arc::new(sample_forum()), opts);

        let outcome = ingestor.collect(range()).await;
        let ids: Vec<_> = outcome.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["forum-post-100", "forum-post-120"]);
    }
}
