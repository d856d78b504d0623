//! Forum read API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use vta_core::config::ForumConfig;
use vta_core::{AppError, AppResult};

use crate::error::FetchError;
use crate::types::{
    CategoryResponse, DateRange, PostStream, PostsResponse, RawPost, RawTopic, SearchResponse,
    TopicQuery, TopicResponse,
};

/// Posts requested per `/t/<id>/posts.json` call.
const POSTS_BATCH: usize = 20;

/// Source of raw forum data.
#[async_trait]
pub trait ForumSource: Send + Sync {
    /// One page of a topic listing. An empty page ends the listing.
    async fn topic_page(
        &self,
        query: &TopicQuery,
        range: &DateRange,
        page: u32,
    ) -> Result<Vec<RawTopic>, FetchError>;

    /// Every post of a topic, in post order.
    async fn topic_posts(&self, topic_id: u64) -> Result<Vec<RawPost>, FetchError>;

    /// Public link to a post.
    fn post_url(&self, topic: &RawTopic, post: &RawPost) -> String;
}

/// `ForumSource` over the Discourse JSON API.
pub struct DiscourseClient {
    base_url: String,
    api_key: Option<String>,
    api_username: Option<String>,
    client: reqwest::Client,
}

impl DiscourseClient {
    /// Create an anonymous client for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            api_username: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from forum settings and an optional API key.
    pub fn from_config(config: &ForumConfig, api_key: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("vta/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_username: config.api_username.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query string sent to `/search.json` for a term.
    fn search_query(term: &str, range: &DateRange) -> String {
        format!(
            "{} after:{} before:{}",
            term,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request
                .header("Api-Key", key)
                .header("Api-Username", self.api_username.as_deref().unwrap_or("system"));
        }

        let response = request.send().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            401 | 403 => return Err(FetchError::Auth { status, url }),
            _ => return Err(FetchError::Status { status, url }),
        }

        response.json::<T>().await.map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ForumSource for DiscourseClient {
    async fn topic_page(
        &self,
        query: &TopicQuery,
        range: &DateRange,
        page: u32,
    ) -> Result<Vec<RawTopic>, FetchError> {
        match query {
            TopicQuery::Category(id) => {
                let listing: CategoryResponse = self
                    .get_json(&format!("/c/{}.json", id), &[("page", page.to_string())])
                    .await?;
                Ok(listing.topic_list.topics)
            }
            TopicQuery::Search(term) => {
                let results: SearchResponse = self
                    .get_json(
                        "/search.json",
                        &[
                            ("q", Self::search_query(term, range)),
                            ("page", page.to_string()),
                        ],
                    )
                    .await?;
                Ok(results.topics)
            }
        }
    }

    async fn topic_posts(&self, topic_id: u64) -> Result<Vec<RawPost>, FetchError> {
        let topic: TopicResponse = self.get_json(&format!("/t/{}.json", topic_id), &[]).await?;
        let missing = missing_post_ids(&topic.post_stream);
        let mut posts = topic.post_stream.posts;

        for batch in missing.chunks(POSTS_BATCH) {
            let params: Vec<(&str, String)> =
                batch.iter().map(|id| ("post_ids[]", id.to_string())).collect();
            let more: PostsResponse = self
                .get_json(&format!("/t/{}/posts.json", topic_id), &params)
                .await?;
            posts = merge_posts(posts, more.post_stream.posts);
        }

        Ok(merge_posts(posts, Vec::new()))
    }

    fn post_url(&self, topic: &RawTopic, post: &RawPost) -> String {
        let slug = topic
            .slug
            .as_deref()
            .or(post.topic_slug.as_deref())
            .unwrap_or("topic");
        format!(
            "{}/t/{}/{}/{}",
            self.base_url,
            slug,
            topic.id,
            post.post_number.unwrap_or(1)
        )
    }
}

/// Ids listed in the topic's stream whose posts were not inlined. Long
/// topics only inline the first page.
fn missing_post_ids(stream: &PostStream) -> Vec<u64> {
    let inlined: HashSet<u64> = stream.posts.iter().map(|p| p.id).collect();
    let mut seen = HashSet::new();
    stream
        .stream
        .iter()
        .copied()
        .filter(|id| !inlined.contains(id) && seen.insert(*id))
        .collect()
}

/// Append `more` to `posts`, dropping repeated ids, ordered by post number.
fn merge_posts(posts: Vec<RawPost>, more: Vec<RawPost>) -> Vec<RawPost> {
    let mut seen = HashSet::new();
    let mut merged: Vec<RawPost> = posts
        .into_iter()
        .chain(more)
        .filter(|p| seen.insert(p.id))
        .collect();
    merged.sort_by_key(|p| (p.post_number.unwrap_or(u32::MAX), p.id));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_search_query_format() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
        )
        .unwrap();
        assert_eq!(
            DiscourseClient::search_query("Tools in Data Science", &range),
            "Tools in Data Science after:2025-01-01 before:2025-04-14"
        );
    }

    #[test]
    fn test_post_url() {
        let client = DiscourseClient::new("https://discourse.example/");
        let topic: RawTopic =
            serde_json::from_str(r#"{"id": 155939, "title": "GA1", "slug": "ga1-discussion"}"#).unwrap();
        let post: RawPost = serde_json::from_str(
            r#"{"id": 1, "post_number": 4, "created_at": "2025-01-15T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(client.base_url(), "https://discourse.example");
        assert_eq!(
            client.post_url(&topic, &post),
            "https://discourse.example/t/ga1-discussion/155939/4"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ForumConfig::default();
        let client = DiscourseClient::from_config(&config, Some("secret".into())).unwrap();
        assert_eq!(client.base_url(), "https://discourse.onlinedegree.iitm.ac.in");
        assert_eq!(client.api_key.as_deref(), Some("secret"));
    }

    fn post(id: u64, number: u32) -> RawPost {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "post_number": number,
            "created_at": "2025-02-01T10:00:00Z",
            "raw": format!("post {}", number),
        }))
        .unwrap()
    }

    fn post_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "post_number": id - 100,
            "created_at": "2025-02-01T10:00:00Z",
            "raw": format!("post {}", id - 100),
        })
    }

    async fn spawn(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_missing_post_ids_skips_inlined_and_repeats() {
        let stream = PostStream {
            posts: vec![post(10, 1), post(11, 2)],
            stream: vec![10, 11, 12, 13, 12],
        };
        assert_eq!(missing_post_ids(&stream), vec![12, 13]);
    }

    #[test]
    fn test_merge_posts_orders_by_post_number() {
        let merged = merge_posts(vec![post(10, 1), post(13, 4)], vec![post(12, 3), post(10, 1), post(11, 2)]);
        let numbers: Vec<u32> = merged.iter().filter_map(|p| p.post_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_get_json_maps_statuses() {
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::get;
        use axum::Json;

        let router = axum::Router::new()
            .route("/ok.json", get(|| async { Json(serde_json::json!({"topics": [{"id": 1, "title": "GA1"}]})) }))
            .route("/forbidden.json", get(|| async { StatusCode::FORBIDDEN }))
            .route("/unauthorized.json", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/busy.json", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/broken.json", get(|| async { "<html>not json</html>" }))
            .route(
                "/secure.json",
                get(|headers: HeaderMap| async move {
                    let key = headers.get("Api-Key").and_then(|v| v.to_str().ok());
                    let user = headers.get("Api-Username").and_then(|v| v.to_str().ok());
                    if key == Some("secret") && user == Some("tds-bot") {
                        Ok(Json(serde_json::json!({"topics": []})))
                    } else {
                        Err(StatusCode::FORBIDDEN)
                    }
                }),
            );
        let base = spawn(router).await;
        let client = DiscourseClient::new(&base);

        let ok: SearchResponse = client.get_json("/ok.json", &[]).await.unwrap();
        assert_eq!(ok.topics[0].title, "GA1");

        let err = client.get_json::<SearchResponse>("/forbidden.json", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Auth { status: 403, .. }));
        assert!(!err.is_retryable());

        let err = client.get_json::<SearchResponse>("/unauthorized.json", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Auth { status: 401, .. }));

        let err = client.get_json::<SearchResponse>("/busy.json", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert!(err.is_retryable());

        let err = client.get_json::<SearchResponse>("/broken.json", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));

        assert!(client.get_json::<SearchResponse>("/secure.json", &[]).await.is_err());
        let mut authed = DiscourseClient::new(&base);
        authed.api_key = Some("secret".into());
        authed.api_username = Some("tds-bot".into());
        assert!(authed.get_json::<SearchResponse>("/secure.json", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_topic_posts_completes_long_topics_in_batches() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use axum::extract::{Query, State};
        use axum::routing::get;
        use axum::Json;

        let calls = Arc::new(AtomicUsize::new(0));
        let router = axum::Router::new()
            .route(
                "/t/7.json",
                get(|| async {
                    let stream: Vec<u64> = (101..=145).collect();
                    Json(serde_json::json!({
                        "title": "Long thread",
                        "post_stream": { "posts": [post_json(101)], "stream": stream },
                    }))
                }),
            )
            .route(
                "/t/7/posts.json",
                get(
                    |State(calls): State<Arc<AtomicUsize>>, Query(params): Query<Vec<(String, String)>>| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let ids: Vec<u64> = params
                            .iter()
                            .filter(|(k, _)| k == "post_ids[]")
                            .filter_map(|(_, v)| v.parse().ok())
                            .collect();
                        assert!(ids.len() <= POSTS_BATCH);
                        let posts: Vec<serde_json::Value> = ids.iter().rev().map(|id| post_json(*id)).collect();
                        Json(serde_json::json!({ "post_stream": { "posts": posts } }))
                    },
                ),
            )
            .with_state(calls.clone());
        let client = DiscourseClient::new(spawn(router).await);

        let posts = client.topic_posts(7).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(posts.len(), 45);
        let numbers: Vec<u32> = posts.iter().filter_map(|p| p.post_number).collect();
        assert_eq!(numbers, (1..=45).collect::<Vec<u32>>());
    }
}
