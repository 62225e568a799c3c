//! Bookmark service client
//!
//! This module wraps the bookmark service's REST API and provides:
//! - The bookmark record model
//! - Paginated listing with cursor continuation
//! - A modified-since filter for incremental sync

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default page size when listing bookmarks
const PAGE_LIMIT: usize = 100;

/// A tag attached to a bookmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Kind of content attached to a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Link,
    Text,
    Asset,
}

/// Content block of a bookmark
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkContent {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Plain-text content, preferred for embedding
    #[serde(default)]
    pub content: Option<String>,
    /// HTML content, used only when no plain text exists
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// A bookmark record as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Stable identifier; join key to the vector store
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub content: Option<BookmarkContent>,
}

impl Bookmark {
    /// Modification time: explicit modified timestamp if present, else creation
    /// time. Unparseable timestamps yield None, which incremental sync treats
    /// as "modified" so the record is reprocessed rather than skipped.
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.modified_at.as_deref().unwrap_or(&self.created_at);
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// One page of a bookmark listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPage {
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Client for the bookmark service REST API
pub struct BookmarkClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl BookmarkClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let timeout = Duration::from_secs(30);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let full = format!("{}/api/v1{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&full).map_err(|e| Error::Config(format!("Invalid bookmark service URL: {}", e)))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Bookmarks(format!("{} {}", status, body)));
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch one page of bookmarks
    pub async fn list_page(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<BookmarkPage> {
        let mut url = self.endpoint("/bookmarks")?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                params.append_pair("cursor", cursor);
            }
        }
        self.get_json(url).await
    }

    /// Fetch every bookmark, following the continuation cursor until the
    /// service reports none. Source-reported order is preserved.
    pub async fn fetch_all(&self) -> Result<Vec<Bookmark>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            debug!(
                "Fetching bookmarks, cursor: {}",
                cursor.as_deref().unwrap_or("start")
            );
            let page = self.list_page(cursor.as_deref(), PAGE_LIMIT).await?;
            all.extend(page.bookmarks);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!("Fetched {} bookmarks from source", all.len());
        Ok(all)
    }

    /// Fetch bookmarks modified strictly after `since`.
    ///
    /// The service has no server-side since filter, so this fetches all pages
    /// and filters locally.
    pub async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let all = self.fetch_all().await?;
        Ok(all
            .into_iter()
            .filter(|b| match b.modified_time() {
                Some(t) => t > since,
                None => true,
            })
            .collect())
    }

    /// Fetch a single bookmark by id
    pub async fn get(&self, id: &str) -> Result<Bookmark> {
        let url = self.endpoint(&format!("/bookmarks/{}", id))?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bookmark_json(id: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "createdAt": created_at,
            "title": format!("Bookmark {}", id),
            "tags": [],
        })
    }

    #[test]
    fn test_modified_time_prefers_modified_at() {
        let bookmark = Bookmark {
            id: "b1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            modified_at: Some("2024-06-01T12:00:00Z".to_string()),
            title: None,
            note: None,
            summary: None,
            tags: vec![],
            content: None,
        };

        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(bookmark.modified_time(), Some(expected));
    }

    #[test]
    fn test_modified_time_falls_back_to_created_at() {
        let bookmark = Bookmark {
            id: "b1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            modified_at: None,
            title: None,
            note: None,
            summary: None,
            tags: vec![],
            content: None,
        };

        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(bookmark.modified_time(), Some(expected));
    }

    #[test]
    fn test_content_kind_deserializes_lowercase() {
        let content: BookmarkContent = serde_json::from_value(json!({
            "type": "link",
            "url": "https://example.com",
        }))
        .unwrap();
        assert_eq!(content.kind, ContentKind::Link);
    }

    #[tokio::test]
    async fn test_fetch_all_follows_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bookmarks": [bookmark_json("b2", "2024-01-02T00:00:00Z")],
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bookmarks": [bookmark_json("b1", "2024-01-01T00:00:00Z")],
                "nextCursor": "page2",
            })))
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), "test-key").unwrap();
        let all = client.fetch_all().await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "b1");
        assert_eq!(all[1].id, "b2");
    }

    #[tokio::test]
    async fn test_fetch_since_filters_by_modification_time() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bookmarks": [
                    bookmark_json("old", "2024-01-01T00:00:00Z"),
                    {
                        "id": "updated",
                        "createdAt": "2024-01-01T00:00:00Z",
                        "modifiedAt": "2024-06-01T00:00:00Z",
                        "tags": [],
                    },
                ],
            })))
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), "test-key").unwrap();
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let changed = client.fetch_since(since).await.unwrap();

        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, "updated");
    }

    #[tokio::test]
    async fn test_get_sends_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks/b42"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(bookmark_json("b42", "2024-01-01T00:00:00Z")),
            )
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), "secret").unwrap();
        let bookmark = client.get("b42").await.unwrap();
        assert_eq!(bookmark.id, "b42");
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), "key").unwrap();
        let err = client.get("missing").await.unwrap_err();
        match err {
            Error::Bookmarks(message) => assert!(message.contains("404")),
            other => panic!("expected bookmarks error, got {other:?}"),
        }
    }
}
