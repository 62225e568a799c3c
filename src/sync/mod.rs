//! Sync orchestration
//!
//! Drives full and incremental synchronization between the bookmark service
//! and the vector index, and owns the incremental-sync cursor.

use crate::bookmarks::{Bookmark, BookmarkClient};
use crate::error::Result;
use crate::normalize::{normalize, IndexableDocument};
use crate::store::VectorIndex;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Aggregate counts for one sync pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub total: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Orchestrates sync passes.
///
/// The cursor mutex is held for an entire pass, so overlapping timer,
/// webhook, and operator syncs serialize instead of interleaving cursor
/// updates with in-flight fetches.
pub struct SyncEngine {
    bookmarks: BookmarkClient,
    index: Arc<VectorIndex>,
    cursor: Mutex<Option<DateTime<Utc>>>,
}

impl SyncEngine {
    pub fn new(bookmarks: BookmarkClient, index: Arc<VectorIndex>) -> Self {
        Self {
            bookmarks,
            index,
            cursor: Mutex::new(None),
        }
    }

    /// Synchronize every bookmark in the source. Does not touch the cursor.
    pub async fn sync_all(&self) -> Result<SyncResult> {
        let _guard = self.cursor.lock().await;
        self.full_pass().await
    }

    /// Synchronize bookmarks modified since the last pass.
    ///
    /// With no cursor set this is a full pass that then sets the cursor. The
    /// cursor advances to the fetch-issue time before any embedding or
    /// upsert, so records modified during a long pass get reprocessed next
    /// time rather than skipped.
    pub async fn sync_incremental(&self) -> Result<SyncResult> {
        let mut cursor = self.cursor.lock().await;

        let Some(since) = *cursor else {
            let result = self.full_pass().await?;
            *cursor = Some(Utc::now());
            return Ok(result);
        };

        let start = Instant::now();
        info!("Incremental sync since {}", since.to_rfc3339());

        let fetch_issued = Utc::now();
        let bookmarks = self.bookmarks.fetch_since(since).await?;
        *cursor = Some(fetch_issued);

        if bookmarks.is_empty() {
            info!("No changed bookmarks to sync");
            return Ok(SyncResult {
                duration_ms: start.elapsed().as_millis() as u64,
                ..SyncResult::default()
            });
        }

        let result = self.process_and_index(bookmarks, start).await?;
        info!(
            "Incremental sync: {} indexed, {} skipped in {}ms",
            result.indexed, result.skipped, result.duration_ms
        );
        Ok(result)
    }

    /// Synchronize a single bookmark (webhook-style). Bypasses the cursor.
    pub async fn sync_one(&self, bookmark_id: &str) -> Result<()> {
        info!("Syncing bookmark: {}", bookmark_id);

        let bookmark = self.bookmarks.get(bookmark_id).await?;
        let doc = normalize(&bookmark)?;

        if doc.is_empty() {
            info!("Bookmark {} has no content, skipping", bookmark_id);
            return Ok(());
        }

        self.index.index(vec![doc]).await?;
        info!("Bookmark {} synced", bookmark_id);
        Ok(())
    }

    /// Remove a single bookmark from the index. Bypasses the cursor.
    pub async fn delete_one(&self, bookmark_id: &str) -> Result<()> {
        info!("Deleting bookmark from index: {}", bookmark_id);
        self.index.delete(&[bookmark_id.to_string()]).await
    }

    async fn full_pass(&self) -> Result<SyncResult> {
        let start = Instant::now();
        info!("Starting full sync");

        let bookmarks = self.bookmarks.fetch_all().await?;
        let result = self.process_and_index(bookmarks, start).await?;

        info!(
            "Sync complete: {} indexed, {} skipped, {} errors in {}ms",
            result.indexed, result.skipped, result.errors, result.duration_ms
        );
        Ok(result)
    }

    async fn process_and_index(
        &self,
        bookmarks: Vec<Bookmark>,
        start: Instant,
    ) -> Result<SyncResult> {
        let total = bookmarks.len();
        let (docs, skipped, errors) = collect_documents(&bookmarks);
        let indexed = docs.len();

        self.index.index(docs).await?;

        Ok(SyncResult {
            total,
            indexed,
            skipped,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Normalize bookmarks into indexable documents.
///
/// Per-bookmark failures are isolated: a malformed record is counted and
/// logged without aborting the batch. Short documents are counted as skipped.
fn collect_documents(bookmarks: &[Bookmark]) -> (Vec<IndexableDocument>, usize, usize) {
    let mut docs = Vec::with_capacity(bookmarks.len());
    let mut skipped = 0;
    let mut errors = 0;

    for bookmark in bookmarks {
        match normalize(bookmark) {
            Ok(doc) => {
                if doc.is_empty() {
                    skipped += 1;
                    continue;
                }
                docs.push(doc);
            }
            Err(e) => {
                warn!("Error processing bookmark {}: {}", bookmark.id, e);
                errors += 1;
            }
        }
    }

    (docs, skipped, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::{BookmarkContent, ContentKind, Tag};
    use crate::embed::Embedder;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NoopEmbedder;

    #[async_trait]
    impl Embedder for NoopEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_name(&self) -> &str {
            "noop"
        }
    }

    fn long_bookmark(id: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "createdAt": created_at,
            "title": "a bookmark title long enough to index",
            "tags": [],
        })
    }

    fn short_bookmark(id: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "createdAt": created_at,
            "title": "tiny",
            "tags": [],
        })
    }

    /// Engine whose vector index points at an unreachable Qdrant, so any
    /// store call fails loudly. Tests below only exercise paths that must
    /// not touch the store.
    fn engine_without_store(source_url: &str) -> SyncEngine {
        let bookmarks = BookmarkClient::new(source_url, "test-key").unwrap();
        let index = Arc::new(
            VectorIndex::new("http://127.0.0.1:1", "test", Arc::new(NoopEmbedder)).unwrap(),
        );
        SyncEngine::new(bookmarks, index)
    }

    async fn mount_bookmarks(server: &MockServer, bookmarks: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "bookmarks": bookmarks })),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_collect_documents_counts_skips() {
        let long = Bookmark {
            id: "b1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            modified_at: None,
            title: Some("a perfectly indexable title".to_string()),
            note: None,
            summary: None,
            tags: vec![Tag {
                id: "t1".to_string(),
                name: "rust".to_string(),
            }],
            content: Some(BookmarkContent {
                kind: ContentKind::Link,
                url: Some("https://example.com".to_string()),
                title: None,
                description: None,
                content: None,
                html_content: None,
                file_name: None,
            }),
        };
        let short = Bookmark {
            id: "b2".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            modified_at: None,
            title: Some("tiny".to_string()),
            note: None,
            summary: None,
            tags: vec![],
            content: None,
        };

        let (docs, skipped, errors) = collect_documents(&[long, short]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "b1");
        assert_eq!(skipped, 1);
        assert_eq!(errors, 0);
    }

    #[tokio::test]
    async fn test_first_incremental_behaves_like_full_and_sets_cursor() {
        let server = MockServer::start().await;
        // All short: the full pass processes every bookmark without needing
        // a reachable vector store (empty pipeline input is a no-op)
        mount_bookmarks(
            &server,
            vec![
                short_bookmark("b1", "2024-01-01T00:00:00Z"),
                short_bookmark("b2", "2024-01-02T00:00:00Z"),
            ],
        )
        .await;

        let engine = engine_without_store(&server.uri());

        let result = engine.sync_incremental().await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.indexed, 0);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.errors, 0);

        assert!(engine.cursor.lock().await.is_some());
    }

    #[tokio::test]
    async fn test_incremental_with_fresh_cursor_short_circuits() {
        let server = MockServer::start().await;
        mount_bookmarks(
            &server,
            vec![
                long_bookmark("b1", "2024-01-01T00:00:00Z"),
                long_bookmark("b2", "2024-01-02T00:00:00Z"),
            ],
        )
        .await;

        let engine = engine_without_store(&server.uri());
        // Cursor newer than every bookmark's modification time
        *engine.cursor.lock().await = Some(Utc::now());

        // Passes only because the zero delta never touches the store
        let result = engine.sync_incremental().await.unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.indexed, 0);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.errors, 0);
    }

    #[tokio::test]
    async fn test_incremental_advances_cursor_to_fetch_time() {
        let server = MockServer::start().await;
        mount_bookmarks(&server, vec![]).await;

        let engine = engine_without_store(&server.uri());
        let old_cursor = Utc::now() - chrono::Duration::hours(1);
        *engine.cursor.lock().await = Some(old_cursor);

        engine.sync_incremental().await.unwrap();

        let cursor = *engine.cursor.lock().await;
        assert!(cursor.unwrap() > old_cursor);
    }

    #[tokio::test]
    async fn test_full_sync_does_not_set_cursor() {
        let server = MockServer::start().await;
        mount_bookmarks(&server, vec![short_bookmark("b1", "2024-01-01T00:00:00Z")]).await;

        let engine = engine_without_store(&server.uri());
        engine.sync_all().await.unwrap();

        assert!(engine.cursor.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/bookmarks"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let engine = engine_without_store(&server.uri());
        assert!(engine.sync_all().await.is_err());
    }

}
