//! Qdrant vector index integration
//!
//! This module wraps the Qdrant client and provides:
//! - Lazy collection management bound to the embedder's dimension
//! - The batched embed-and-upsert pipeline
//! - Point delete, similarity search, count, and clear operations

mod payload;

pub use payload::*;

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::normalize::IndexableDocument;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, GetCollectionInfoResponse, PointId,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Items per embedding/upsert batch. Fixed: this bounds peak memory and is
/// the only backpressure in the pipeline.
pub const BATCH_SIZE: usize = 100;

/// A single similarity search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Vector-store point id
    pub id: String,
    /// Original bookmark id from the payload
    pub bookmark_id: String,
    pub score: f32,
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
}

/// Vector index handle
///
/// Owns the collection lifecycle: the collection is created lazily on first
/// use with the embedder's dimension and cosine distance, and that binding is
/// never migrated. Initialization is memoized for the process lifetime;
/// `clear()` resets it.
pub struct VectorIndex {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn Embedder>,
    initialized: tokio::sync::Mutex<bool>,
}

impl VectorIndex {
    /// Create a new index handle. Does not touch the collection yet.
    pub fn new(url: &str, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
            initialized: tokio::sync::Mutex::new(false),
        })
    }

    /// The vector dimension this index is bound to
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Ensure the collection exists with the embedder's dimension.
    ///
    /// Memoized: after the first successful call this is a no-op until
    /// `clear()` resets the flag.
    pub async fn ensure_ready(&self) -> Result<()> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        let dimension = self.embedder.dimension();
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            debug!("Collection {} already exists", self.collection);

            if let Some(size) = self.collection_vector_size().await? {
                if size != dimension as u64 {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but model '{}' expects {}. Recreate the collection or switch back to a {}-dimension model.",
                        self.collection,
                        size,
                        self.embedder.model_name(),
                        dimension,
                        size
                    )));
                }
            }
        } else {
            info!(
                "Creating collection {} with dimension {}",
                self.collection, dimension
            );

            let vectors_config = VectorParamsBuilder::new(dimension as u64, Distance::Cosine);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
                )
                .await?;

            info!("Collection {} created", self.collection);
        }

        *initialized = true;
        Ok(())
    }

    /// Embed and upsert documents in sequential batches.
    ///
    /// Each batch is one embedding call followed by one acknowledged upsert.
    /// A failure aborts the remaining batches; earlier batches stay
    /// committed, so the operation is atomic per batch, not overall.
    pub async fn index(&self, docs: Vec<IndexableDocument>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        self.ensure_ready().await?;

        let total = docs.len();
        let client = &self.client;
        let collection = &self.collection;

        embed_and_upsert(self.embedder.as_ref(), docs, |points| async move {
            debug!("Upserting {} vectors to {}", points.len(), collection);
            let point_structs: Vec<PointStruct> =
                points.into_iter().map(|p| p.to_point_struct()).collect();

            client
                .upsert_points(
                    UpsertPointsBuilder::new(collection.clone(), point_structs).wait(true),
                )
                .await?;
            Ok(())
        })
        .await?;

        info!("Indexed {} bookmarks into {}", total, self.collection);
        Ok(())
    }

    /// Delete bookmarks from the index by their original ids
    pub async fn delete(&self, bookmark_ids: &[String]) -> Result<()> {
        if bookmark_ids.is_empty() {
            return Ok(());
        }

        self.ensure_ready().await?;

        debug!(
            "Deleting {} points from collection {}",
            bookmark_ids.len(),
            self.collection
        );

        let ids: Vec<PointId> = bookmark_ids
            .iter()
            .map(|id| PointId::from(point_id(id).to_string()))
            .collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(ids)
                    .wait(true),
            )
            .await?;

        Ok(())
    }

    /// Embed the query text and search for similar bookmarks
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.ensure_ready().await?;

        let mut embeddings = self.embedder.embed(vec![query.to_string()]).await?;
        if embeddings.is_empty() {
            return Err(Error::Embedding("No embedding returned for query".to_string()));
        }
        let query_vector = embeddings.remove(0);

        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
                    .with_payload(true),
            )
            .await?;

        let hits = response
            .result
            .into_iter()
            .map(|p| {
                let id = point_id_to_string(p.id);
                let bookmark_id =
                    payload_string(&p.payload, "bookmark_id").unwrap_or_else(|| id.clone());

                SearchHit {
                    id,
                    bookmark_id,
                    score: p.score,
                    title: payload_string(&p.payload, "title"),
                    url: payload_string(&p.payload, "url"),
                    tags: payload_string_list(&p.payload, "tags"),
                }
            })
            .collect();

        Ok(hits)
    }

    /// Current point count; a missing count reads as zero
    pub async fn count(&self) -> Result<u64> {
        self.ensure_ready().await?;

        let info = self.client.collection_info(&self.collection).await?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    /// Destroy and recreate the collection, losing all vectors. Irreversible.
    pub async fn clear(&self) -> Result<()> {
        self.ensure_ready().await?;

        info!("Clearing collection {}", self.collection);
        self.client.delete_collection(&self.collection).await?;

        {
            let mut initialized = self.initialized.lock().await;
            *initialized = false;
        }

        self.ensure_ready().await
    }

    async fn collection_vector_size(&self) -> Result<Option<u64>> {
        let info = self.client.collection_info(&self.collection).await?;
        Ok(extract_vector_size(&info))
    }
}

/// Partition documents into batches, embed each batch with one call, and hand
/// the built points to `write`. Batches run strictly in sequence; the first
/// error aborts the rest.
async fn embed_and_upsert<F, Fut>(
    embedder: &dyn Embedder,
    docs: Vec<IndexableDocument>,
    mut write: F,
) -> Result<()>
where
    F: FnMut(Vec<BookmarkPoint>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let dimension = embedder.dimension();

    for batch in docs.chunks(BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();

        debug!("Generating embeddings for batch of {}", texts.len());
        let embeddings = embedder.embed(texts).await?;

        if embeddings.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "Embedder returned {} vectors for {} texts",
                embeddings.len(),
                batch.len()
            )));
        }

        if let Some(mismatch) = embeddings.iter().find(|v| v.len() != dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                dimension,
                mismatch.len()
            )));
        }

        let points: Vec<BookmarkPoint> = batch
            .iter()
            .zip(embeddings)
            .map(|(doc, vector)| BookmarkPoint {
                id: point_id(&doc.id),
                vector,
                payload: BookmarkPayload::new(doc.id.clone(), doc.metadata.clone()),
            })
            .collect();

        write(points).await?;
    }

    Ok(())
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;
    let config = vectors_config.config.as_ref()?;

    match config {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => Some(params.size),
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(map) => {
            map.map.values().next().map(|params| params.size)
        }
    }
}

/// Convert PointId to string
fn point_id_to_string(id: Option<PointId>) -> String {
    match id {
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)),
        }) => uuid,
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)),
        }) => num.to_string(),
        _ => String::new(),
    }
}
