//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Lazy collection management (one collection per database)
//! - Idempotent upsert keyed by chunk id
//! - Nearest-neighbour search ranked by cosine distance

mod payload;

pub use payload::*;

use crate::chunk::SchemaChunk;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, GetCollectionInfoResponse, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, info};

/// A chunk returned by a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: SchemaChunk,
    /// Cosine similarity reported by the index
    pub score: f32,
}

impl ScoredChunk {
    /// Cosine distance, smaller is closer
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

/// Sort by ascending distance; equal distances fall back to chunk id
pub fn rank_results(mut results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    results.sort_by(|a, b| {
        a.distance()
            .partial_cmp(&b.distance())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    results
}

/// Storage for embedded schema chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the backing collection
    fn collection(&self) -> &str;

    async fn collection_exists(&self) -> Result<bool>;

    /// Insert or replace chunks; returns the number of points written
    async fn upsert(&self, chunks: &[SchemaChunk], vectors: Vec<Vec<f32>>) -> Result<usize>;

    /// Return up to `k` chunks nearest to `vector`, closest first
    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<u64>;

    /// Delete chunks of `table` whose content hash differs from `content_hash`;
    /// returns the number removed
    async fn prune_stale(&self, table: &str, content_hash: &str) -> Result<u64>;

    /// Drop every stored chunk
    async fn reset(&self) -> Result<()>;
}

/// Information about a Qdrant collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub status: String,
}

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a store handle; no request is made until first use
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Get the expected vector dimension for this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Ensure the collection exists with correct configuration
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection {} already exists", self.collection);

            let info = self.client.collection_info(&self.collection).await?;
            if let Some(size) = extract_vector_size(&info) {
                if size as usize != self.dimension {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but the embedding model produces {}. Re-run indexing with --reset.",
                        self.collection, size, self.dimension
                    )));
                }
            }
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    /// Get collection info (point count, etc)
    pub async fn get_collection_info(&self) -> Result<Option<CollectionInfo>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await?;
        Ok(info.result.map(|result| CollectionInfo {
            points_count: result.points_count.unwrap_or(0),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
            status: format!("{:?}", result.status()),
        }))
    }

    fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {} (got {})",
                self.collection,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.client.collection_exists(&self.collection).await?)
    }

    async fn upsert(&self, chunks: &[SchemaChunk], vectors: Vec<Vec<f32>>) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(Error::Qdrant(format!(
                "Got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(0);
        }
        self.check_dimensions(&vectors)?;
        self.ensure_collection().await?;

        debug!(
            "Upserting {} points to collection {}",
            chunks.len(),
            self.collection
        );

        let points: Vec<_> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkPoint::from_chunk(chunk, vector).to_point_struct())
            .collect();
        let written = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        Ok(written)
    }

    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Err(Error::Retrieval(format!(
                "Collection '{}' does not exist. Run `sqlrag index` first.",
                self.collection
            )));
        }
        self.check_dimensions(std::slice::from_ref(&vector))?;

        debug!("Searching collection {} with limit {}", self.collection, k);

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true),
            )
            .await?;

        let results = response
            .result
            .into_iter()
            .map(|p| {
                let map = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_from_qdrant_value(v)))
                    .collect::<serde_json::Map<String, Value>>();
                let payload = ChunkPayload::try_from(map)?;
                Ok(ScoredChunk {
                    chunk: payload.into(),
                    score: p.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rank_results(results))
    }

    async fn count(&self) -> Result<u64> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn prune_stale(&self, table: &str, content_hash: &str) -> Result<u64> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let filter = stale_filter(table, content_hash);
        let stale = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(filter.clone())
                    .exact(true),
            )
            .await?
            .result
            .map(|r| r.count)
            .unwrap_or(0);
        if stale == 0 {
            return Ok(0);
        }

        debug!("Removing {} stale chunks of table {}", stale, table);
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            )
            .await?;
        Ok(stale)
    }

    async fn reset(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }
        self.ensure_collection().await
    }
}

/// Chunks of `table` built from any other version of its document
fn stale_filter(table: &str, content_hash: &str) -> Filter {
    Filter {
        must: vec![Condition::matches("table", table.to_string())],
        should: vec![],
        must_not: vec![Condition::matches("content_hash", content_hash.to_string())],
        min_should: None,
    }
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;

    match vectors_config.config.as_ref()? {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => Some(params.size),
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}
