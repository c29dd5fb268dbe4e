//! Payload schema for Qdrant points

use crate::chunk::SchemaChunk;
use crate::error::{Error, Result};
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    pub fn from_chunk(chunk: &SchemaChunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.point_id(),
            vector,
            payload: ChunkPayload::from(chunk),
        }
    }

    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each schema chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Deterministic chunk id (the point id is derived from it)
    pub chunk_id: String,

    pub table: String,

    pub database: String,

    /// Hash of the whole table document
    pub content_hash: String,

    pub created_at: String,

    /// Position of this chunk within the table document
    pub chunk_index: i64,

    pub text: String,
}

impl From<&SchemaChunk> for ChunkPayload {
    fn from(chunk: &SchemaChunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            table: chunk.table.clone(),
            database: chunk.database.clone(),
            content_hash: chunk.content_hash.clone(),
            created_at: chunk.created_at.clone(),
            chunk_index: chunk.chunk_index as i64,
            text: chunk.text.clone(),
        }
    }
}

impl From<ChunkPayload> for SchemaChunk {
    fn from(payload: ChunkPayload) -> Self {
        Self {
            id: payload.chunk_id,
            text: payload.text,
            table: payload.table,
            database: payload.database,
            content_hash: payload.content_hash,
            created_at: payload.created_at,
            chunk_index: payload.chunk_index.max(0) as usize,
        }
    }
}

impl TryFrom<Map<String, Value>> for ChunkPayload {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Qdrant(format!("Malformed chunk payload: {}", e)))
    }
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("chunk_id".to_string(), string_to_qdrant(&self.chunk_id));
        map.insert("table".to_string(), string_to_qdrant(&self.table));
        map.insert("database".to_string(), string_to_qdrant(&self.database));
        map.insert("content_hash".to_string(), string_to_qdrant(&self.content_hash));
        map.insert("created_at".to_string(), string_to_qdrant(&self.created_at));
        map.insert("chunk_index".to_string(), int_to_qdrant(self.chunk_index));
        map.insert("text".to_string(), string_to_qdrant(&self.text));

        map
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}
