//! Schema document chunking
//!
//! Documents are cut into fixed-length slices, in order, without overlap.
//! Chunk ids depend only on database, table, position and content hash, so
//! re-indexing an unchanged table upserts onto the same points.

use crate::schema::SchemaDocument;
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of content-hash characters folded into a chunk id
const HASH_PREFIX_LEN: usize = 8;

/// A slice of a schema document with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaChunk {
    /// `{database}::{table}::chunk{index}::{hash prefix}`
    pub id: String,
    pub text: String,
    pub table: String,
    pub database: String,
    pub content_hash: String,
    pub created_at: String,
    pub chunk_index: usize,
}

impl SchemaChunk {
    /// Build the deterministic chunk id
    pub fn make_id(database: &str, table: &str, index: usize, content_hash: &str) -> String {
        let prefix: String = content_hash.chars().take(HASH_PREFIX_LEN).collect();
        format!("{}::{}::chunk{}::{}", database, table, index, prefix)
    }

    /// Stable vector-store point id derived from the chunk id
    pub fn point_id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.id.as_bytes())
    }
}

/// Split text into slices of at most `max_chars` characters
pub fn split_fixed(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut slices = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (pos, _) in text.char_indices() {
        if count == max_chars {
            slices.push(&text[start..pos]);
            start = pos;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        slices.push(&text[start..]);
    }

    slices
}

/// Chunk a schema document
pub fn chunk_document(doc: &SchemaDocument, max_chars: usize) -> Vec<SchemaChunk> {
    split_fixed(&doc.text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, slice)| SchemaChunk {
            id: SchemaChunk::make_id(&doc.database, &doc.table, index, &doc.content_hash),
            text: slice.to_string(),
            table: doc.table.clone(),
            database: doc.database.clone(),
            content_hash: doc.content_hash.clone(),
            created_at: doc.created_at.clone(),
            chunk_index: index,
        })
        .collect()
}

/// Compute a stable hash for document content
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

/// Compute a stable hash for a string
pub fn compute_text_hash(text: &str) -> String {
    compute_content_hash(text.as_bytes())
}
