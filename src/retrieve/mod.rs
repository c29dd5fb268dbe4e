//! Schema retrieval for a question
//!
//! Picks `k` from the question length, embeds the question, queries the
//! vector index and assembles context text with one entry per table.

use crate::config::RetrievalConfig;
use crate::embed::{embed_one, Embedder};
use crate::error::Result;
use crate::store::{ScoredChunk, VectorIndex};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// A chunk with its position in the ranking
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub table: String,
    pub database: String,
    pub text: String,
    pub score: f32,
    pub distance: f32,
    /// 1-based rank, closest first
    pub rank: usize,
}

impl RetrievedChunk {
    fn from_scored(scored: ScoredChunk, rank: usize) -> Self {
        let distance = scored.distance();
        Self {
            chunk_id: scored.chunk.id,
            table: scored.chunk.table,
            database: scored.chunk.database,
            text: scored.chunk.text,
            score: scored.score,
            distance,
            rank,
        }
    }
}

/// Result of a retrieval
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    /// Deduplicated schema context for the prompt
    pub context_text: String,
    /// Every returned chunk, ranked
    pub chunks: Vec<RetrievedChunk>,
    pub k: usize,
}

impl Retrieval {
    /// Distinct tables in rank order
    pub fn tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.chunks
            .iter()
            .filter(|c| seen.insert(c.table.as_str()))
            .map(|c| c.table.as_str())
            .collect()
    }
}

/// Build context text: the first chunk seen for each table, in rank order
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter(|c| seen.insert(c.table.as_str()))
        .map(|c| format!("---\n{}\n", c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    config: &'a RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Retrieval> {
        let k = self.config.k_for(question);
        debug!("Retrieving {} chunks from {}", k, self.index.collection());

        let vector = embed_one(self.embedder, question).await?;
        let results = self.index.query(vector, k).await?;

        let chunks: Vec<RetrievedChunk> = results
            .into_iter()
            .enumerate()
            .map(|(i, scored)| RetrievedChunk::from_scored(scored, i + 1))
            .collect();
        let retrieval = Retrieval {
            context_text: build_context(&chunks),
            chunks,
            k,
        };

        debug!(
            "Retrieved {} chunks covering {} tables",
            retrieval.chunks.len(),
            retrieval.tables().len()
        );
        Ok(retrieval)
    }
}
