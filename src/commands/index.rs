//! Index command implementation
//!
//! Catalog -> table documents -> chunks -> embeddings -> vector upsert.

use crate::chunk::{chunk_document, SchemaChunk};
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::Result;
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::schema::{collect_documents, SchemaSource};
use crate::store::VectorIndex;
use serde::Serialize;
use tracing::info;

/// Index options
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Overrides `index.sample_rows`
    pub sample_rows: Option<u32>,
    /// Drop the collection before writing
    pub reset: bool,
}

/// Indexing statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub database: String,
    pub collection: String,
    pub tables_indexed: usize,
    pub tables_skipped: Vec<String>,
    pub tables_failed: Vec<String>,
    pub chunks_upserted: usize,
    /// Chunks left behind by earlier versions of re-indexed tables
    pub stale_chunks_removed: u64,
    pub points_total: u64,
}

/// Rebuild the schema index for the configured database
pub async fn cmd_index(
    config: &Config,
    source: &dyn SchemaSource,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    options: IndexOptions,
) -> Result<IndexStats> {
    let sample_rows = options.sample_rows.unwrap_or(config.index.sample_rows);
    info!(
        "Indexing schema of '{}' into {} ({} sample rows per table)",
        source.database(),
        index.collection(),
        sample_rows
    );

    if options.reset {
        index.reset().await?;
    }

    let collected = collect_documents(source, &config.index, sample_rows).await?;

    let chunks: Vec<SchemaChunk> = collected
        .documents
        .iter()
        .flat_map(|doc| chunk_document(doc, config.index.chunk_max_chars))
        .collect();
    info!(
        "Built {} chunks from {} tables",
        chunks.len(),
        collected.documents.len()
    );

    let batch_size = config.embedding.batch_size.max(1);
    let progress = start_progress_bar(chunks.len(), "Embedding schema chunks");
    let mut upserted = 0;
    for batch in chunks.chunks(batch_size) {
        let texts = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_in_batches(embedder, texts, batch_size).await?;
        upserted += index.upsert(batch, vectors).await?;
        advance_progress(&progress, batch.len() as u64);
    }
    finish_progress(progress, "Schema chunks embedded");

    let mut stale_removed = 0;
    for doc in &collected.documents {
        stale_removed += index.prune_stale(&doc.table, &doc.content_hash).await?;
    }
    if stale_removed > 0 {
        info!("Removed {} stale chunks", stale_removed);
    }

    let stats = IndexStats {
        database: source.database().to_string(),
        collection: index.collection().to_string(),
        tables_indexed: collected.documents.len(),
        tables_skipped: collected.skipped,
        tables_failed: collected.errors,
        chunks_upserted: upserted,
        stale_chunks_removed: stale_removed,
        points_total: index.count().await?,
    };

    info!(
        "Upserted {} chunks into {} ({} points total)",
        stats.chunks_upserted, stats.collection, stats.points_total
    );
    Ok(stats)
}

/// Print indexing statistics
pub fn print_index_stats(stats: &IndexStats) {
    println!("\n✓ Schema indexing complete");
    println!("  Database: {}", stats.database);
    println!("  Collection: {}", stats.collection);
    println!("  Tables indexed: {}", stats.tables_indexed);
    if !stats.tables_skipped.is_empty() {
        println!(
            "  Tables skipped: {} ({})",
            stats.tables_skipped.len(),
            stats.tables_skipped.join(", ")
        );
    }
    if !stats.tables_failed.is_empty() {
        println!("  Tables failed: {}", stats.tables_failed.len());
        for failure in &stats.tables_failed {
            println!("    - {}", failure);
        }
    }
    println!("  Chunks upserted: {}", stats.chunks_upserted);
    if stats.stale_chunks_removed > 0 {
        println!("  Stale chunks removed: {}", stats.stale_chunks_removed);
    }
    println!("  Points in collection: {}", stats.points_total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{employees_schema, HashEmbedder, MemoryIndex};

    #[tokio::test]
    async fn test_reindexing_unchanged_schema_is_idempotent() {
        let config = Config::default();
        let mut source = employees_schema();
        source.add_table("sys_settings", &[("k", "varchar(10)")]);
        let embedder = HashEmbedder::new(32);
        let index = MemoryIndex::new("schema_hr");

        let first = cmd_index(&config, &source, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();
        let ids_first = index.ids();

        let second = cmd_index(&config, &source, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(first.tables_indexed, 2);
        assert_eq!(first.tables_skipped, vec!["sys_settings".to_string()]);
        assert_eq!(first.chunks_upserted, second.chunks_upserted);
        assert_eq!(first.points_total, second.points_total);
        assert_eq!(ids_first, index.ids());
    }

    #[tokio::test]
    async fn test_changed_table_replaces_its_old_chunks() {
        let config = Config::default();
        let embedder = HashEmbedder::new(16);
        let index = MemoryIndex::new("schema_hr");

        let mut source = employees_schema();
        let first = cmd_index(&config, &source, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();
        let old_ids = index.ids();
        assert_eq!(first.stale_chunks_removed, 0);

        source.tables[0].meta.row_estimate = Some(99);
        let second = cmd_index(&config, &source, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(second.stale_chunks_removed, 1);
        assert_eq!(second.points_total, first.points_total);

        let new_ids = index.ids();
        let employee_ids: Vec<&String> =
            new_ids.iter().filter(|id| id.contains("::employees::")).collect();
        assert_eq!(employee_ids.len(), 1);
        assert!(!old_ids.contains(employee_ids[0]));
        assert!(new_ids
            .iter()
            .filter(|id| id.contains("::departments::"))
            .all(|id| old_ids.contains(id)));
    }

    #[tokio::test]
    async fn test_long_documents_are_split_and_batched() {
        let mut config = Config::default();
        config.index.chunk_max_chars = 40;
        config.embedding.batch_size = 3;
        let source = employees_schema();
        let embedder = HashEmbedder::new(16);
        let index = MemoryIndex::new("schema_hr");

        let stats = cmd_index(&config, &source, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();

        assert!(stats.chunks_upserted > 2);
        assert_eq!(stats.points_total, stats.chunks_upserted as u64);
        assert_eq!(embedder.calls(), stats.chunks_upserted.div_ceil(3));
    }

    #[tokio::test]
    async fn test_reset_drops_stale_points() {
        let config = Config::default();
        let embedder = HashEmbedder::new(16);
        let index = MemoryIndex::new("schema_hr");

        let mut old = employees_schema();
        old.add_table("legacy_orders", &[("id", "int")]);
        cmd_index(&config, &old, &embedder, &index, IndexOptions::default())
            .await
            .unwrap();

        let stats = cmd_index(
            &config,
            &employees_schema(),
            &embedder,
            &index,
            IndexOptions {
                reset: true,
                sample_rows: Some(0),
            },
        )
        .await
        .unwrap();

        assert_eq!(stats.points_total, 2);
        assert!(index.ids().iter().all(|id| !id.contains("legacy_orders")));
    }
}
