//! Schema documents
//!
//! One document per table, rendered as plain text for embedding:
//! - Columns with type, nullability, key and extra
//! - Foreign keys and indexes
//! - A handful of sample rows
//!
//! Documents are rebuilt wholesale on every indexing run.

mod collector;

pub use collector::*;

use crate::chunk::compute_text_hash;
use crate::config::IndexConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Catalog entry for a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub engine: Option<String>,
    pub row_estimate: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub is_nullable: String,
    pub column_key: String,
    pub extra: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub key_name: String,
    pub unique: bool,
    pub column: String,
}

/// Everything known about one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescription {
    pub meta: TableMeta,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
    /// Sample rows with values already rendered as strings
    pub samples: Vec<Map<String, Value>>,
}

/// Rendered, hashed description of one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub table: String,
    pub database: String,
    pub text: String,
    pub content_hash: String,
    pub created_at: String,
}

impl SchemaDocument {
    /// Render and hash a table description
    pub fn build(database: &str, desc: &TableDescription) -> Self {
        let text = render_table(desc);
        Self {
            table: desc.meta.name.clone(),
            database: database.to_string(),
            content_hash: compute_text_hash(&text),
            text,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "None".to_string())
}

/// Render a table description as embedding text
pub fn render_table(desc: &TableDescription) -> String {
    let mut parts = Vec::new();
    parts.push(format!("Table: {}", desc.meta.name));
    parts.push(format!(
        "Engine: {} Rows(estimate): {}",
        display_opt(&desc.meta.engine),
        display_opt(&desc.meta.row_estimate)
    ));

    parts.push("Columns:".to_string());
    for c in &desc.columns {
        parts.push(format!(
            "- {}: {} nullable={} key={} extra={}",
            c.name, c.column_type, c.is_nullable, c.column_key, c.extra
        ));
    }

    if !desc.foreign_keys.is_empty() {
        parts.push("Foreign Keys:".to_string());
        for fk in &desc.foreign_keys {
            parts.push(format!(
                "- {} -> {}.{}",
                fk.column, fk.referenced_table, fk.referenced_column
            ));
        }
    }

    if !desc.indexes.is_empty() {
        parts.push("Indexes:".to_string());
        for idx in &desc.indexes {
            parts.push(format!(
                "- {} unique={} cols={}",
                idx.key_name, idx.unique, idx.column
            ));
        }
    }

    if !desc.samples.is_empty() {
        parts.push(format!("Sample rows (first {}):", desc.samples.len()));
        for row in &desc.samples {
            parts.push(Value::Object(row.clone()).to_string());
        }
    }

    parts.join("\n")
}

/// Whether a table name starts with one of the reserved prefixes
pub fn is_reserved(table: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| table.starts_with(p.as_str()))
}

/// Source of table descriptions (the database catalog)
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Name of the database being described
    fn database(&self) -> &str;

    async fn list_tables(&self) -> Result<Vec<TableMeta>>;

    async fn describe(&self, table: &TableMeta, sample_rows: u32) -> Result<TableDescription>;
}

/// Documents produced by one collection pass
#[derive(Debug, Default)]
pub struct CollectedSchema {
    pub documents: Vec<SchemaDocument>,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

/// Build one document per non-reserved table
pub async fn collect_documents(
    source: &dyn SchemaSource,
    config: &IndexConfig,
    sample_rows: u32,
) -> Result<CollectedSchema> {
    let database = source.database().to_string();
    let tables = source.list_tables().await?;
    let total = tables.len();
    info!("Found {} tables in database '{}'", total, database);

    let mut collected = CollectedSchema::default();
    for (i, table) in tables.iter().enumerate() {
        if config.skip_reserved && is_reserved(&table.name, &config.reserved_prefixes) {
            info!("Skipping reserved table: {}", table.name);
            collected.skipped.push(table.name.clone());
            continue;
        }

        info!("[{}/{}] Processing table: {}", i + 1, total, table.name);
        match source.describe(table, sample_rows).await {
            Ok(desc) => collected
                .documents
                .push(SchemaDocument::build(&database, &desc)),
            Err(e) => {
                let message = format!("{}: {}", table.name, e);
                warn!("Error processing {}", message);
                collected.errors.push(message);
            }
        }
    }

    info!(
        "Extracted {} table docs ({} skipped)",
        collected.documents.len(),
        collected.skipped.len()
    );
    Ok(collected)
}
