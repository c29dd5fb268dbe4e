//! In-memory collaborators for unit tests

use crate::chunk::SchemaChunk;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::exec::{JsonRow, QueryExecutor};
use crate::llm::LanguageModel;
use crate::schema::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaSource, TableDescription, TableMeta,
};
use crate::store::{rank_results, ScoredChunk, VectorIndex};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic bag-of-words embedder
pub struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // Fold plurals so "departments" and "department" land together
            let stem = word.strip_suffix('s').unwrap_or(word);
            let hash = blake3::hash(stem.as_bytes());
            let bucket = u64::from_le_bytes(
                hash.as_bytes()[..8]
                    .try_into()
                    .unwrap_or([0; 8]),
            ) as usize
                % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Vector index kept in a map; `None` means the collection was never created
pub struct MemoryIndex {
    collection: String,
    points: Mutex<Option<BTreeMap<String, (SchemaChunk, Vec<f32>)>>>,
}

impl MemoryIndex {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            points: Mutex::new(None),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.points
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.points.lock().unwrap().is_some())
    }

    async fn upsert(&self, chunks: &[SchemaChunk], vectors: Vec<Vec<f32>>) -> Result<usize> {
        let mut guard = self.points.lock().unwrap();
        let points = guard.get_or_insert_with(BTreeMap::new);
        for (chunk, vector) in chunks.iter().zip(vectors) {
            points.insert(chunk.id.clone(), (chunk.clone(), vector));
        }
        Ok(chunks.len())
    }

    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>> {
        let guard = self.points.lock().unwrap();
        let points = guard.as_ref().ok_or_else(|| {
            Error::Retrieval(format!("Collection '{}' does not exist", self.collection))
        })?;
        let scored = points
            .values()
            .map(|(chunk, v)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine(&vector, v),
            })
            .collect();
        let mut ranked = rank_results(scored);
        ranked.truncate(k);
        Ok(ranked)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.ids().len() as u64)
    }

    async fn prune_stale(&self, table: &str, content_hash: &str) -> Result<u64> {
        let mut guard = self.points.lock().unwrap();
        let Some(points) = guard.as_mut() else {
            return Ok(0);
        };
        let before = points.len();
        points.retain(|_, (chunk, _)| chunk.table != table || chunk.content_hash == content_hash);
        Ok((before - points.len()) as u64)
    }

    async fn reset(&self) -> Result<()> {
        *self.points.lock().unwrap() = Some(BTreeMap::new());
        Ok(())
    }
}

/// Language model that replays canned answers and records prompts
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::LanguageModel("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Executor returning fixed rows
pub struct FakeExecutor {
    rows: Vec<JsonRow>,
    fail: bool,
    executed: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn with_rows(rows: Vec<JsonRow>) -> Self {
        Self {
            rows,
            fail: false,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            fail: true,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<JsonRow>> {
        self.executed.lock().unwrap().push(sql.to_string());
        if self.fail {
            return Err(Error::QueryExecution(sqlx::Error::RowNotFound));
        }
        Ok(self.rows.clone())
    }
}

/// Build a JSON row from pairs, preserving order
pub fn json_row(pairs: &[(&str, Value)]) -> JsonRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Catalog served from memory
pub struct FakeSchemaSource {
    pub database: String,
    pub tables: Vec<TableDescription>,
    /// Tables whose description fails
    pub failing: Vec<String>,
}

impl FakeSchemaSource {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            tables: Vec::new(),
            failing: Vec::new(),
        }
    }

    pub fn add_table(&mut self, name: &str, columns: &[(&str, &str)]) {
        self.tables.push(TableDescription {
            meta: TableMeta {
                name: name.to_string(),
                engine: Some("InnoDB".to_string()),
                row_estimate: Some(0),
            },
            columns: columns
                .iter()
                .map(|(c, t)| column(c, t, "YES", "", ""))
                .collect(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            samples: Vec::new(),
        });
    }
}

#[async_trait]
impl SchemaSource for FakeSchemaSource {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        Ok(self.tables.iter().map(|t| t.meta.clone()).collect())
    }

    async fn describe(&self, table: &TableMeta, sample_rows: u32) -> Result<TableDescription> {
        if self.failing.contains(&table.name) {
            return Err(Error::Database(sqlx::Error::RowNotFound));
        }
        let mut desc = self
            .tables
            .iter()
            .find(|t| t.meta.name == table.name)
            .cloned()
            .ok_or_else(|| Error::Database(sqlx::Error::RowNotFound))?;
        desc.samples.truncate(sample_rows as usize);
        Ok(desc)
    }
}

fn column(name: &str, column_type: &str, nullable: &str, key: &str, extra: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        column_type: column_type.to_string(),
        is_nullable: nullable.to_string(),
        column_key: key.to_string(),
        extra: extra.to_string(),
    }
}

fn sample(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// A small HR database: employees reference departments
pub fn employees_schema() -> FakeSchemaSource {
    let mut source = FakeSchemaSource::new("hr");

    source.tables.push(TableDescription {
        meta: TableMeta {
            name: "employees".to_string(),
            engine: Some("InnoDB".to_string()),
            row_estimate: Some(3),
        },
        columns: vec![
            column("id", "int", "NO", "PRI", "auto_increment"),
            column("name", "varchar(100)", "NO", "", ""),
            column("salary", "decimal(10,2)", "YES", "", ""),
            column("department_id", "int", "YES", "MUL", ""),
        ],
        foreign_keys: vec![ForeignKeyInfo {
            column: "department_id".to_string(),
            referenced_table: "departments".to_string(),
            referenced_column: "id".to_string(),
        }],
        indexes: vec![
            IndexInfo {
                key_name: "PRIMARY".to_string(),
                unique: true,
                column: "id".to_string(),
            },
            IndexInfo {
                key_name: "department_id".to_string(),
                unique: false,
                column: "department_id".to_string(),
            },
        ],
        samples: vec![sample(&[
            ("id", "1"),
            ("name", "Ada"),
            ("department_id", "10"),
        ])],
    });

    source.tables.push(TableDescription {
        meta: TableMeta {
            name: "departments".to_string(),
            engine: Some("InnoDB".to_string()),
            row_estimate: Some(2),
        },
        columns: vec![
            column("id", "int", "NO", "PRI", "auto_increment"),
            column("name", "varchar(100)", "NO", "UNI", ""),
        ],
        foreign_keys: Vec::new(),
        indexes: vec![IndexInfo {
            key_name: "PRIMARY".to_string(),
            unique: true,
            column: "id".to_string(),
        }],
        samples: vec![sample(&[("id", "10"), ("name", "Research")])],
    });

    source
}

/// The HR database plus ten unrelated commerce tables
pub fn employees_schema_with_distractors() -> FakeSchemaSource {
    let mut source = employees_schema();
    source.add_table(
        "products",
        &[("sku", "varchar(32)"), ("title", "varchar(200)"), ("price", "decimal(10,2)")],
    );
    source.add_table(
        "inventory",
        &[("sku", "varchar(32)"), ("warehouse_code", "char(4)"), ("quantity", "int")],
    );
    source.add_table(
        "orders",
        &[
            ("id", "int"),
            ("customer_id", "int"),
            ("total_amount", "decimal(10,2)"),
            ("placed_at", "datetime"),
        ],
    );
    source.add_table(
        "customers",
        &[("id", "int"), ("email", "varchar(255)"), ("city", "varchar(80)")],
    );
    source.add_table(
        "suppliers",
        &[("id", "int"), ("company", "varchar(120)"), ("country", "char(2)")],
    );
    source.add_table(
        "shipments",
        &[
            ("id", "int"),
            ("order_id", "int"),
            ("carrier", "varchar(40)"),
            ("shipped_at", "datetime"),
        ],
    );
    source.add_table(
        "invoices",
        &[("id", "int"), ("order_id", "int"), ("due_date", "date")],
    );
    source.add_table(
        "payments",
        &[
            ("id", "int"),
            ("invoice_id", "int"),
            ("method", "varchar(20)"),
            ("paid_at", "datetime"),
        ],
    );
    source.add_table(
        "reviews",
        &[
            ("id", "int"),
            ("product_sku", "varchar(32)"),
            ("rating", "tinyint"),
            ("body", "text"),
        ],
    );
    source.add_table(
        "coupons",
        &[("code", "varchar(16)"), ("discount_pct", "int"), ("expires_at", "date")],
    );
    source
}
