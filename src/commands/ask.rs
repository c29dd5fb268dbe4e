//! Ask command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::exec::{JsonRow, QueryExecutor};
use crate::llm::LanguageModel;
use crate::pipeline::{GeneratedQuery, Pipeline};
use crate::store::VectorIndex;
use serde::Serialize;
use serde_json::Value;

/// Where a piece of schema context came from
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub table: String,
    pub chunk_id: String,
    pub distance: f32,
    pub rank: usize,
}

/// Answer for display or JSON output
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub question: String,
    pub sql: String,
    pub rows: Option<Vec<JsonRow>>,
    pub sources: Vec<SourceRef>,
    pub attempts: u32,
}

impl From<GeneratedQuery> for AskResult {
    fn from(generated: GeneratedQuery) -> Self {
        Self {
            question: generated.question,
            sql: generated.guarded_sql,
            rows: generated.rows,
            sources: generated
                .sources
                .into_iter()
                .map(|c| SourceRef {
                    table: c.table,
                    chunk_id: c.chunk_id,
                    distance: c.distance,
                    rank: c.rank,
                })
                .collect(),
            attempts: generated.attempts,
        }
    }
}

/// Turn a question into SQL and optionally run it
pub async fn cmd_ask(
    config: &Config,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    llm: &dyn LanguageModel,
    executor: &dyn QueryExecutor,
    question: &str,
    execute: bool,
) -> Result<AskResult> {
    let pipeline = Pipeline::new(embedder, index, llm, executor, config);
    Ok(pipeline.ask(question, execute).await?.into())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Print an answer to console
pub fn print_ask_result(result: &AskResult) {
    println!("\n🧠 Generated SQL:\n{}\n", result.sql);

    let mut tables: Vec<&str> = Vec::new();
    for source in &result.sources {
        if !tables.contains(&source.table.as_str()) {
            tables.push(&source.table);
        }
    }
    println!("Schema context: {}", tables.join(", "));
    if result.attempts > 1 {
        println!("Attempts: {}", result.attempts);
    }

    let Some(rows) = &result.rows else {
        println!("\n(not executed)");
        return;
    };

    println!("\n{} row(s)", rows.len());
    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        println!("{}", header.join(" | "));
        for row in rows {
            let cells: Vec<String> = row.values().map(cell_text).collect();
            println!("{}", cells.join(" | "));
        }
    }
}
