//! Question to SQL pipeline
//!
//! An explicit state machine:
//!
//! ```text
//! Retrieving -> Generating(1) -> Extracting -+-> Guarding -> Executing -> Done
//!                    ^                        |            \-> Done (no execute)
//!                    +------ Retrying <-------+ (no SQL, attempts left)
//! ```
//!
//! Only extraction failures are retried; every other stage fails fast.

use crate::audit::AuditLog;
use crate::config::{Config, QueryConfig};
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::exec::{JsonRow, QueryExecutor};
use crate::llm::LanguageModel;
use crate::prompt::{build_prompt, retry_prompt};
use crate::retrieve::{RetrievedChunk, Retriever};
use crate::sql::{extract, guard};
use crate::store::VectorIndex;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded retry for generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total language model calls, first one included
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Delay after a failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for RetryPolicy {
    fn from(config: &QueryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_ms: config.retry_backoff_ms,
        }
    }
}

/// Everything produced for one question
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuery {
    pub question: String,
    pub raw_model_output: String,
    pub extracted_sql: String,
    pub guarded_sql: String,
    /// Absent when execution was skipped
    pub rows: Option<Vec<JsonRow>>,
    pub sources: Vec<RetrievedChunk>,
    pub attempts: u32,
}

#[derive(Debug)]
enum State {
    Retrieving,
    Generating { attempt: u32 },
    Extracting { attempt: u32 },
    Retrying { attempt: u32 },
    Guarding,
    Executing,
    Done,
}

pub struct Pipeline<'a> {
    retriever: Retriever<'a>,
    llm: &'a dyn LanguageModel,
    executor: &'a dyn QueryExecutor,
    audit: AuditLog,
    policy: RetryPolicy,
    row_limit: u64,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        llm: &'a dyn LanguageModel,
        executor: &'a dyn QueryExecutor,
        config: &'a Config,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, index, &config.retrieval),
            llm,
            executor,
            audit: AuditLog::new(config.audit_log_path()),
            policy: RetryPolicy::from(&config.query),
            row_limit: config.query.row_limit,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Answer a question; rows are fetched only when `execute` is set
    pub async fn ask(&self, question: &str, execute: bool) -> Result<GeneratedQuery> {
        let mut sources = Vec::new();
        let mut prompt = String::new();
        let mut raw_output = String::new();
        let mut extracted_sql = String::new();
        let mut guarded_sql = String::new();
        let mut rows = None;
        let mut attempts = 0;

        let mut state = State::Retrieving;
        loop {
            debug!("Pipeline state: {:?}", state);
            state = match state {
                State::Retrieving => {
                    let retrieval = self.retriever.retrieve(question).await?;
                    info!(
                        "Using {} schema chunks from tables {:?}",
                        retrieval.chunks.len(),
                        retrieval.tables()
                    );
                    prompt = build_prompt(&retrieval.context_text, question);
                    sources = retrieval.chunks;
                    State::Generating { attempt: 1 }
                }
                State::Generating { attempt } => {
                    attempts = attempt;
                    raw_output = if attempt == 1 {
                        self.llm.complete(&prompt).await?
                    } else {
                        self.llm.complete(&retry_prompt(&prompt)).await?
                    };
                    State::Extracting { attempt }
                }
                State::Extracting { attempt } => match extract(&raw_output) {
                    Some(sql) => {
                        info!("Generated SQL: {}", sql);
                        self.audit.record(question, &sql).await;
                        extracted_sql = sql;
                        State::Guarding
                    }
                    None if attempt < self.policy.max_attempts => State::Retrying { attempt },
                    None => return Err(Error::NoSqlFound { raw_output }),
                },
                State::Retrying { attempt } => {
                    warn!("Model returned no SQL on attempt {}; retrying", attempt);
                    tokio::time::sleep(self.policy.delay(attempt)).await;
                    State::Generating {
                        attempt: attempt + 1,
                    }
                }
                State::Guarding => {
                    guarded_sql = guard(&extracted_sql, self.row_limit)?;
                    if execute {
                        State::Executing
                    } else {
                        debug!("Execution skipped");
                        State::Done
                    }
                }
                State::Executing => {
                    rows = Some(self.executor.execute(&guarded_sql).await?);
                    State::Done
                }
                State::Done => break,
            };
        }

        Ok(GeneratedQuery {
            question: question.to_string(),
            raw_model_output: raw_output,
            extracted_sql,
            guarded_sql,
            rows,
            sources,
            attempts,
        })
    }
}
