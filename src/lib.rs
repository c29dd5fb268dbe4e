//! sqlrag - natural-language questions to read-only SQL
//!
//! This crate provides:
//! - Schema indexing: MySQL catalog -> table documents -> Qdrant
//! - Retrieval-augmented SQL generation through an OpenAI-compatible model
//! - A guard that only lets a single bounded SELECT reach the database

pub mod audit;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod embedding_backend;
pub mod error;
pub mod exec;
pub mod llm;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod retrieve;
pub mod schema;
pub mod sql;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Error, Result};
