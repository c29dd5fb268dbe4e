//! Query execution against MySQL
//!
//! Rows come back as ordered column-name-to-JSON maps.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, info};

/// One result row, column order preserved
pub type JsonRow = Map<String, Value>;

/// Runs guarded statements
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Vec<JsonRow>>;
}

/// Build a lazily connecting pool; nothing touches the network until first use
pub fn connect_pool(config: &DatabaseConfig) -> Result<MySqlPool> {
    let options = config.connect_options()?;
    let acquire = Duration::from_secs(config.query_timeout_secs.clamp(1, 10));

    debug!(
        "Creating MySQL pool for {}:{}/{} (max {} connections)",
        config.host, config.port, config.name, config.max_connections
    );

    Ok(MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(acquire)
        .connect_lazy_with(options))
}

/// Executor over a MySQL pool
pub struct MySqlExecutor {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(
            connect_pool(config)?,
            Duration::from_secs(config.query_timeout_secs),
        ))
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<JsonRow>> {
        debug!("Executing: {}", sql);

        let rows = tokio::time::timeout(self.timeout, sqlx::query(sql).fetch_all(&self.pool))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "query did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(Error::QueryExecution)?;

        info!("Query returned {} rows", rows.len());
        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Convert a MySQL row into a JSON object
pub fn row_to_json(row: &MySqlRow) -> JsonRow {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn lossy_text(bytes: Vec<u8>) -> Value {
    Value::String(String::from_utf8_lossy(&bytes).into_owned())
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    let decoded = match type_name {
        t if t.ends_with("UNSIGNED") => row.try_get::<u64, _>(index).map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get::<i64, _>(index).map(Value::from)
        }
        "FLOAT" => row.try_get::<f32, _>(index).map(|f| float_value(f as f64)),
        "DOUBLE" => row.try_get::<f64, _>(index).map(float_value),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|d| Value::String(d.to_rfc3339())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            row.try_get_unchecked::<Vec<u8>, _>(index).map(lossy_text)
        }
        // DECIMAL, text, JSON, ENUM and SET arrive as text
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };

    decoded
        .or_else(|_| row.try_get_unchecked::<Vec<u8>, _>(index).map(lossy_text))
        .unwrap_or_else(|e| {
            debug!("Could not decode {} column {}: {}", type_name, index, e);
            Value::Null
        })
}
