//! MySQL catalog collector backed by `information_schema`

use super::{ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaSource, TableDescription, TableMeta};
use crate::error::Result;
use crate::exec::row_to_json;
use crate::naming::quote_identifier;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;
use sqlx::FromRow;
use tracing::{debug, warn};

#[derive(Debug, FromRow)]
struct TableRow {
    table_name: String,
    engine: Option<String>,
    table_rows: Option<u64>,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_key: String,
    extra: String,
}

#[derive(Debug, FromRow)]
struct ForeignKeyRow {
    column_name: String,
    referenced_table_name: String,
    referenced_column_name: String,
}

#[derive(Debug, FromRow)]
struct IndexRow {
    index_name: String,
    non_unique: i64,
    column_name: Option<String>,
}

/// Reads table metadata for one database
pub struct MySqlSchemaCollector {
    pool: MySqlPool,
    database: String,
}

impl MySqlSchemaCollector {
    pub fn new(pool: MySqlPool, database: impl Into<String>) -> Self {
        Self {
            pool,
            database: database.into(),
        }
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows: Vec<ColumnRow> = sqlx::query_as(
            r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(COLUMN_TYPE AS CHAR) AS column_type,
                   CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                   CAST(COLUMN_KEY AS CHAR) AS column_key,
                   CAST(EXTRA AS CHAR) AS extra
            FROM information_schema.columns
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ColumnInfo {
                name: r.column_name,
                column_type: r.column_type,
                is_nullable: r.is_nullable,
                column_key: r.column_key,
                extra: r.extra,
            })
            .collect())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let rows: Vec<ForeignKeyRow> = sqlx::query_as(
            r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(REFERENCED_TABLE_NAME AS CHAR) AS referenced_table_name,
                   CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column_name
            FROM information_schema.key_column_usage
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ForeignKeyInfo {
                column: r.column_name,
                referenced_table: r.referenced_table_name,
                referenced_column: r.referenced_column_name,
            })
            .collect())
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let rows: Vec<IndexRow> = sqlx::query_as(
            r#"
            SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
                   CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                   CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM information_schema.statistics
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| IndexInfo {
                key_name: r.index_name,
                unique: r.non_unique == 0,
                column: r.column_name.unwrap_or_default(),
            })
            .collect())
    }

    async fn sample_rows(&self, table: &str, n: u32) -> Result<Vec<Map<String, Value>>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT * FROM {} LIMIT ?", quote_identifier(table)?);
        let rows = sqlx::query(&sql).bind(n).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                row_to_json(row)
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(sample_value_text(v))))
                    .collect()
            })
            .collect())
    }
}

/// Sample values are shown as text; NULL becomes an empty string
fn sample_value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl SchemaSource for MySqlSchemaCollector {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        let rows: Vec<TableRow> = sqlx::query_as(
            r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name,
                   CAST(ENGINE AS CHAR) AS engine,
                   CAST(TABLE_ROWS AS UNSIGNED) AS table_rows
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME
            "#,
        )
        .bind(&self.database)
        .fetch_all(&self.pool)
        .await?;

        debug!("Catalog lists {} tables", rows.len());
        Ok(rows
            .into_iter()
            .map(|r| TableMeta {
                name: r.table_name,
                engine: r.engine,
                row_estimate: r.table_rows,
            })
            .collect())
    }

    async fn describe(&self, table: &TableMeta, sample_rows: u32) -> Result<TableDescription> {
        // Reject hostile names before any query touches them
        quote_identifier(&table.name)?;

        let columns = self.columns(&table.name).await?;
        let foreign_keys = self.foreign_keys(&table.name).await?;

        let indexes = self.indexes(&table.name).await.unwrap_or_else(|e| {
            warn!("Could not read indexes for {}: {}", table.name, e);
            Vec::new()
        });
        let samples = self
            .sample_rows(&table.name, sample_rows)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not sample rows from {}: {}", table.name, e);
                Vec::new()
            });

        Ok(TableDescription {
            meta: table.clone(),
            columns,
            foreign_keys,
            indexes,
            samples,
        })
    }
}
