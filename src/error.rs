//! Custom error types for sqlrag

use thiserror::Error;

/// Main error type for sqlrag operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema collection or connection-level database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    /// The schema was never indexed for this database
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The model produced no recoverable SELECT statement
    #[error("No valid SQL found in model output:\n{raw_output}")]
    NoSqlFound { raw_output: String },

    #[error("Unsafe query rejected: {0}")]
    UnsafeQuery(String),

    /// The database rejected a guarded statement
    #[error("Query failed: {0}")]
    QueryExecution(#[source] sqlx::Error),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'sqlrag init' first")]
    NotInitialized,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),
}

impl Error {
    /// Pipeline stage the error belongs to, for user-facing reports
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Retrieval(_) | Error::Qdrant(_) | Error::Embedding(_) => "retrieval",
            Error::LanguageModel(_) => "generation",
            Error::NoSqlFound { .. } => "extraction",
            Error::UnsafeQuery(_) => "guard",
            Error::QueryExecution(_) | Error::Timeout(_) => "execution",
            _ => "setup",
        }
    }
}

/// Result type alias for sqlrag
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sql_found_carries_raw_output() {
        let err = Error::NoSqlFound {
            raw_output: "I am not sure".to_string(),
        };
        assert!(err.to_string().contains("I am not sure"));
        assert_eq!(err.stage(), "extraction");
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(Error::UnsafeQuery("x".into()).stage(), "guard");
        assert_eq!(Error::Retrieval("x".into()).stage(), "retrieval");
        assert_eq!(
            Error::QueryExecution(sqlx::Error::RowNotFound).stage(),
            "execution"
        );
        assert_eq!(Error::NotInitialized.stage(), "setup");
    }
}
