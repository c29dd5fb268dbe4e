//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::VectorIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub database: String,
    pub qdrant_url: String,
    pub collection_name: String,
    pub qdrant_connected: bool,
    pub collection_exists: bool,
    pub qdrant_points: u64,
    pub embedding_model: String,
    pub llm_model: String,
    pub audit_log: String,
}

/// Get system status
pub async fn cmd_status(config: &Config, index: &dyn VectorIndex) -> Result<StatusInfo> {
    info!("Getting status");

    let (qdrant_connected, collection_exists, qdrant_points) = match index.collection_exists().await
    {
        Ok(true) => match index.count().await {
            Ok(count) => (true, true, count),
            Err(e) => {
                debug!("Qdrant count error: {:?}", e);
                (true, true, 0)
            }
        },
        Ok(false) => (true, false, 0),
        Err(e) => {
            debug!("Qdrant connection error: {:?}", e);
            (false, false, 0)
        }
    };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        database: config.database.name.clone(),
        qdrant_url: config.qdrant_url.clone(),
        collection_name: index.collection().to_string(),
        qdrant_connected,
        collection_exists,
        qdrant_points,
        embedding_model: config.embedding.model.clone(),
        llm_model: config.llm.model.clone(),
        audit_log: config.audit_log_path().display().to_string(),
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 sqlrag Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.database);
    println!("\nQdrant:");
    println!("  URL: {}", status.qdrant_url);
    println!("  Collection: {}", status.collection_name);

    let connection_status = if status.qdrant_connected {
        if status.collection_exists {
            "✓ Connected"
        } else {
            "⚠ Connected (schema not indexed - run 'sqlrag index')"
        }
    } else {
        "✗ Not connected"
    };
    println!("  Status: {}", connection_status);
    println!("  Points: {}", status.qdrant_points);
    println!("\nEmbedding Model: {}", status.embedding_model);
    println!("Language Model: {}", status.llm_model);
    println!("Audit Log: {}", status.audit_log);
}
