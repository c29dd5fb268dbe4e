//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

pub fn default_db_host() -> String {
    std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string())
}

pub fn default_db_port() -> u16 {
    std::env::var("DB_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3307)
}

pub fn default_db_name() -> String {
    std::env::var("DB_NAME").unwrap_or_else(|_| "demo_db".to_string())
}

pub fn default_db_user() -> String {
    std::env::var("DB_USER").unwrap_or_else(|_| "demo_user".to_string())
}

/// Default environment variable holding the database password
pub fn default_db_password_env() -> String {
    "DB_PASS".to_string()
}

/// Full connection URL override (takes precedence over host/port/name/user)
pub fn default_db_url() -> Option<String> {
    std::env::var("DB_URI").ok().filter(|u| !u.is_empty())
}

pub fn default_db_max_connections() -> u32 {
    5
}

/// Default statement timeout in seconds
pub fn default_db_query_timeout() -> u64 {
    30
}

/// Default embedding backend kind
pub fn default_embedding_backend() -> String {
    "local".to_string()
}

/// Default embedding model (sentence-transformers/all-MiniLM-L6-v2)
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    std::env::var("EMBED_BATCH")
        .ok()
        .and_then(|b| b.parse().ok())
        .unwrap_or(32)
}

/// Default embedding backend URL (used when backend = "http")
pub fn default_embedding_url() -> String {
    std::env::var("SQLRAG_EMBEDDING_BACKEND_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:7997".to_string())
}

/// Default OpenAI-compatible endpoint
pub fn default_llm_base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

pub fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

pub fn default_llm_model() -> String {
    std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

pub fn default_llm_max_tokens() -> u32 {
    256
}

pub fn default_llm_temperature() -> f32 {
    0.0
}

/// Default language model request timeout in seconds
pub fn default_llm_timeout() -> u64 {
    60
}

/// Default rows sampled per table
pub fn default_index_sample_rows() -> u32 {
    5
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    2000
}

/// Default: skip reserved tables
pub fn default_skip_reserved() -> bool {
    true
}

/// Default reserved table prefixes
pub fn default_reserved_prefixes() -> Vec<String> {
    ["sys_", "tmp_", "backup_", "test_"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Questions shorter than this many words use `k_short`
pub fn default_short_question_words() -> usize {
    15
}

pub fn default_k_short() -> usize {
    8
}

pub fn default_k_long() -> usize {
    12
}

/// Default LIMIT injected by the guard
pub fn default_row_limit() -> u64 {
    1000
}

/// Default generation attempts (one initial call plus one retry)
pub fn default_max_attempts() -> u32 {
    2
}

pub fn default_retry_backoff_ms() -> u64 {
    250
}
