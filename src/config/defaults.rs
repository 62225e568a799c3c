//! Default values for configuration

/// Default bookmark service base URL
pub fn default_bookmarks_url() -> String {
    std::env::var("BOOKMARKS_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string())
}

/// Default environment variable name for the bookmark service API key
pub fn default_bookmarks_api_key_env() -> String {
    "BOOKMARKS_API_KEY".to_string()
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "marksearch_bookmarks".to_string()
}

/// Default embedding provider
pub fn default_embedding_provider() -> String {
    "local".to_string()
}

/// Default embedding model (BAAI/bge-small-en-v1.5)
pub fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

/// Default embedding dimension (0 = derive from the model)
pub fn default_embedding_dimension() -> usize {
    0
}

/// Default OpenAI-compatible API base URL
pub fn default_embedding_api_base() -> String {
    std::env::var("EMBEDDING_API_BASE").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default environment variable name for the embedding API key
pub fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default interval between background incremental syncs (minutes)
pub fn default_sync_interval_minutes() -> u64 {
    5
}

/// Default HTTP listen port
pub fn default_server_port() -> u16 {
    3000
}
