use serde::{Deserialize, Serialize};

use crate::models::SearchWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Similarity index gateway configuration
    pub gateway: GatewayConfig,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// Ranking and result-shaping knobs
    pub search: SearchConfig,
}

/// Configuration for the similarity index gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL for the index gateway (e.g. "http://127.0.0.1:9200").
    /// If None, the engine degrades to empty results.
    pub base_url: Option<String>,
    /// Name of the project-level summary collection.
    pub summary_collection: String,
    /// Name of the file-level details collection.
    pub details_collection: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            summary_collection: "research_summaries".to_string(),
            details_collection: "research_details".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API. If None, vector methods are skipped.
    pub base_url: Option<String>,
    /// Model name for embeddings
    pub model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub dim: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: None,
            model: "mxbai-embed-large".to_string(),
            api_key: None,
            dim: 1024,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result count when the caller does not supply one.
    pub default_limit: usize,
    /// Maximum tags kept per result after relevance reordering.
    pub max_tags: usize,
    /// Details-mode over-fetch multiplier, headroom for deduplication.
    pub over_fetch_factor: usize,
    /// Relative weights for the fused scoring methods.
    pub weights: SearchWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_tags: 5,
            over_fetch_factor: 3,
            weights: SearchWeights::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RESEARCH_SEARCH_GATEWAY_URL") {
            config.gateway.base_url = Some(url);
        }
        if let Ok(name) = std::env::var("RESEARCH_SEARCH_SUMMARY_COLLECTION") {
            config.gateway.summary_collection = name;
        }
        if let Ok(name) = std::env::var("RESEARCH_SEARCH_DETAILS_COLLECTION") {
            config.gateway.details_collection = name;
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_GATEWAY_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.gateway.timeout_secs = v;
            }
        }

        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.embedding.dim = d;
            }
        }
        if let Ok(val) = std::env::var("EMBEDDING_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.embedding.timeout_secs = v;
            }
        }

        if let Ok(val) = std::env::var("RESEARCH_SEARCH_DEFAULT_LIMIT") {
            if let Ok(v) = val.parse() {
                config.search.default_limit = v;
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_MAX_TAGS") {
            if let Ok(v) = val.parse() {
                config.search.max_tags = v;
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_OVER_FETCH_FACTOR") {
            if let Ok(v) = val.parse::<usize>() {
                config.search.over_fetch_factor = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_TEXT_WEIGHT") {
            if let Ok(v) = val.parse::<u32>() {
                config.search.weights.text = v.min(100);
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_ABSTRACT_VECTOR_WEIGHT") {
            if let Ok(v) = val.parse::<u32>() {
                config.search.weights.abstract_vector = v.min(100);
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_TAGS_VECTOR_WEIGHT") {
            if let Ok(v) = val.parse::<u32>() {
                config.search.weights.tags_vector = v.min(100);
            }
        }
        if let Ok(val) = std::env::var("RESEARCH_SEARCH_PROPER_NOUN_VECTOR_WEIGHT") {
            if let Ok(v) = val.parse::<u32>() {
                config.search.weights.proper_noun_vector = v.min(100);
            }
        }

        config
    }
}
