use serde::{Deserialize, Serialize};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are a patient AI tutor supporting {student_name}.
Current activity: {activity_title}.
Help the student reason through the question step by step. Ask guiding questions, \
point out gaps in their reasoning, and avoid handing over finished answers.

Student question: {question}";

/// Hardcoded global defaults, the last link of the settings fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutoringConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_prompt_template")]
    pub default_prompt_template: String,
    /// Turns read from storage per request.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Exchanges actually sent to the provider.
    #[serde(default = "default_max_history_exchanges")]
    pub max_history_exchanges: usize,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.into()
}

fn default_history_window() -> usize {
    5
}

fn default_max_history_exchanges() -> usize {
    4
}

impl Default for TutoringConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            default_prompt_template: default_prompt_template(),
            history_window: default_history_window(),
            max_history_exchanges: default_max_history_exchanges(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_base_url")]
    pub embedding_base_url: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity (0–1) a passage must reach.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f32,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_embedding_timeout_secs() -> u64 {
    10
}

fn default_search_timeout_secs() -> u64 {
    5
}

fn default_top_k() -> usize {
    3
}

fn default_min_relevance() -> f32 {
    0.7
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            embedding_base_url: default_embedding_base_url(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            top_k: default_top_k(),
            min_relevance: default_min_relevance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://tutor.db?mode=rwc".into()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}
