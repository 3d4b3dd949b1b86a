use serde::{Deserialize, Serialize};

/// Credentials and endpoints for the two provider families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    /// Upper bound for one provider call, streaming included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
