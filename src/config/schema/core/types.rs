use crate::config::schema::{
    CacheConfig, GatewayConfig, ObservabilityConfig, ProvidersConfig, RetrievalConfig,
    StoreConfig, TutoringConfig,
};
use crate::error::ConfigError;
use crate::providers::ProviderFamily;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Message language. Unset defers to `LANG`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tutoring: TutoringConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

pub(super) fn default_config_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".tutor-gateway")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_dir().join("config.toml"),
            locale: None,
            gateway: GatewayConfig::default(),
            providers: ProvidersConfig::default(),
            retrieval: RetrievalConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            tutoring: TutoringConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temperature = self.tutoring.default_temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Validation(format!(
                "tutoring.default_temperature must be within 0.0..=2.0, got {temperature}"
            )));
        }
        if self.tutoring.default_max_tokens == 0 {
            return Err(ConfigError::Validation(
                "tutoring.default_max_tokens must be positive".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Validation(
                "retrieval.top_k must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_relevance) {
            return Err(ConfigError::Validation(format!(
                "retrieval.min_relevance must be within 0.0..=1.0, got {}",
                self.retrieval.min_relevance
            )));
        }
        ProviderFamily::resolve(&self.tutoring.default_model)?;
        if self.cache.ttl_secs == 0 || self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.ttl_secs and cache.sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
