use super::Config;
use super::types::default_config_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }

    /// Reads `path` (or the default location) when it exists, otherwise starts
    /// from defaults. Environment overrides are applied before validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };
        config.config_path = config_path;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
