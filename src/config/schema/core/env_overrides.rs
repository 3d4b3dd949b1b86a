use super::Config;

fn first_non_empty(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl Config {
    /// Environment wins over the TOML file for credentials and bind address.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = first_non_empty(&["OPENAI_API_KEY"]) {
            self.providers.openai_api_key = Some(key);
        }

        if let Some(key) = first_non_empty(&["ANTHROPIC_API_KEY"]) {
            self.providers.anthropic_api_key = Some(key);
        }

        if let Some(url) = first_non_empty(&["TUTOR_DATABASE_URL", "DATABASE_URL"]) {
            self.store.database_url = url;
        }

        if let Some(host) = first_non_empty(&["TUTOR_GATEWAY_HOST", "HOST"]) {
            self.gateway.host = host;
        }

        if let Some(port_str) = first_non_empty(&["TUTOR_GATEWAY_PORT", "PORT"])
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Some(model) = first_non_empty(&["TUTOR_DEFAULT_MODEL"]) {
            self.tutoring.default_model = model;
        }
    }
}
