use crate::error::ConfigError;

const OPENAI_PREFIXES: [&str; 5] = ["gpt-", "o1", "o3", "o4", "chatgpt-"];
const ANTHROPIC_PREFIXES: [&str; 1] = ["claude-"];

/// The LLM services the dispatcher knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum ProviderFamily {
    #[strum(serialize = "OpenAI")]
    OpenAi,
    #[strum(serialize = "Anthropic")]
    Anthropic,
}

impl ProviderFamily {
    /// Resolve a configured model string into its family and the model id to
    /// send upstream. An `openai/` or `anthropic/` namespace is stripped.
    pub fn resolve(model: &str) -> Result<(Self, String), ConfigError> {
        let trimmed = model.trim();
        let unknown = || ConfigError::UnknownModel(model.to_string());

        if let Some((namespace, rest)) = trimmed.split_once('/') {
            let family = match namespace.to_ascii_lowercase().as_str() {
                "openai" => Self::OpenAi,
                "anthropic" => Self::Anthropic,
                _ => return Err(unknown()),
            };
            if rest.is_empty() {
                return Err(unknown());
            }
            return Ok((family, rest.to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        if OPENAI_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            Ok((Self::OpenAi, trimmed.to_string()))
        } else if ANTHROPIC_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            Ok((Self::Anthropic, trimmed.to_string()))
        } else {
            Err(unknown())
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn supports_streaming(self) -> bool {
        matches!(self, Self::OpenAi)
    }
}
