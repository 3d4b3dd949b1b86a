use crate::config::TutoringConfig;
use crate::error::ConfigError;
use crate::providers::ProviderFamily;
use crate::store::{ActivityKind, SettingsOverride, TutorStore};
use sha2::{Digest, Sha256};

/// Fully resolved per-request provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub family: ProviderFamily,
    /// Model id as sent upstream, namespace already stripped.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub prompt_template: String,
}

impl ProviderSettings {
    /// Short hash over everything that changes what the provider would say.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.family.name().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.model.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.temperature.to_bits().to_le_bytes());
        hasher.update(self.max_tokens.to_le_bytes());
        hasher.update(self.prompt_template.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

/// Lookup order, most specific first.
fn lookup_chain(
    cohort: Option<&str>,
    kind: Option<ActivityKind>,
) -> Vec<(Option<&str>, Option<ActivityKind>)> {
    let mut chain = Vec::with_capacity(4);
    if let (Some(cohort), Some(kind)) = (cohort, kind) {
        chain.push((Some(cohort), Some(kind)));
    }
    if let Some(cohort) = cohort {
        chain.push((Some(cohort), None));
    }
    if let Some(kind) = kind {
        chain.push((None, Some(kind)));
    }
    chain.push((None, None));
    chain
}

/// Fill unset fields from a less specific row. Out-of-range values in `from`
/// count as unset so they never hide a valid value further down the chain.
fn merge_missing(into: &mut SettingsOverride, from: SettingsOverride) {
    if into.model.is_none() {
        into.model = from.model.filter(|m| !m.trim().is_empty());
    }
    if into.temperature.is_none() {
        into.temperature = from.temperature.filter(|t| (0.0..=2.0).contains(t));
    }
    if into.max_tokens.is_none() {
        into.max_tokens = from.max_tokens.filter(|n| *n > 0);
    }
    if into.prompt_template.is_none() {
        into.prompt_template = from.prompt_template.filter(|t| !t.trim().is_empty());
    }
}

fn is_complete(settings: &SettingsOverride) -> bool {
    settings.model.is_some()
        && settings.temperature.is_some()
        && settings.max_tokens.is_some()
        && settings.prompt_template.is_some()
}

/// Walk `(cohort, kind)` → `(cohort, *)` → `(*, kind)` → `(*, *)` and fill
/// each field from the most specific row that sets it, falling back to
/// `defaults`. A failed lookup counts as a missing row.
pub async fn resolve_settings(
    store: &dyn TutorStore,
    cohort: Option<&str>,
    kind: Option<ActivityKind>,
    defaults: &TutoringConfig,
) -> Result<ProviderSettings, ConfigError> {
    let mut merged = SettingsOverride::default();

    for (level_cohort, level_kind) in lookup_chain(cohort, kind) {
        match store.find_settings(level_cohort, level_kind).await {
            Ok(Some(row)) => merge_missing(&mut merged, row),
            Ok(None) => {}
            Err(error) => tracing::warn!(
                cohort = level_cohort.unwrap_or("*"),
                kind = level_kind.map_or("*", Into::into),
                error = %format!("{error:#}"),
                "Settings lookup failed; treating as no override"
            ),
        }
        if is_complete(&merged) {
            break;
        }
    }

    let configured_model = merged
        .model
        .unwrap_or_else(|| defaults.default_model.clone());
    let (family, model) = ProviderFamily::resolve(&configured_model)?;

    Ok(ProviderSettings {
        family,
        model,
        temperature: merged.temperature.unwrap_or(defaults.default_temperature),
        max_tokens: merged.max_tokens.unwrap_or(defaults.default_max_tokens),
        prompt_template: merged
            .prompt_template
            .unwrap_or_else(|| defaults.default_prompt_template.clone()),
    })
}
