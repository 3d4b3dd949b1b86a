use super::Config;

const LOCALE_ENV: &str = "TUTOR_LANG";

fn system_locale() -> Option<String> {
    std::env::var("LANG")
        .ok()
        .map(|lang| lang.trim().to_lowercase())
        .filter(|lang| !lang.is_empty() && lang != "c" && lang != "posix")
}

/// `TUTOR_LANG` -> config `locale` -> `LANG` -> `"en"`.
fn resolve_locale(configured: Option<&str>) -> String {
    if let Ok(lang) = std::env::var(LOCALE_ENV)
        && !lang.trim().is_empty()
    {
        return base_language(&lang.trim().to_lowercase());
    }

    if let Some(configured) = configured.map(str::trim).filter(|c| !c.is_empty()) {
        return base_language(&configured.to_lowercase());
    }

    system_locale().map_or_else(|| "en".into(), |lang| base_language(&lang))
}

/// `"ja_JP.UTF-8"` -> `"ja"`.
fn base_language(raw: &str) -> String {
    raw.split(['.', '_', '-'])
        .next()
        .unwrap_or(raw)
        .to_string()
}

impl Config {
    pub fn apply_locale(&self) {
        let locale = resolve_locale(self.locale.as_deref());
        tracing::debug!(locale = %locale, "Applying message locale");
        rust_i18n::set_locale(&locale);
    }
}
