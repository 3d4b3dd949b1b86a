use crate::error::ProviderError;
use crate::utils::text::truncate_chars;
use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Bare key prefixes; the prefix itself is redacted along with the token.
const KEY_PREFIXES: [&str; 6] = ["sk-", "ghp_", "github_pat_", "hf_", "AIza", "ya29."];

/// Markers followed by a secret value.
const VALUE_MARKERS: [&str; 8] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "\"authorization\":\"Bearer ",
    "x-api-key: ",
    "api_key=",
    "access_token=",
    "\"api_key\":\"",
    "\"access_token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|&(_, c)| !is_secret_char(c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn redact_after(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let value_start = start + marker.len();
        let end = token_end(scrubbed, value_start);

        if end == value_start {
            search_from = value_start;
            continue;
        }

        scrubbed.replace_range(start..end, REDACTED);
        search_from = start + REDACTED.len();
    }
}

/// Redact provider keys and bearer tokens from text headed for logs or
/// diagnostic fields.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    let hit = KEY_PREFIXES
        .iter()
        .chain(VALUE_MARKERS.iter())
        .any(|pattern| input.contains(pattern));
    if !hit {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for pattern in KEY_PREFIXES.iter().chain(VALUE_MARKERS.iter()) {
        redact_after(&mut scrubbed, pattern);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets, then cap the text at 200 characters.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    format!("{}...", truncate_chars(&scrubbed, MAX_API_ERROR_CHARS))
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &'static str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    ProviderError::Upstream {
        provider,
        status,
        body: sanitize_api_error(&body),
    }
}
