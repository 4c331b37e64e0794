use regex::Regex;
use std::sync::LazyLock;

/// Daily export suffix, e.g. `events/2021-06-01.tsv` or `events/export_2021-06-01.tsv`
static OBJECT_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}\.tsv$").expect("object key regex"));

/// Size gate: empty objects and objects above the ceiling are not ingested
pub fn is_size_allowed(size: i64, max_size: i64) -> bool {
    size > 0 && size <= max_size
}

/// Key gate: the key must end in a `YYYY-MM-DD.tsv` date
pub fn is_key_allowed(key: &str) -> bool {
    OBJECT_KEY_RE.is_match(key)
}

/// Lowercased media type without parameters (`; charset=...`)
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Validates a declared content type against the configured allowlist
pub fn is_content_type_allowed(content_type: &str, allowed: &[String]) -> bool {
    let normalized = normalize_content_type(content_type);
    !normalized.is_empty()
        && allowed
            .iter()
            .any(|candidate| normalize_content_type(candidate) == normalized)
}
