use regex::{Captures, Regex};
use std::sync::LazyLock;

// OpenAI-style secret keys: sk-..., sk-proj-...
static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-[a-zA-Z0-9_\-]{16,}").expect("valid api key pattern"));

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.=]+").expect("valid bearer pattern"));

// Three base64url segments starting with `eyJ`.
static JWT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eyJ[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+").expect("valid jwt pattern")
});

static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(["']?(?:api[_-]?key|access_token|token|secret)["']?\s*[:=]\s*["']?)([a-zA-Z0-9\-_\.]{8,})"#,
    )
    .expect("valid field pattern")
});

/// Remove credentials from a message before it is logged or embedded in an error
pub fn scrub(message: &str) -> String {
    let scrubbed = BEARER_PATTERN.replace_all(message, "Bearer [TOKEN_REDACTED]");
    let scrubbed = JWT_PATTERN.replace_all(&scrubbed, "[TOKEN_REDACTED]");
    let scrubbed = API_KEY_PATTERN.replace_all(&scrubbed, "[API_KEY_REDACTED]");
    FIELD_PATTERN
        .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
        .into_owned()
}

/// Redact all but a short prefix of a credential for diagnostics
pub fn redact_key(key: &str) -> String {
    if key.len() > 8 && key.is_ascii() {
        format!("{}...[REDACTED]", &key[..4])
    } else {
        "[REDACTED]".to_string()
    }
}
