use regex::Regex;
use std::sync::LazyLock;

static SENSITIVE_KV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(access[_-]?token|token|api[_-]?key|password|secret|client[_-]?secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9_\-\.~+/=]{8,})"#,
    )
    .expect("static credential regex is valid")
});

static BEARER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bearer\s+[a-zA-Z0-9_\-\.~+/=]{8,}").expect("static bearer regex is valid")
});

/// Truncate a string to `max_chars` characters, appending "..." if truncated.
///
/// Counts characters rather than bytes so multi-byte UTF-8 input never
/// splits inside a code point.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Replace bearer tokens and `key=value` style secrets with a redacted marker,
/// keeping the first four characters of the value for context.
pub fn scrub_credentials(input: &str) -> String {
    let scrubbed = BEARER_REGEX.replace_all(input, "Bearer [REDACTED]");
    SENSITIVE_KV_REGEX
        .replace_all(&scrubbed, |caps: &regex::Captures| {
            let key = &caps[1];
            let value = &caps[2];
            let prefix: String = value.chars().take(4).collect();
            format!("{key}={prefix}*[REDACTED]")
        })
        .into_owned()
}

/// Mask a secret for display: `abcd…` for long values, `****` otherwise.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() > 8 {
        let prefix: String = secret.chars().take(4).collect();
        format!("{prefix}…")
    } else {
        "****".to_string()
    }
}
