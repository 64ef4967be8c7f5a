//! Small helpers shared by the Spindle engine and host.

mod async_runtime;
mod environment;

pub use async_runtime::block_on_future;
pub use environment::{parse_duration_millis_from_environment, parse_path_from_environment};

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept by [`truncate_for_display`].
pub const DISPLAY_VALUE_LIMIT: usize = 256;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*)([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)\s*[=:]\s*)([^\s,;]+)",
        r"(?i)((?:AccountKey|SharedAccessSignature|sig)=)([^\s;&]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// The descriptive prefix (for example `AccountKey=`) is kept so the text
/// still reads naturally in diagnostics.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

/// Shortens `input` to at most [`DISPLAY_VALUE_LIMIT`] characters, marking the cut.
pub fn truncate_for_display(input: &str) -> String {
    if input.chars().count() <= DISPLAY_VALUE_LIMIT {
        return input.to_string();
    }
    let mut shortened: String = input.chars().take(DISPLAY_VALUE_LIMIT).collect();
    shortened.push_str("...");
    shortened
}
