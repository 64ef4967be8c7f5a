//! Environment-variable parsing used by configuration loaders.

use std::{env, path::PathBuf, time::Duration};

/// Reads a positive millisecond count from `key`.
///
/// Missing, unparsable, or zero values yield `None` so callers can fall back
/// to their default.
pub fn parse_duration_millis_from_environment(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
}

/// Reads a non-empty path from `key`.
pub fn parse_path_from_environment(key: &str) -> Option<PathBuf> {
    let value = env::var_os(key)?;
    if value.is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}
