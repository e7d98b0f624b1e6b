// src/config/duration.rs

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m)?\s*$").expect("duration regex is valid")
});

/// Parse a duration string like `"500ms"`, `"2s"` or `"1m"`.
///
/// A bare number is taken as milliseconds, matching how debounce delays are
/// usually written.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let caps = DURATION_RE
        .captures(s)
        .ok_or_else(|| format!("invalid duration '{s}'; expected e.g. \"500ms\", \"2s\" or \"1m\""))?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", &caps[1], e))?;

    match caps.get(2).map(|m| m.as_str()) {
        None | Some("ms") => Ok(Duration::from_millis(value)),
        Some("s") => Ok(Duration::from_secs(value)),
        Some("m") => Ok(Duration::from_secs(value * 60)),
        Some(other) => Err(format!("unsupported duration unit '{other}'")),
    }
}
