// Checked access to untyped `call_tool` arguments

use sast_sca_core::{ScanError, ScanResult};
use serde_json::{Map, Value};
use std::time::Duration;

/// Per-call argument map, as sent in `call_tool` params.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// A required, non-empty string.
    pub fn require_str(&self, key: &str) -> ScanResult<&str> {
        match self.0.get(key) {
            None => Err(ScanError::invalid_argument(format!(
                "missing required argument {:?}",
                key
            ))),
            Some(Value::String(s)) if !s.is_empty() => Ok(s),
            Some(_) => Err(ScanError::invalid_argument(format!(
                "argument {:?} must be a non-empty string",
                key
            ))),
        }
    }

    /// An optional string; anything that is not a non-empty string yields
    /// `default`.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => default,
        }
    }

    /// An optional positive number of seconds. Zero, negative, non-numeric
    /// and absent values all fall back to `default` without an error, as do
    /// values too small to survive as a nanosecond count.
    pub fn positive_seconds_or(&self, key: &str, default: Duration) -> Duration {
        self.0
            .get(key)
            .and_then(Value::as_f64)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|duration| !duration.is_zero())
            .unwrap_or(default)
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}
