//! Compactor configuration with sane defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CompactorError;

/// Widest accepted window. chrono durations overflow far beyond this, and no
/// realistic log stream needs more.
pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Tunable window and escalation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Seconds after a group's first event during which matching events merge into it.
  pub dedup_window_seconds: u64,
  /// Repeat count at which an ERROR group escalates to CRITICAL (<= 1: on first occurrence).
  pub error_threshold: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      dedup_window_seconds: 10,
      error_threshold: 2,
    }
  }
}

impl Config {
  pub fn new(dedup_window_seconds: u64, error_threshold: u32) -> Self {
    Self {
      dedup_window_seconds,
      error_threshold,
    }
  }

  pub fn validate(&self) -> Result<(), CompactorError> {
    if self.dedup_window_seconds > MAX_WINDOW_SECONDS {
      return Err(CompactorError::config(
        "dedup_window_seconds",
        &format!("must be at most {}", MAX_WINDOW_SECONDS),
      ));
    }
    Ok(())
  }

  /// Parse a JSON config document. Missing keys fall back to defaults.
  pub fn from_json_str(raw: &str) -> Result<Self, CompactorError> {
    let config: Config = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CompactorError> {
    let raw = std::fs::read_to_string(path)?;
    Self::from_json_str(&raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_reference_invocation() {
    let config = Config::default();
    assert_eq!(config.dedup_window_seconds, 10);
    assert_eq!(config.error_threshold, 2);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn partial_json_keeps_defaults() {
    let config = Config::from_json_str(r#"{"error_threshold": 5}"#).unwrap();
    assert_eq!(config.error_threshold, 5);
    assert_eq!(config.dedup_window_seconds, 10);
  }

  #[test]
  fn oversized_window_rejected() {
    let err = Config::from_json_str(r#"{"dedup_window_seconds": 99999999999}"#).unwrap_err();
    assert!(err.to_string().contains("dedup_window_seconds"));
  }

  #[test]
  fn zero_threshold_is_valid() {
    assert!(Config::new(0, 0).validate().is_ok());
  }

  #[test]
  fn invalid_json_is_reported() {
    let err = Config::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, CompactorError::Json(_)));
  }
}
