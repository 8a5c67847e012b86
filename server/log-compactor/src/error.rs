//! Structured error types for the log compactor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompactorError {
  #[error("malformed line: {0}")]
  MalformedLine(String),

  #[error("field conflict: user={user}, user_id={user_id}")]
  FieldConflict { user: String, user_id: String },

  #[error("config: {field}: {reason}")]
  Config { field: String, reason: String },

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl CompactorError {
  pub fn malformed(msg: impl Into<String>) -> Self {
    Self::MalformedLine(msg.into())
  }

  pub fn config(field: &str, reason: &str) -> Self {
    Self::Config {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn malformed_message_carries_detail() {
    let err = CompactorError::malformed("line too short: x");
    assert_eq!(err.to_string(), "malformed line: line too short: x");
  }

  #[test]
  fn conflict_message_names_both_values() {
    let err = CompactorError::FieldConflict {
      user: "alice".into(),
      user_id: "bob".into(),
    };
    assert_eq!(err.to_string(), "field conflict: user=alice, user_id=bob");
  }
}
