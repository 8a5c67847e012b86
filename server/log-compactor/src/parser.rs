//! Parse raw log lines into normalized Event records.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CompactorError;
use crate::types::*;

/// `key=value`, both sides runs of non-whitespace.
static RE_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+)=(\S+)").unwrap());

/// Status codes in this range force the event level to ERROR.
const SERVER_ERROR_CODES: std::ops::Range<i64> = 500..600;

/// Parse one line of the form `<timestamp> <LEVEL> key=value ...`.
pub fn parse(line: &str) -> Result<Event, CompactorError> {
  let trimmed = line.trim();
  let mut parts = trimmed.splitn(3, ' ');
  let (ts_raw, level_raw, fields_raw) = match (parts.next(), parts.next(), parts.next()) {
    (Some(ts), Some(level), Some(fields)) => (ts, level, fields),
    _ => return Err(CompactorError::malformed(format!("line too short: {}", trimmed))),
  };

  let timestamp = Timestamp::parse(ts_raw)
    .ok_or_else(|| CompactorError::malformed(format!("invalid ISO-8601 timestamp: {}", ts_raw)))?;

  if !is_uppercase_token(level_raw) {
    return Err(CompactorError::malformed(format!("level not uppercase: {}", level_raw)));
  }

  let fields = normalize_fields(parse_fields(fields_raw)?)?;
  let level = enrich_level(Level::from_token(level_raw), &fields);

  tracing::debug!(%timestamp, %level, ?fields, "parsed line");
  Ok(Event {
    timestamp,
    level,
    fields,
  })
}

fn is_uppercase_token(token: &str) -> bool {
  !token.is_empty() && token.chars().all(char::is_uppercase)
}

/// Collect every non-overlapping `key=value` pair. Later duplicates win.
fn parse_fields(raw: &str) -> Result<Fields, CompactorError> {
  let fields: Fields = RE_FIELD
    .captures_iter(raw)
    .map(|c| (c[1].to_string(), c[2].to_string()))
    .collect();
  if fields.is_empty() {
    return Err(CompactorError::malformed(format!("no valid fields in: {}", raw)));
  }
  Ok(fields)
}

/// Collapse the `user`/`user_id` alias pair into a single `user` key.
fn normalize_fields(mut fields: Fields) -> Result<Fields, CompactorError> {
  let user = fields.remove("user");
  let user_id = fields.remove("user_id");

  let merged = match (user, user_id) {
    (Some(user), Some(user_id)) if user != user_id => {
      return Err(CompactorError::FieldConflict { user, user_id });
    }
    (Some(user), _) => Some(user),
    (None, user_id) => user_id,
  };
  if let Some(user) = merged {
    fields.insert("user".to_string(), user);
  }
  Ok(fields)
}

/// A 5xx `code` field forces ERROR. Non-numeric codes are ignored.
fn enrich_level(level: Level, fields: &Fields) -> Level {
  let is_server_error = fields
    .get("code")
    .and_then(|c| c.parse::<i64>().ok())
    .is_some_and(|c| SERVER_ERROR_CODES.contains(&c));
  if is_server_error {
    Level::Error
  } else {
    level
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_basic_line() {
    let event = parse("2024-01-01T10:00:00 INFO action=login user=alice").unwrap();
    assert_eq!(event.timestamp.to_iso(), "2024-01-01T10:00:00");
    assert_eq!(event.level, Level::Info);
    assert_eq!(event.fields.get("action").map(String::as_str), Some("login"));
    assert_eq!(event.fields.get("user").map(String::as_str), Some("alice"));
  }

  #[test]
  fn user_id_is_aliased_to_user() {
    let event = parse("2024-01-01T10:00:00 INFO user_id=alice action=login").unwrap();
    assert_eq!(event.fields.get("user").map(String::as_str), Some("alice"));
    assert!(!event.fields.contains_key("user_id"));
  }

  #[test]
  fn equal_user_and_user_id_collapse() {
    let event = parse("2024-01-01T10:00:00 INFO user=alice user_id=alice").unwrap();
    assert_eq!(event.fields.len(), 1);
    assert_eq!(event.fields.get("user").map(String::as_str), Some("alice"));
  }

  #[test]
  fn conflicting_user_fields_rejected() {
    let err = parse("2024-01-01T10:00:00 INFO user=alice user_id=bob").unwrap_err();
    assert!(matches!(err, CompactorError::FieldConflict { .. }));
  }

  #[test]
  fn server_error_code_forces_error_level() {
    let event = parse("2024-01-01T10:00:00 INFO action=retry code=503").unwrap();
    assert_eq!(event.level, Level::Error);
  }

  #[test]
  fn code_outside_range_or_non_numeric_is_ignored() {
    assert_eq!(parse("2024-01-01T10:00:00 INFO code=404").unwrap().level, Level::Info);
    assert_eq!(parse("2024-01-01T10:00:00 INFO code=600").unwrap().level, Level::Info);
    assert_eq!(parse("2024-01-01T10:00:00 WARNING code=5xx").unwrap().level, Level::Warning);
  }

  #[test]
  fn lowercase_or_mixed_level_rejected() {
    assert!(parse("2024-01-01T10:00:00 info action=x").is_err());
    assert!(parse("2024-01-01T10:00:00 Error action=x").is_err());
  }

  #[test]
  fn short_line_rejected() {
    let err = parse("2024-01-01T10:00:00 INFO").unwrap_err();
    assert!(err.to_string().contains("too short"));
    assert!(parse("").is_err());
  }

  #[test]
  fn bad_timestamp_rejected() {
    let err = parse("2024-01-01-NOT-A-DATE INFO user=bob").unwrap_err();
    assert!(err.to_string().contains("timestamp"));
  }

  #[test]
  fn leap_second_timestamp_rejected() {
    let err = parse("2024-01-01T23:59:60 INFO a=1").unwrap_err();
    assert!(matches!(err, CompactorError::MalformedLine(_)));
  }

  #[test]
  fn line_without_pairs_rejected() {
    let err = parse("2024-01-01T10:00:00 INFO just some words").unwrap_err();
    assert!(err.to_string().contains("no valid fields"));
  }

  #[test]
  fn last_duplicate_key_wins() {
    let event = parse("2024-01-01T10:00:00 INFO a=1 a=2").unwrap();
    assert_eq!(event.fields.get("a").map(String::as_str), Some("2"));
  }

  #[test]
  fn double_space_after_timestamp_is_malformed() {
    assert!(parse("2024-01-01T10:00:00  INFO a=1").is_err());
  }
}
