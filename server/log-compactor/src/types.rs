//! Core types for the log compactor (parsed events + shared value types).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::config::MAX_WINDOW_SECONDS;

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// ISO-8601 date-time as written in the log line: wall-clock time plus an
/// optional UTC offset. Naive and offset-aware inputs both round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
  local: NaiveDateTime,
  offset: Option<FixedOffset>,
}

const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

impl Timestamp {
  pub fn naive(local: NaiveDateTime) -> Self {
    Self { local, offset: None }
  }

  pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
    Self {
      local,
      offset: Some(offset),
    }
  }

  /// Parse an ISO-8601 date-time. Accepts seconds with optional fraction,
  /// minute precision, or a bare date (midnight), each optionally followed
  /// by `Z` or `+HH:MM`/`-HH:MM`. Leap seconds (`:60`) are rejected.
  pub fn parse(raw: &str) -> Option<Self> {
    let normalized = match raw.strip_suffix('Z') {
      Some(rest) => format!("{}+00:00", rest),
      None => raw.to_string(),
    };
    Self::parse_normalized(&normalized).filter(|t| t.local.nanosecond() < 1_000_000_000)
  }

  fn parse_normalized(raw: &str) -> Option<Self> {
    for fmt in AWARE_FORMATS {
      if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
        return Some(Self::with_offset(dt.naive_local(), *dt.offset()));
      }
    }
    for fmt in NAIVE_FORMATS {
      if let Ok(local) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(Self::naive(local));
      }
    }

    // Bare date with an offset: `YYYY-MM-DD+HH:MM`.
    if let Some((date, offset)) = raw.split_at_checked(10) {
      if offset.starts_with(['+', '-']) {
        let midnight = format!("{}T00:00:00{}", date, offset);
        return DateTime::parse_from_str(&midnight, "%Y-%m-%dT%H:%M:%S%:z")
          .ok()
          .map(|dt| Self::with_offset(dt.naive_local(), *dt.offset()));
      }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
      .ok()
      .and_then(|d| d.and_hms_opt(0, 0, 0))
      .map(Self::naive)
  }

  pub fn date(&self) -> NaiveDate {
    self.local.date()
  }

  /// Elapsed time since `earlier`. Compares absolute instants when both sides
  /// carry an offset, wall-clock time otherwise.
  pub fn since(&self, earlier: &Timestamp) -> Duration {
    match (self.offset, earlier.offset) {
      (Some(a), Some(b)) => {
        let shift = Duration::seconds(i64::from(a.local_minus_utc() - b.local_minus_utc()));
        (self.local - earlier.local) - shift
      }
      _ => self.local - earlier.local,
    }
  }

  /// Same point in time. Offset-aware stamps compare as instants; a naive
  /// stamp never equals an aware one.
  pub fn same_instant(&self, other: &Timestamp) -> bool {
    match (self.offset, other.offset) {
      (Some(_), Some(_)) => self.since(other) == Duration::zero(),
      (None, None) => self.local == other.local,
      _ => false,
    }
  }

  /// Full ISO-8601 rendering: fraction only when non-zero, offset when known.
  pub fn to_iso(&self) -> String {
    let mut out = if self.local.nanosecond() / 1_000 != 0 {
      self.local.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    } else {
      self.local.format("%Y-%m-%dT%H:%M:%S").to_string()
    };
    if let Some(offset) = self.offset {
      out.push_str(&format_offset(offset));
    }
    out
  }

  /// `HH:MM:SS` of the wall-clock time.
  pub fn time_only(&self) -> String {
    self.local.format("%H:%M:%S").to_string()
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_iso())
  }
}

fn format_offset(offset: FixedOffset) -> String {
  let total = offset.local_minus_utc();
  let sign = if total < 0 { '-' } else { '+' };
  let abs = total.unsigned_abs();
  format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// Window width as a chrono duration, capped at [`MAX_WINDOW_SECONDS`].
pub fn window_duration(seconds: u64) -> Duration {
  Duration::seconds(seconds.min(MAX_WINDOW_SECONDS) as i64)
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Severity token. Known levels get a variant; any other uppercase token is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
  Debug,
  Info,
  Warning,
  Error,
  Critical,
  Other(String),
}

impl Level {
  /// Map an (already validated) uppercase token to a level.
  pub fn from_token(token: &str) -> Self {
    match token {
      "DEBUG" => Self::Debug,
      "INFO" => Self::Info,
      "WARNING" => Self::Warning,
      "ERROR" => Self::Error,
      "CRITICAL" => Self::Critical,
      other => Self::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Debug => "DEBUG",
      Self::Info => "INFO",
      Self::Warning => "WARNING",
      Self::Error => "ERROR",
      Self::Critical => "CRITICAL",
      Self::Other(token) => token,
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Normalized `key=value` pairs. Sorted iteration keeps rendering deterministic.
pub type Fields = BTreeMap<String, String>;

/// One parsed, normalized log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  pub timestamp: Timestamp,
  pub level: Level,
  pub fields: Fields,
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A stable hex string identifying a field set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub String);
