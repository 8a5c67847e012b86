//! Open compaction group: merge rules, escalation, and summary rendering.

use std::fmt;

use crate::types::*;

/// Events merged so far for one level + field set inside the window.
#[derive(Debug, Clone)]
pub struct Group {
  pub start_timestamp: Timestamp,
  pub end_timestamp: Timestamp,
  pub level: Level,
  pub fields: Fields,
  pub count: u64,
  pub is_escalated: bool,
}

impl Group {
  /// Seed a group from its first event. With `error_threshold <= 1` a single
  /// ERROR already counts as repeated and opens as CRITICAL.
  pub fn open(event: Event, error_threshold: u32) -> Self {
    let mut group = Self {
      start_timestamp: event.timestamp,
      end_timestamp: event.timestamp,
      level: event.level,
      fields: event.fields,
      count: 1,
      is_escalated: false,
    };
    if group.level == Level::Error && error_threshold <= 1 {
      group.escalate();
    }
    group
  }

  /// Whether `event` may merge into this group.
  ///
  /// Events past `start_timestamp + window_seconds` never merge; the boundary
  /// itself still does. A CRITICAL group keeps absorbing ERROR repeats.
  pub fn is_compatible(&self, event: &Event, window_seconds: u64) -> bool {
    if self.is_outside_window(&event.timestamp, window_seconds) {
      return false;
    }
    if self.level == Level::Critical && event.level == Level::Error {
      return self.fields == event.fields;
    }
    self.level == event.level && self.fields == event.fields
  }

  pub fn is_outside_window(&self, ts: &Timestamp, window_seconds: u64) -> bool {
    ts.since(&self.start_timestamp) > window_duration(window_seconds)
  }

  /// Merge `event`. Returns true when this update escalated the group.
  pub fn update(&mut self, event: &Event, error_threshold: u32) -> bool {
    self.end_timestamp = event.timestamp;
    self.count += 1;

    if self.level == Level::Error && self.count >= u64::from(error_threshold) {
      self.escalate();
      return true;
    }
    false
  }

  fn escalate(&mut self) {
    self.level = Level::Critical;
    self.is_escalated = true;
  }

  /// `<range> <LEVEL> <k=v sorted by key>[ (xN)]`
  pub fn format_summary(&self) -> String {
    let fields = self
      .fields
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join(" ");
    let count = if self.count > 1 {
      format!(" (x{})", self.count)
    } else {
      String::new()
    };
    format!("{} {} {}{}", self.timestamp_range(), self.level, fields, count)
  }

  fn timestamp_range(&self) -> String {
    let start = self.start_timestamp.to_iso();
    if self.start_timestamp.same_instant(&self.end_timestamp) {
      return start;
    }
    let end = if self.start_timestamp.date() == self.end_timestamp.date() {
      self.end_timestamp.time_only()
    } else {
      self.end_timestamp.to_iso()
    };
    format!("{}~{}", start, end)
  }
}

impl fmt::Display for Group {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.format_summary())
  }
}
