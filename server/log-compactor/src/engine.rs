//! Core engine: sliding window of open groups, lazy summary stream.

use std::collections::{HashMap, VecDeque};
use std::io;

use serde::Serialize;

use crate::config::Config;
use crate::fingerprint;
use crate::group::Group;
use crate::parser;
use crate::types::*;

/// The compaction engine. Each `process*` call runs over fresh window state.
#[derive(Debug, Clone)]
pub struct Engine {
  config: Config,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Empty window for push-style callers that feed events themselves.
  pub fn window(&self) -> SlidingWindow {
    SlidingWindow::new(self.config.clone())
  }

  /// Compact a stream of lines as read from a source. Summaries are produced
  /// on demand; input is only pulled once the pending output is drained.
  pub fn process<L>(&self, lines: L) -> Compaction<L::IntoIter>
  where
    L: IntoIterator<Item = io::Result<String>>,
  {
    Compaction::new(lines.into_iter(), self.window())
  }

  /// Same as [`Engine::process`] for in-memory lines that cannot fail to read.
  pub fn process_lines<L, S>(&self, lines: L) -> Compaction<impl Iterator<Item = io::Result<String>>>
  where
    L: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.process(lines.into_iter().map(|l| Ok::<String, io::Error>(l.into())))
  }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters for one compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactionStats {
  pub lines_read: u64,
  pub events: u64,
  pub lines_skipped: u64,
  pub groups_opened: u64,
  pub summaries_emitted: u64,
  pub escalations: u64,
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct OpenGroup {
  id: u64,
  fingerprint: Fingerprint,
  group: Group,
}

/// Open groups in opening order, plus a fingerprint index over them.
///
/// Only groups sharing an event's field set can ever absorb it, so the index
/// narrows the first-match scan to that bucket. Buckets hold group ids in
/// opening order, which keeps the scan's result identical to a full walk.
#[derive(Debug)]
pub struct SlidingWindow {
  config: Config,
  groups: VecDeque<OpenGroup>,
  index: HashMap<Fingerprint, VecDeque<u64>>,
  next_id: u64,
  stats: CompactionStats,
}

impl SlidingWindow {
  pub fn new(config: Config) -> Self {
    Self {
      config,
      groups: VecDeque::new(),
      index: HashMap::new(),
      next_id: 0,
      stats: CompactionStats::default(),
    }
  }

  pub fn stats(&self) -> CompactionStats {
    self.stats
  }

  /// Currently open groups, oldest first.
  pub fn open_groups(&self) -> impl Iterator<Item = &Group> {
    self.groups.iter().map(|g| &g.group)
  }

  /// Parse and absorb one raw line. Unparseable lines are logged and skipped
  /// without touching window state.
  pub fn push_line(&mut self, line_no: u64, line: &str) -> Vec<String> {
    self.stats.lines_read += 1;
    match parser::parse(line) {
      Ok(event) => self.push(event),
      Err(e) => {
        tracing::warn!(line = line_no, error = %e, "skipping line");
        self.stats.lines_skipped += 1;
        Vec::new()
      }
    }
  }

  /// Absorb one event. Returns the summaries of groups it pushed out of the window.
  pub fn push(&mut self, event: Event) -> Vec<String> {
    self.stats.events += 1;
    let window = self.config.dedup_window_seconds;

    // Evict from the head only; groups behind it wait their turn.
    let mut out = Vec::new();
    while self
      .groups
      .front()
      .is_some_and(|head| head.group.is_outside_window(&event.timestamp, window))
    {
      if let Some(summary) = self.pop_oldest() {
        out.push(summary);
      }
    }

    let fp = fingerprint::of_fields(&event.fields);
    if let Some(pos) = self.first_compatible(&fp, &event) {
      let threshold = self.config.error_threshold;
      let open = &mut self.groups[pos];
      if open.group.update(&event, threshold) {
        self.stats.escalations += 1;
        tracing::info!(
          start = %open.group.start_timestamp,
          count = open.group.count,
          "escalated log group to CRITICAL"
        );
      }
      return out;
    }

    self.open(fp, event);
    out
  }

  /// Flush every remaining group, oldest first.
  pub fn finish(&mut self) -> Vec<String> {
    tracing::debug!(open = self.groups.len(), "flushing remaining groups");
    let mut out = Vec::with_capacity(self.groups.len());
    while let Some(summary) = self.pop_oldest() {
      out.push(summary);
    }
    out
  }

  fn first_compatible(&self, fp: &Fingerprint, event: &Event) -> Option<usize> {
    let window = self.config.dedup_window_seconds;
    self.index.get(fp)?.iter().find_map(|id| {
      let pos = self.groups.binary_search_by_key(id, |g| g.id).ok()?;
      self.groups[pos].group.is_compatible(event, window).then_some(pos)
    })
  }

  fn open(&mut self, fp: Fingerprint, event: Event) {
    let group = Group::open(event, self.config.error_threshold);
    if group.is_escalated {
      self.stats.escalations += 1;
      tracing::info!(start = %group.start_timestamp, "opened log group as CRITICAL");
    }

    let id = self.next_id;
    self.next_id += 1;
    self.index.entry(fp.clone()).or_default().push_back(id);
    self.groups.push_back(OpenGroup {
      id,
      fingerprint: fp,
      group,
    });
    self.stats.groups_opened += 1;
  }

  fn pop_oldest(&mut self) -> Option<String> {
    let oldest = self.groups.pop_front()?;
    if let Some(ids) = self.index.get_mut(&oldest.fingerprint) {
      // The oldest group overall is also the oldest in its bucket.
      if ids.front() == Some(&oldest.id) {
        ids.pop_front();
      }
      if ids.is_empty() {
        self.index.remove(&oldest.fingerprint);
      }
    }
    self.stats.summaries_emitted += 1;
    Some(oldest.group.to_string())
  }
}

// ---------------------------------------------------------------------------
// Lazy output stream
// ---------------------------------------------------------------------------

/// Pull-based summary stream over a line source. Dropping it cancels the run.
#[derive(Debug)]
pub struct Compaction<I> {
  lines: I,
  window: SlidingWindow,
  pending: VecDeque<String>,
  line_no: u64,
  done: bool,
}

impl<I> Compaction<I>
where
  I: Iterator<Item = io::Result<String>>,
{
  pub fn new(lines: I, window: SlidingWindow) -> Self {
    Self {
      lines,
      window,
      pending: VecDeque::new(),
      line_no: 0,
      done: false,
    }
  }

  /// Counters so far; final once the iterator returns `None`.
  pub fn stats(&self) -> CompactionStats {
    self.window.stats()
  }

  fn end_of_input(&mut self) {
    self.done = true;
    let flushed = self.window.finish();
    self.pending.extend(flushed);
    tracing::debug!(stats = ?self.window.stats(), "compaction finished");
  }
}

impl<I> Iterator for Compaction<I>
where
  I: Iterator<Item = io::Result<String>>,
{
  type Item = String;

  fn next(&mut self) -> Option<String> {
    loop {
      if let Some(summary) = self.pending.pop_front() {
        return Some(summary);
      }
      if self.done {
        return None;
      }
      match self.lines.next() {
        Some(Ok(line)) => {
          self.line_no += 1;
          let emitted = self.window.push_line(self.line_no, &line);
          self.pending.extend(emitted);
        }
        Some(Err(e)) => {
          tracing::error!(after_line = self.line_no, error = %e, "read error, ending input");
          self.end_of_input();
        }
        None => self.end_of_input(),
      }
    }
  }
}
