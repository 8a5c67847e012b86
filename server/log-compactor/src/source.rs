//! Line sources: files and readers feeding the engine.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::config::Config;
use crate::engine::{Compaction, Engine};

/// Boxed line iterator, as produced by [`open_lines`].
pub type LineSource = Box<dyn Iterator<Item = io::Result<String>>>;

/// Open `path` for line-by-line reading. A file that cannot be opened is
/// logged and treated as empty input.
pub fn open_lines(path: &Path) -> LineSource {
  match File::open(path) {
    Ok(file) => Box::new(BufReader::new(file).lines()),
    Err(e) => {
      tracing::error!(path = %path.display(), error = %e, "cannot open input");
      Box::new(std::iter::empty())
    }
  }
}

/// Compact the log file at `path`. A missing file yields no summaries.
pub fn compact_file(path: impl AsRef<Path>, config: Config) -> Compaction<LineSource> {
  let path = path.as_ref();
  tracing::info!(path = %path.display(), "starting log compaction");
  Engine::new(config).process(open_lines(path))
}

/// Compact lines from any buffered reader (stdin, in-memory buffers).
pub fn compact_reader<R: BufRead>(reader: R, config: Config) -> Compaction<io::Lines<R>> {
  Engine::new(config).process(reader.lines())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn missing_file_yields_nothing() {
    let out: Vec<String> =
      compact_file("/definitely/not/here/app.log", Config::default()).collect();
    assert!(out.is_empty());
  }

  #[test]
  fn reader_handles_crlf_lines() {
    let input = "2024-01-01T10:00:00 INFO a=1\r\n2024-01-01T10:00:02 INFO a=1\r\n";
    let out: Vec<String> = compact_reader(Cursor::new(input), Config::default()).collect();
    assert_eq!(out, vec!["2024-01-01T10:00:00~10:00:02 INFO a=1 (x2)".to_string()]);
  }
}
