//! Binary entrypoint: read log lines from a file (or stdin), write summaries to stdout.
//!
//! Usage:
//!   log-compactor [--window SECS] [--threshold N] [--config FILE] [--stats] [PATH|-]
//!
//! Summary lines go to stdout; diagnostics go to stderr (filter with RUST_LOG).

use std::io::{self, Write};
use std::process;

use log_compactor::{compact_file, compact_reader, CompactionStats, CompactorError, Config};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
  "usage: log-compactor [--window SECS] [--threshold N] [--config FILE] [--stats] [PATH|-]";

#[derive(Debug, Default)]
struct CliArgs {
  window: Option<u64>,
  threshold: Option<u32>,
  config_path: Option<String>,
  input: Option<String>,
  print_stats: bool,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| "log_compactor=info".into()),
    )
    .with_writer(io::stderr)
    .init();

  let args = match parse_args(std::env::args().skip(1)) {
    Ok(a) => a,
    Err(msg) => {
      let _ = writeln!(io::stderr(), "log-compactor: {}\n{}", msg, USAGE);
      process::exit(2);
    }
  };

  if let Err(e) = run(args) {
    let _ = writeln!(io::stderr(), "log-compactor error: {}", e);
    process::exit(1);
  }
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<CliArgs, String> {
  let mut args = CliArgs::default();
  while let Some(arg) = raw.next() {
    match arg.as_str() {
      "--window" | "-w" => {
        let v = raw.next().ok_or("--window needs a value")?;
        args.window = Some(v.parse().map_err(|_| format!("invalid --window: {}", v))?);
      }
      "--threshold" | "-t" => {
        let v = raw.next().ok_or("--threshold needs a value")?;
        args.threshold = Some(v.parse().map_err(|_| format!("invalid --threshold: {}", v))?);
      }
      "--config" | "-c" => {
        args.config_path = Some(raw.next().ok_or("--config needs a value")?);
      }
      "--stats" => args.print_stats = true,
      "-h" | "--help" => {
        println!("{}", USAGE);
        process::exit(0);
      }
      flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
      path => {
        if args.input.is_some() {
          return Err(format!("unexpected extra argument: {}", path));
        }
        args.input = Some(path.to_string());
      }
    }
  }
  Ok(args)
}

fn run(args: CliArgs) -> Result<(), CompactorError> {
  let mut config = match &args.config_path {
    Some(path) => Config::from_json_file(path)?,
    None => Config::default(),
  };
  if let Some(window) = args.window {
    config.dedup_window_seconds = window;
  }
  if let Some(threshold) = args.threshold {
    config.error_threshold = threshold;
  }
  config.validate()?;

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  let stats = match args.input.as_deref() {
    None | Some("-") => {
      let stdin = io::stdin();
      let mut stream = compact_reader(stdin.lock(), config);
      for summary in stream.by_ref() {
        writeln!(out, "{}", summary)?;
      }
      stream.stats()
    }
    Some(path) => {
      let mut stream = compact_file(path, config);
      for summary in stream.by_ref() {
        writeln!(out, "{}", summary)?;
      }
      stream.stats()
    }
  };
  out.flush()?;

  if args.print_stats {
    print_stats(&stats)?;
  }
  Ok(())
}

fn print_stats(stats: &CompactionStats) -> Result<(), CompactorError> {
  let json = serde_json::to_string(stats)?;
  writeln!(io::stderr(), "{}", json)?;
  Ok(())
}
