//! jobsh CLI entry point.
//!
//! Usage:
//!   jobsh                      # Interactive REPL, fib offloaded to worker processes
//!   jobsh --threads            # Offload fib to the in-process thread pool
//!   jobsh --worker             # Internal: serve one unit over stdin/stdout

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use jobsh_kernel::{KernelConfig, OffloadMode};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Logs go to stderr: stdout carries worker replies
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum Mode {
    Repl(KernelConfig),
    Worker,
    Help,
    Version,
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    match parse_args(&args)? {
        Mode::Repl(config) => jobsh_repl::run(config),
        Mode::Worker => jobsh_repl::run_worker(),
        Mode::Help => {
            print_help();
            Ok(())
        }
        Mode::Version => {
            println!("jobsh {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_args(args: &[String]) -> Result<Mode> {
    let mut config = KernelConfig::default();

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Mode::Help),
            "--version" | "-V" => return Ok(Mode::Version),
            "--worker" => return Ok(Mode::Worker),
            "--threads" => config.offload = OffloadMode::Threads,
            "--processes" => config.offload = OffloadMode::Processes,
            _ => {
                if let Some(size) = arg.strip_prefix("--pool-size=") {
                    let size: usize = size
                        .parse()
                        .with_context(|| format!("--pool-size expects a number, got {size:?}"))?;
                    config = config.with_pool_size(size);
                } else if let Some(url) = arg.strip_prefix("--catalog=") {
                    config = config.with_catalog_url(url);
                } else {
                    bail!("unknown argument: {arg}\nRun 'jobsh --help' for usage.");
                }
            }
        }
    }

    Ok(Mode::Repl(config))
}

fn print_help() {
    println!(
        r#"jobsh v{}

Usage:
  jobsh [OPTIONS]              Interactive REPL

Options:
  --threads                    Offload fib to the in-process thread pool
  --processes                  Offload fib to worker processes (default)
  --pool-size=<N>              Bound concurrently running offloaded units (default: 5)
  --catalog=<URL>              Catalog base URL (default: {})
  --worker                     Internal: run as a worker process
  -h, --help                   Show this help
  -V, --version                Show version

Logging goes to stderr and is controlled by RUST_LOG (default: warn).
"#,
        env!("CARGO_PKG_VERSION"),
        jobsh_kernel::units::DEFAULT_CATALOG_URL,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_process_repl() {
        let Mode::Repl(config) = parse_args(&[]).expect("ok") else {
            panic!("expected repl mode");
        };
        assert_eq!(config.offload, OffloadMode::Processes);
        assert_eq!(config.pool_size, 5);
    }

    #[test]
    fn options_apply() {
        let Mode::Repl(config) =
            parse_args(&args(&["--threads", "--pool-size=2", "--catalog=http://x"])).expect("ok")
        else {
            panic!("expected repl mode");
        };
        assert_eq!(config.offload, OffloadMode::Threads);
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.catalog_url, "http://x");
    }

    #[test]
    fn worker_flag_wins() {
        assert!(matches!(
            parse_args(&args(&["--threads", "--worker"])).expect("ok"),
            Mode::Worker
        ));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["--pool-size=many"])).is_err());
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }
}
