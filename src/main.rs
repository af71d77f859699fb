//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `batch_sql_sink` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Opening the input (stdin or a file)
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};

use batch_sql_sink::initialization::init_logger_with;
use batch_sql_sink::{run_sink, Config, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let input_path = opt.input.clone();
    let config = Config::from(opt);

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = if input_path.as_os_str() == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(&input_path)
            .await
            .with_context(|| format!("Failed to open input file {}", input_path.display()))?;
        Box::new(BufReader::new(file))
    };

    match run_sink(config, input).await {
        Ok(report) => {
            println!(
                "Wrote {} of {} record{} ({} lost, {} invalid lines) in {:.1}s",
                report.flushed,
                report.received,
                if report.received == 1 { "" } else { "s" },
                report.lost(),
                report.invalid,
                report.elapsed_seconds
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("batch_sql_sink error: {:#}", e);
            process::exit(1);
        }
    }
}
