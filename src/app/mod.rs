//! Application driver: feeds newline-delimited JSON into a flush buffer.

pub mod shutdown;
pub mod statistics;

use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::Config;
use crate::error_handling::{SinkMetric, SinkStats};
use crate::record::Record;
use crate::storage::{Connector, FlushBuffer, SqlxConnector};

pub use statistics::{print_final_statistics, SinkReport};

/// Runs the sink against the database named in `config` until `input` ends
/// or the process is interrupted.
///
/// Configuration is validated before anything else; the database connection
/// is opened by the first flush.
pub async fn run_sink<R>(config: Config, input: R) -> Result<SinkReport>
where
    R: AsyncBufRead + Unpin,
{
    config.validate().context("Invalid configuration")?;
    let connector = SqlxConnector::new(config.connection_url()?)?;
    run_sink_with(config, connector, input).await
}

/// Same as [`run_sink`] with a caller-supplied connector.
pub async fn run_sink_with<C, R>(config: Config, connector: C, input: R) -> Result<SinkReport>
where
    C: Connector,
    R: AsyncBufRead + Unpin,
{
    let start = Instant::now();
    let buffer = FlushBuffer::start(&config, connector).context("Failed to start flush buffer")?;
    let stats = buffer.stats();

    let ingest_result = tokio::select! {
        result = ingest(&buffer, input, &stats) => result,
        _ = shutdown::wait_for_interrupt() => Ok(()),
    };
    if let Err(e) = &ingest_result {
        error!("Input stopped early: {:#}", e);
    }

    // Shut down even when ingest failed so buffered records still get written.
    buffer
        .shutdown()
        .await
        .context("Failed to shut down flush buffer")?;
    ingest_result?;

    let report = SinkReport::from_stats(&stats, start.elapsed().as_secs_f64());
    print_final_statistics(&stats, &report);
    Ok(report)
}

/// Appends every JSON object line of `input`. Blank lines and `#` comments
/// are skipped; malformed lines are logged and counted.
async fn ingest<R>(buffer: &FlushBuffer, input: R, stats: &SinkStats) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Record::parse_line(line) {
            Ok(record) => buffer.append(&record)?,
            Err(e) => {
                stats.increment(SinkMetric::InvalidInput);
                warn!("Skipping input line {}: {}", line_number, e);
            }
        }
    }
    Ok(())
}
