//! Command-line options.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::constants::{
    DEFAULT_FLUSH_SIZE, DEFAULT_HOST, DEFAULT_MAX_BUFFERED_RECORDS, DEFAULT_MYSQL_PORT,
};
use crate::config::types::{Config, LogFormat, LogLevel};
use crate::mapping::{ColumnMap, ColumnSpec};

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("'{}' must be a positive number of seconds", s));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Command-line options and configuration.
///
/// # Examples
///
/// ```bash
/// # Ship JSON lines from stdin into MySQL
/// tail -F app.log | batch_sql_sink \
///     --connection-string mysql://db:3306/logs --username logger \
///     --table events --column message --column host=hostname
///
/// # Local SQLite target, bigger batches, skip duplicates
/// batch_sql_sink --input events.jsonl --connection-string 'sqlite://events.db?mode=rwc' \
///     --table events --column id --column message --flush-size 500 --insert-ignore
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "batch_sql_sink",
    about = "Buffers newline-delimited JSON records and writes them with batched INSERTs."
)]
pub struct Opt {
    /// Input file of JSON records, one per line ("-" for stdin)
    #[arg(long, value_parser, default_value = "-")]
    pub input: PathBuf,

    /// Full connection URL (mysql://, mariadb://, sqlite:; jdbc: prefix allowed)
    #[arg(long, env = "SINK_CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Database host, used when no connection string is given
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Database port, used when no connection string is given
    #[arg(long, default_value_t = DEFAULT_MYSQL_PORT)]
    pub port: u16,

    /// Database name, used when no connection string is given
    #[arg(long)]
    pub database: Option<String>,

    /// Database username
    #[arg(long, env = "SINK_USERNAME")]
    pub username: Option<String>,

    /// Database password
    #[arg(long, env = "SINK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Destination table (optionally schema.table)
    #[arg(long = "table")]
    pub table_name: String,

    /// Column mapping as column=field (repeatable, order is insert order)
    #[arg(long = "column", value_name = "COLUMN[=FIELD]")]
    pub columns: Vec<ColumnSpec>,

    /// Records per batch before flushing
    #[arg(long, default_value_t = DEFAULT_FLUSH_SIZE)]
    pub flush_size: usize,

    /// Seconds since the last flush before pending records are flushed
    #[arg(long, default_value = "1", value_parser = parse_seconds)]
    pub idle_flush_time: Duration,

    /// Use INSERT IGNORE to skip rows that violate unique constraints
    #[arg(long)]
    pub insert_ignore: bool,

    /// Do not require TLS for MySQL connections
    #[arg(long)]
    pub no_tls: bool,

    /// Pending records kept in memory before the oldest are evicted
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFERED_RECORDS)]
    pub max_buffered_records: usize,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Config {
            connection_string: opt.connection_string,
            host: opt.host,
            port: opt.port,
            database: opt.database,
            username: opt.username,
            password: opt.password,
            table_name: opt.table_name,
            column_map: opt
                .columns
                .into_iter()
                .map(|spec| (spec.column, spec.field))
                .collect::<ColumnMap>(),
            flush_size: opt.flush_size,
            idle_flush_time: opt.idle_flush_time,
            insert_ignore: opt.insert_ignore,
            tls: !opt.no_tls,
            max_buffered_records: opt.max_buffered_records,
            log_level: opt.log_level,
            log_format: opt.log_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-3").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_opt_into_config() {
        let opt = Opt::try_parse_from([
            "batch_sql_sink",
            "--connection-string",
            "mysql://localhost/logs",
            "--table",
            "events",
            "--column",
            "message",
            "--column",
            "host=hostname",
            "--flush-size",
            "50",
            "--idle-flush-time",
            "2.5",
            "--insert-ignore",
            "--no-tls",
        ])
        .unwrap();
        let config = Config::from(opt);

        assert_eq!(config.table_name, "events");
        assert_eq!(
            config.column_map.iter().collect::<Vec<_>>(),
            vec![("message", "message"), ("host", "hostname")]
        );
        assert_eq!(config.flush_size, 50);
        assert_eq!(config.idle_flush_time, Duration::from_millis(2500));
        assert!(config.insert_ignore);
        assert!(!config.tls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_table_is_required() {
        assert!(Opt::try_parse_from(["batch_sql_sink", "--column", "a"]).is_err());
    }
}
