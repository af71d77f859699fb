//! Database connection management.
//!
//! The flush executor owns exactly one [`Connector`]. It opens the connection
//! lazily on the first flush, and again whenever [`Connector::is_usable`]
//! reports the previous one lost. Nothing on the append path touches it.

use async_trait::async_trait;
use log::{debug, info, warn};
use sqlx::any::install_default_drivers;
use sqlx::AnyConnection;
use sqlx::{Any, Connection};

use crate::error_handling::{ConnectionError, ExecutionError, FlushError};
use crate::record::Value;
use crate::storage::encoder::{BatchStatement, Dialect};

/// A single logical database handle, driven by the flush executor.
#[async_trait]
pub trait Connector: Send + 'static {
    /// SQL dialect statements must be encoded in.
    fn dialect(&self) -> Dialect;

    /// Whether an open, healthy connection is available.
    fn is_usable(&self) -> bool;

    /// Opens (or reopens) the connection, dropping any previous one.
    async fn open(&mut self) -> Result<(), ConnectionError>;

    /// Round-trips to the server on an open connection. On error the
    /// connector is no longer usable.
    async fn ping(&mut self) -> Result<(), ConnectionError>;

    /// Executes one statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &BatchStatement) -> Result<u64, FlushError>;

    /// Closes the connection if open.
    async fn close(&mut self);
}

/// [`Connector`] backed by a single `sqlx` connection (MySQL or SQLite).
pub struct SqlxConnector {
    url: String,
    dialect: Dialect,
    conn: Option<AnyConnection>,
}

impl SqlxConnector {
    /// Creates a connector for `url` without connecting.
    pub fn new(url: impl Into<String>) -> Result<Self, crate::error_handling::ConfigurationError> {
        install_default_drivers();
        let url: String = url.into();
        let url = match url.strip_prefix("jdbc:") {
            Some(stripped) => stripped.to_string(),
            None => url,
        };
        let dialect = Dialect::from_url(&url)?;
        Ok(SqlxConnector {
            url,
            dialect,
            conn: None,
        })
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_usable(&self) -> bool {
        self.conn.is_some()
    }

    async fn open(&mut self) -> Result<(), ConnectionError> {
        if let Some(old) = self.conn.take() {
            // The old connection is already broken; a close error tells us nothing.
            let _ = old.close().await;
        }
        let conn = AnyConnection::connect(&self.url)
            .await
            .map_err(ConnectionError::Open)?;
        info!(
            "Successfully connected to {} ({})",
            redact_url(&self.url),
            self.dialect.name()
        );
        self.conn = Some(conn);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), ConnectionError> {
        let conn = self.conn.as_mut().ok_or(ConnectionError::NotOpen)?;
        if let Err(e) = conn.ping().await {
            self.conn = None;
            return Err(ConnectionError::Lost(e));
        }
        Ok(())
    }

    async fn execute(&mut self, statement: &BatchStatement) -> Result<u64, FlushError> {
        let conn = self.conn.as_mut().ok_or(ConnectionError::NotOpen)?;

        let mut query = sqlx::query::<Any>(&statement.sql);
        for value in &statement.params {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::Integer(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.clone()),
            };
        }

        match query.execute(&mut *conn).await {
            Ok(result) => Ok(result.rows_affected()),
            Err(e) if is_connection_error(&e) => {
                warn!("Connection lost during execute, will reconnect on next flush");
                self.conn = None;
                Err(ConnectionError::Lost(e).into())
            }
            Err(e) => Err(ExecutionError::Statement(e).into()),
        }
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close().await {
                Ok(()) => debug!("Connection closed"),
                Err(e) => warn!("Error closing connection: {}", e),
            }
        }
    }
}

/// Errors after which the connection cannot be trusted for another statement.
fn is_connection_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Removes the password from a connection URL for logging.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}
