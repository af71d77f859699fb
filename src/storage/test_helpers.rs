//! Shared test helpers for storage module tests.
//!
//! Provides a [`Connector`] that records everything it is asked to do and can
//! be told to fail or to hold `execute` until the test releases it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error_handling::{ConnectionError, ExecutionError, FlushError};
use crate::mapping::ColumnMap;
use crate::record::Value;
use crate::storage::connection::Connector;
use crate::storage::encoder::{BatchStatement, Dialect};

/// Something the connector was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    OpenFailed,
    PingFailed,
    Execute(Vec<Value>),
    ExecuteFailed(usize),
    Close,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    started: usize,
    fail_opens: usize,
    fail_executes: usize,
    drop_connection: bool,
}

/// Shared view of a [`RecordingConnector`], kept by the test after the
/// connector itself moves into the executor.
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<State>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Parameters of each successful execute, in order.
    pub fn flushes(&self) -> Vec<Vec<Value>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Execute(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    /// Executes that have begun, including ones still held at the gate.
    pub fn started(&self) -> usize {
        self.state.lock().unwrap().started
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    pub fn fail_next_opens(&self, n: usize) {
        self.state.lock().unwrap().fail_opens = n;
    }

    pub fn fail_next_executes(&self, n: usize) {
        self.state.lock().unwrap().fail_executes = n;
    }

    /// The server silently drops the open connection; the next ping fails.
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().drop_connection = true;
    }
}

pub struct RecordingConnector {
    recorder: Recorder,
    gate: Option<Arc<Semaphore>>,
    open: bool,
}

impl RecordingConnector {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        (
            RecordingConnector {
                recorder: recorder.clone(),
                gate: None,
                open: false,
            },
            recorder,
        )
    }

    /// Every execute waits for one permit from `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> (Self, Recorder) {
        let (mut connector, recorder) = Self::new();
        connector.gate = Some(gate);
        (connector, recorder)
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn is_usable(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), ConnectionError> {
        let mut state = self.recorder.state.lock().unwrap();
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            state.events.push(Event::OpenFailed);
            return Err(ConnectionError::Open(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }
        state.events.push(Event::Open);
        self.open = true;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), ConnectionError> {
        if !self.open {
            return Err(ConnectionError::NotOpen);
        }
        let mut state = self.recorder.state.lock().unwrap();
        if std::mem::take(&mut state.drop_connection) {
            state.events.push(Event::PingFailed);
            self.open = false;
            return Err(ConnectionError::Lost(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "server closed the connection",
            ))));
        }
        Ok(())
    }

    async fn execute(&mut self, statement: &BatchStatement) -> Result<u64, FlushError> {
        if !self.open {
            return Err(ConnectionError::NotOpen.into());
        }
        self.recorder.state.lock().unwrap().started += 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let mut state = self.recorder.state.lock().unwrap();
        if state.fail_executes > 0 {
            state.fail_executes -= 1;
            state.events.push(Event::ExecuteFailed(statement.rows));
            return Err(ExecutionError::Statement(sqlx::Error::Protocol(
                "Duplicate entry for key 'PRIMARY'".into(),
            ))
            .into());
        }
        state.events.push(Event::Execute(statement.params.clone()));
        Ok(statement.rows as u64)
    }

    async fn close(&mut self) {
        self.open = false;
        self.recorder.state.lock().unwrap().events.push(Event::Close);
    }
}

/// A valid config with a single `message` column.
pub fn test_config(flush_size: usize, idle_flush_time: Duration) -> Config {
    Config {
        connection_string: Some("mysql://localhost:3306/test".into()),
        table_name: "events".into(),
        column_map: [("message", "message")].into_iter().collect::<ColumnMap>(),
        flush_size,
        idle_flush_time,
        ..Default::default()
    }
}

/// Polls `condition` every 5ms until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
