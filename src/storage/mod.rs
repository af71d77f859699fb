// storage/mod.rs
// Batched SQL write path

pub mod buffer;
pub mod connection;
pub mod encoder;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use buffer::{FlushBuffer, FlushReason, FlushResult};
pub use connection::{Connector, SqlxConnector};
pub use encoder::{encode, BatchEncoder, BatchStatement, Dialect};
