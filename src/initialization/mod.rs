//! Application initialization.
//!
//! Sets up process-wide resources before the sink starts. Currently that is
//! only the logger; database connections are opened lazily by the flush
//! executor.

mod logger;

// Re-export public API
pub use logger::init_logger_with;
