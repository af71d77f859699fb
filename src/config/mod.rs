//! Application configuration and constants.
//!
//! This module provides:
//! - Default values for every tunable setting
//! - The library [`Config`] and its validation
//! - CLI option parsing ([`Opt`])

mod cli;
mod constants;
mod types;
mod validation;

pub use cli::Opt;
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
pub use validation::{validate_identifier, validate_table_name};
