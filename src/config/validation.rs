//! Configuration validation.
//!
//! Everything here runs before the sink starts; any failure is a
//! [`ConfigurationError`] and the sink refuses to start.

use std::collections::HashSet;

use url::Url;

use crate::config::constants::{MAX_BUFFERED_RECORDS, MAX_FLUSH_SIZE, MAX_IDENTIFIER_LEN};
use crate::config::types::Config;
use crate::error_handling::ConfigurationError;
use crate::storage::Dialect;

/// Validates one SQL identifier segment.
///
/// Must be non-empty, at most 64 characters, start with an ASCII letter or
/// underscore, and contain only ASCII alphanumerics and underscores.
pub fn validate_identifier(name: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidIdentifier {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("identifier cannot be empty".into()));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(format!(
            "too long: {} chars (max {})",
            name.len(),
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(invalid("must start with a letter or underscore".into())),
    }
    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(invalid(format!("contains invalid character '{}'", c)));
    }
    Ok(())
}

/// Validates a table name, allowing one `schema.` qualifier.
pub fn validate_table_name(name: &str) -> Result<(), ConfigurationError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(ConfigurationError::InvalidIdentifier {
            name: name.to_string(),
            reason: "at most one schema qualifier is allowed".into(),
        });
    }
    segments.into_iter().try_for_each(validate_identifier)
}

impl Config {
    /// Checks every setting. Performs no network I/O.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.table_name.is_empty() {
            return Err(ConfigurationError::Missing("table_name"));
        }
        validate_table_name(&self.table_name)?;

        if self.column_map.is_empty() {
            return Err(ConfigurationError::EmptyColumnMap);
        }
        let mut seen = HashSet::new();
        for (column, field) in self.column_map.iter() {
            validate_identifier(column)?;
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(ConfigurationError::DuplicateColumn(column.to_string()));
            }
            if field.is_empty() {
                return Err(ConfigurationError::InvalidValue {
                    setting: "column_map",
                    reason: format!("column '{}' has an empty source field", column),
                });
            }
        }

        if self.flush_size == 0 {
            return Err(ConfigurationError::InvalidValue {
                setting: "flush_size",
                reason: "must be a positive integer".into(),
            });
        }
        if self.flush_size > MAX_FLUSH_SIZE {
            return Err(ConfigurationError::InvalidValue {
                setting: "flush_size",
                reason: format!("must be at most {}, got {}", MAX_FLUSH_SIZE, self.flush_size),
            });
        }
        if self.idle_flush_time.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                setting: "idle_flush_time",
                reason: "must be a positive number of seconds".into(),
            });
        }
        if self.max_buffered_records > MAX_BUFFERED_RECORDS {
            return Err(ConfigurationError::InvalidValue {
                setting: "max_buffered_records",
                reason: format!(
                    "must be at most {}, got {}",
                    MAX_BUFFERED_RECORDS, self.max_buffered_records
                ),
            });
        }
        if self.max_buffered_records < self.flush_size {
            return Err(ConfigurationError::InvalidValue {
                setting: "max_buffered_records",
                reason: format!(
                    "must be at least flush_size ({}), got {}",
                    self.flush_size, self.max_buffered_records
                ),
            });
        }

        self.connection_url().map(|_| ())
    }

    /// Resolves the URL the connector should open.
    ///
    /// Credentials from `username`/`password` replace any embedded in the
    /// connection string. For MySQL, `tls` sets `ssl-mode` unless the
    /// connection string already does.
    pub fn connection_url(&self) -> Result<String, ConfigurationError> {
        let raw = match &self.connection_string {
            Some(s) if !s.trim().is_empty() => {
                let s = s.trim();
                s.strip_prefix("jdbc:").unwrap_or(s).to_string()
            }
            _ => {
                let database = self
                    .database
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .ok_or(ConfigurationError::Missing(
                        "connection_string or database",
                    ))?;
                if self.host.is_empty() {
                    return Err(ConfigurationError::Missing("host"));
                }
                format!("mysql://{}:{}/{}", self.host, self.port, database)
            }
        };

        let dialect = Dialect::from_url(&raw)?;
        if dialect == Dialect::Sqlite {
            return Ok(raw);
        }

        let mut url =
            Url::parse(&raw).map_err(|e| ConfigurationError::InvalidConnectionString(e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigurationError::InvalidConnectionString(
                "connection string has no host".into(),
            ));
        }
        if let Some(username) = &self.username {
            url.set_username(username).map_err(|_| {
                ConfigurationError::InvalidConnectionString("cannot set username".into())
            })?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|_| {
                ConfigurationError::InvalidConnectionString("cannot set password".into())
            })?;
        }

        let has_ssl_mode = url
            .query_pairs()
            .any(|(k, _)| k.eq_ignore_ascii_case("ssl-mode") || k.eq_ignore_ascii_case("sslmode"));
        if !has_ssl_mode {
            let mode = if self.tls { "required" } else { "disabled" };
            url.query_pairs_mut().append_pair("ssl-mode", mode);
        }

        Ok(url.to_string())
    }
}
