//! Column mapping: projects records into the configured column order.

use std::str::FromStr;
use std::sync::Arc;

use crate::error_handling::{ConfigurationError, SinkMetric, SinkStats};
use crate::record::{Record, Value};

/// Ordered mapping from destination column to source field.
///
/// Column order is fixed for the lifetime of the sink and decides both the
/// `INSERT INTO (...)` column list and the value order of every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    entries: Vec<(String, String)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        ColumnMap::default()
    }

    /// Maps `column` to `field`. Re-inserting a column replaces its field and
    /// keeps its original position.
    pub fn insert(&mut self, column: impl Into<String>, field: impl Into<String>) {
        let column = column.into();
        let field = field.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = field,
            None => self.entries.push((column, field)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, f)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Into<String>, F: Into<String>> FromIterator<(C, F)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (C, F)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (column, field) in iter {
            map.insert(column, field);
        }
        map
    }
}

/// One `column=field` pair as written on the command line.
///
/// `column` alone maps the column to a field of the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: String,
    pub field: String,
}

impl FromStr for ColumnSpec {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, field) = match s.split_once('=') {
            Some((c, f)) => (c.trim(), f.trim()),
            None => (s.trim(), s.trim()),
        };
        if column.is_empty() || field.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                setting: "column",
                reason: format!("expected column=field, got '{}'", s),
            });
        }
        Ok(ColumnSpec {
            column: column.to_string(),
            field: field.to_string(),
        })
    }
}

/// Projects records into rows, one value per mapped column.
pub struct ColumnMapper {
    map: ColumnMap,
    stats: Arc<SinkStats>,
}

impl ColumnMapper {
    pub fn new(map: ColumnMap, stats: Arc<SinkStats>) -> Self {
        ColumnMapper { map, stats }
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.map
    }

    /// Returns the record's values in column order.
    ///
    /// A mapped field missing from the record yields `Value::Null`; it is
    /// logged and counted, never treated as an error.
    pub fn project(&self, record: &Record) -> Vec<Value> {
        self.map
            .iter()
            .map(|(column, field)| match record.get(field) {
                Some(value) => {
                    log::trace!("Column {} <- {} = {}", column, field, value);
                    value.clone()
                }
                None => {
                    log::debug!(
                        "Field '{}' for column '{}' missing from record, using NULL",
                        field,
                        column
                    );
                    self.stats.increment(SinkMetric::MissingField);
                    Value::Null
                }
            })
            .collect()
    }
}
