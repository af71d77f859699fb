//! SQL batch statement construction.
//!
//! Builds one multi-row `INSERT` per flush. Values are never interpolated
//! into the SQL text: every value becomes a `?` placeholder and travels in
//! [`BatchStatement::params`], so quotes, backslashes and other
//! metacharacters in record content cannot change the statement.

use crate::error_handling::ConfigurationError;
use crate::record::Value;

/// SQL dialect of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    /// Picks the dialect from a connection URL scheme. A leading `jdbc:` is ignored.
    pub fn from_url(url: &str) -> Result<Self, ConfigurationError> {
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(ConfigurationError::InvalidConnectionString(format!(
                "unsupported scheme '{}' (expected mysql, mariadb or sqlite)",
                scheme
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
        }
    }

    /// Quotes one identifier segment, doubling any embedded quote character.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Quotes a possibly schema-qualified name (`schema.table`).
    pub fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| self.quote_identifier(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Statement prefix up to and including `INTO`.
    pub fn insert_verb(&self, insert_ignore: bool) -> &'static str {
        match (self, insert_ignore) {
            (_, false) => "INSERT INTO",
            (Dialect::MySql, true) => "INSERT IGNORE INTO",
            (Dialect::Sqlite, true) => "INSERT OR IGNORE INTO",
        }
    }

    /// Largest number of bound parameters one statement may carry.
    pub fn max_bind_params(&self) -> usize {
        match self {
            Dialect::MySql => 65_535,
            Dialect::Sqlite => 32_766,
        }
    }
}

/// One ready-to-execute `INSERT` with its bound parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    pub sql: String,
    pub params: Vec<Value>,
    /// Number of rows encoded in this statement.
    pub rows: usize,
}

/// Encodes rows for one fixed table and column list.
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    dialect: Dialect,
    prefix: String,
    row_placeholder: String,
    column_count: usize,
}

impl BatchEncoder {
    pub fn new<'a>(
        dialect: Dialect,
        table_name: &str,
        columns: impl IntoIterator<Item = &'a str>,
        insert_ignore: bool,
    ) -> Self {
        let quoted: Vec<String> = columns
            .into_iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let column_count = quoted.len();
        let prefix = format!(
            "{} {} ({}) VALUES ",
            dialect.insert_verb(insert_ignore),
            dialect.quote_qualified(table_name),
            quoted.join(",")
        );
        let row_placeholder = format!("({})", vec!["?"; column_count].join(","));

        BatchEncoder {
            dialect,
            prefix,
            row_placeholder,
            column_count,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Rows that fit in one statement under the dialect's parameter ceiling.
    pub fn max_rows_per_statement(&self) -> usize {
        (self.dialect.max_bind_params() / self.column_count.max(1)).max(1)
    }

    /// Encodes all rows into a single statement, preserving row and column order.
    ///
    /// Callers must not pass an empty slice; the buffer never flushes an empty batch.
    pub fn encode(&self, rows: &[Vec<Value>]) -> BatchStatement {
        debug_assert!(!rows.is_empty(), "encode called with no rows");

        let mut sql = String::with_capacity(
            self.prefix.len() + rows.len() * (self.row_placeholder.len() + 1),
        );
        sql.push_str(&self.prefix);
        let mut params = Vec::with_capacity(rows.len() * self.column_count);

        for (i, row) in rows.iter().enumerate() {
            debug_assert_eq!(row.len(), self.column_count, "row width mismatch");
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(&self.row_placeholder);
            params.extend(row.iter().cloned());
        }

        BatchStatement {
            sql,
            params,
            rows: rows.len(),
        }
    }

    /// Encodes a batch as one statement, or several consecutive ones when the
    /// batch would exceed the parameter ceiling.
    pub fn encode_chunks(&self, rows: &[Vec<Value>]) -> Vec<BatchStatement> {
        rows.chunks(self.max_rows_per_statement())
            .map(|chunk| self.encode(chunk))
            .collect()
    }
}

/// Builds a single `INSERT [IGNORE] INTO <table> (<cols>) VALUES (...),...` statement.
pub fn encode(
    dialect: Dialect,
    table_name: &str,
    columns: &[&str],
    rows: &[Vec<Value>],
    insert_ignore: bool,
) -> BatchStatement {
    BatchEncoder::new(dialect, table_name, columns.iter().copied(), insert_ignore).encode(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::from("first"), Value::Integer(1)],
            vec![Value::from("it's \"quoted\" \\ back"), Value::Null],
        ]
    }

    #[test]
    fn test_mysql_statement_shape() {
        let stmt = encode(Dialect::MySql, "logs", &["message", "code"], &rows(), false);
        assert_eq!(
            stmt.sql,
            "INSERT INTO `logs` (`message`,`code`) VALUES (?,?),(?,?)"
        );
        assert_eq!(stmt.rows, 2);
        assert_eq!(stmt.params.len(), 4);
        assert_eq!(stmt.params[2], Value::from("it's \"quoted\" \\ back"));
        assert_eq!(stmt.params[3], Value::Null);
    }

    #[test]
    fn test_values_never_appear_in_sql() {
        let rows = vec![vec![Value::from("'); DROP TABLE logs; --")]];
        let stmt = encode(Dialect::MySql, "logs", &["message"], &rows, false);
        assert!(!stmt.sql.contains("DROP"));
        assert_eq!(stmt.sql, "INSERT INTO `logs` (`message`) VALUES (?)");
    }

    #[test]
    fn test_insert_ignore_changes_only_verb() {
        let plain = encode(Dialect::MySql, "logs", &["message", "code"], &rows(), false);
        let ignore = encode(Dialect::MySql, "logs", &["message", "code"], &rows(), true);
        assert!(ignore.sql.starts_with("INSERT IGNORE INTO "));
        assert!(!plain.sql.contains("IGNORE"));
        assert_eq!(
            plain.sql.trim_start_matches("INSERT INTO"),
            ignore.sql.trim_start_matches("INSERT IGNORE INTO")
        );
        assert_eq!(plain.params, ignore.params);
    }

    #[test]
    fn test_sqlite_dialect() {
        let stmt = encode(Dialect::Sqlite, "main.logs", &["message", "code"], &rows(), true);
        assert_eq!(
            stmt.sql,
            "INSERT OR IGNORE INTO \"main\".\"logs\" (\"message\",\"code\") VALUES (?,?),(?,?)"
        );
    }

    #[test]
    fn test_quote_identifier_doubles_quotes() {
        assert_eq!(Dialect::MySql.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(Dialect::Sqlite.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_encode_chunks_respects_param_ceiling() {
        let encoder = BatchEncoder::new(Dialect::Sqlite, "t", ["a", "b"], false);
        let per_stmt = encoder.max_rows_per_statement();
        assert_eq!(per_stmt, 16_383);

        let rows: Vec<Vec<Value>> = (0..per_stmt as i64 + 5)
            .map(|i| vec![Value::Integer(i), Value::Null])
            .collect();
        let stmts = encoder.encode_chunks(&rows);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].rows, per_stmt);
        assert_eq!(stmts[1].rows, 5);
        assert_eq!(stmts[1].params[0], Value::Integer(per_stmt as i64));
    }

    #[test]
    fn test_small_batch_is_one_statement() {
        let encoder = BatchEncoder::new(Dialect::MySql, "t", ["a", "b"], false);
        assert_eq!(encoder.encode_chunks(&rows()).len(), 1);
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("mysql://localhost/db").unwrap(), Dialect::MySql);
        assert_eq!(
            Dialect::from_url("jdbc:mysql://localhost:3306/db").unwrap(),
            Dialect::MySql
        );
        assert_eq!(Dialect::from_url("mariadb://h/db").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("postgres://h/db").is_err());
    }
}
