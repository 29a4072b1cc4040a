//! Error types for the data-access layer.
//!
//! All errors are variants of [`DbError`]. As an error crosses a component
//! boundary it is wrapped with a short stage description (see [`ResultExt::stage`]),
//! and [`DbError::cause`] unwraps every stage again so callers can match on the
//! underlying variant regardless of how deep it was wrapped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("connection is closed")]
    ConnClosed,

    #[error("unknown shaper type")]
    UnknownType,

    #[error("unknown prepared statement: {key}")]
    UnknownStatement { key: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}{}", sql_state_suffix(.sql_state))]
    Database {
        message: String,
        /// e.g., "23502" for a NOT NULL violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("cannot scan column '{column}': {message}")]
    Scan { column: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("{stage}: {source}")]
    Context {
        stage: &'static str,
        source: Box<DbError>,
    },
}

fn sql_state_suffix(sql_state: &Option<String>) -> String {
    sql_state
        .as_ref()
        .map(|code| format!(" (SQLSTATE {})", code))
        .unwrap_or_default()
}

impl DbError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a scan error for the named column.
    pub fn scan(column: impl Into<String>, message: impl ToString) -> Self {
        Self::Scan {
            column: column.into(),
            message: message.to_string(),
        }
    }

    pub fn unknown_statement(key: impl Into<String>) -> Self {
        Self::UnknownStatement { key: key.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap this error with a stage description.
    pub fn within(self, stage: &'static str) -> Self {
        Self::Context {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every stage wrapper removed.
    pub fn cause(&self) -> &DbError {
        let mut current = self;
        while let DbError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// The outermost stage description, if this error was wrapped.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            DbError::Context { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Check whether the underlying cause is a closed pool or dealer.
    pub fn is_conn_closed(&self) -> bool {
        matches!(self.cause(), DbError::ConnClosed)
    }

    /// SQLSTATE of the underlying database error, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self.cause() {
            DbError::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self.cause() {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.cause(),
            Self::Connection { .. } | Self::Timeout { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax, referenced objects and constraints",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::Timeout {
                operation: "connection pool acquire".to_string(),
            },
            sqlx::Error::PoolClosed => DbError::ConnClosed,
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => DbError::scan(index, source),
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Stage wrapping for any result whose error converts into [`DbError`].
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a stage description.
    fn stage(self, stage: &'static str) -> DbResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<DbError>,
{
    fn stage(self, stage: &'static str) -> DbResult<T> {
        self.map_err(|err| err.into().within(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        let err = DbError::ConnClosed.within("executing query");
        assert_eq!(err.to_string(), "executing query: connection is closed");
        assert_eq!(err.stage(), Some("executing query"));
    }

    #[test]
    fn test_cause_unwraps_every_stage() {
        let err = DbError::ConnClosed
            .within("creating dealer")
            .within("saving item");
        assert!(matches!(err.cause(), DbError::ConnClosed));
        assert!(err.is_conn_closed());
        assert_eq!(
            err.to_string(),
            "saving item: creating dealer: connection is closed"
        );
    }

    #[test]
    fn test_result_stage_only_wraps_errors() {
        let ok: Result<u32, DbError> = Ok(7);
        assert_eq!(ok.stage("ignored").unwrap(), 7);

        let err: Result<u32, DbError> = Err(DbError::UnknownType);
        let wrapped = err.stage("collecting item").unwrap_err();
        assert_eq!(wrapped.to_string(), "collecting item: unknown shaper type");
    }

    #[test]
    fn test_database_error_includes_sql_state() {
        let err = DbError::database(
            "null value in column \"name\" violates not-null constraint",
            Some("23502".to_string()),
            "check constraints",
        )
        .within("executing query");
        assert!(err.to_string().ends_with("(SQLSTATE 23502)"));
        assert_eq!(err.sql_state(), Some("23502"));
        assert_eq!(err.suggestion(), Some("check constraints"));
    }

    #[test]
    fn test_pool_closed_maps_to_conn_closed() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_conn_closed());
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
        assert!(err.within("creating dealer").is_retryable());
        assert!(!DbError::UnknownType.is_retryable());
    }

    #[test]
    fn test_column_decode_maps_to_scan() {
        let err: DbError = sqlx::Error::ColumnDecode {
            index: "\"name\"".to_string(),
            source: "mismatched types".into(),
        }
        .into();
        match err {
            DbError::Scan { column, message } => {
                assert_eq!(column, "\"name\"");
                assert_eq!(message, "mismatched types");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_io_error_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Err::<(), _>(io).stage("testing reserve path").unwrap_err();
        assert!(matches!(err.cause(), DbError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
