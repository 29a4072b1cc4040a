//! Parameter binding utilities for database queries.
//!
//! Arguments are bound positionally. Each backend gets its own binder because
//! the sqlx argument buffers differ; the value mapping is the same everywhere
//! except that SQLite has no native JSON or timestamp type and receives text.
//!
//! PostgreSQL checks the binary format of every argument against the type of
//! its placeholder, and sqlx keeps one prepared form per SQL text on each
//! connection. The PostgreSQL binder therefore prepares the text first and
//! converts each value to the declared parameter type, so a statement behaves
//! the same whether it was cooked on that connection or not.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::{PgArguments, PgConnection};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::{Decimal, Json, Uuid};
use sqlx::{Executor, MySql, Postgres, Sqlite, Statement as _, TypeInfo};

use crate::models::Value;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Binds arguments for MySQL, which sends argument types with every execution.
pub(crate) struct MySqlBinder;

impl MySqlBinder {
    /// Build a MySQL query with every argument bound.
    pub(crate) fn query<'q>(
        &self,
        sql: &'q str,
        args: &'q [Value],
    ) -> Query<'q, MySql, MySqlArguments> {
        args.iter().fold(sqlx::query(sql), bind_mysql_param)
    }
}

/// Binds arguments for SQLite, which stores whatever it is given.
pub(crate) struct SqliteBinder;

impl SqliteBinder {
    /// Build a SQLite query with every argument bound.
    pub(crate) fn query<'q>(
        &self,
        sql: &'q str,
        args: &'q [Value],
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        args.iter().fold(sqlx::query(sql), bind_sqlite_param)
    }
}

/// Binds arguments for PostgreSQL using the statement's declared parameter types.
#[derive(Debug, Default)]
pub(crate) struct PgBinder {
    types: Vec<String>,
}

impl PgBinder {
    /// Prepare `sql` on `conn` and remember its parameter types.
    ///
    /// The prepared form is cached by sqlx, so this costs one round trip per
    /// text and connection.
    pub(crate) async fn prepare(conn: &mut PgConnection, sql: &str) -> Result<Self, sqlx::Error> {
        let statement = conn.prepare(sql).await?;
        let types = statement
            .parameters()
            .and_then(|params| params.left())
            .map(|params| params.iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default();
        Ok(Self { types })
    }

    /// Build a PostgreSQL query with every argument bound.
    pub(crate) fn query<'q>(&self, sql: &'q str, args: &'q [Value]) -> PgQuery<'q> {
        args.iter()
            .enumerate()
            .fold(sqlx::query(sql), |query, (idx, param)| {
                bind_postgres_param(query, param, self.types.get(idx).map(String::as_str))
            })
    }
}

/// Bind a parameter to a MySQL query.
fn bind_mysql_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Timestamp(v) => query.bind(*v),
        Value::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a PostgreSQL query, converting it to `declared` when known.
///
/// Values that cannot be converted are bound as they are and the server
/// reports the mismatch.
fn bind_postgres_param<'q>(
    query: PgQuery<'q>,
    param: &'q Value,
    declared: Option<&str>,
) -> PgQuery<'q> {
    let Some(declared) = declared else {
        return bind_postgres_native(query, param);
    };
    match (param, declared) {
        (Value::Null, _) => bind_postgres_null(query, declared),
        (Value::Int(v), "INT2") => match i16::try_from(*v) {
            Ok(n) => query.bind(n),
            Err(_) => query.bind(*v),
        },
        (Value::Int(v), "INT4") => match i32::try_from(*v) {
            Ok(n) => query.bind(n),
            Err(_) => query.bind(*v),
        },
        (Value::Int(v), "FLOAT4") => query.bind(*v as f32),
        (Value::Int(v), "FLOAT8") => query.bind(*v as f64),
        (Value::Int(v), "NUMERIC") => query.bind(Decimal::from(*v)),
        (Value::Int(v), "TEXT" | "VARCHAR" | "BPCHAR") => query.bind(v.to_string()),
        (Value::Float(v), "FLOAT4") => query.bind(*v as f32),
        (Value::Float(v), "NUMERIC") => match Decimal::try_from(*v) {
            Ok(d) => query.bind(d),
            Err(_) => query.bind(*v),
        },
        (Value::Text(v), "NUMERIC") => match v.parse::<Decimal>() {
            Ok(d) => query.bind(d),
            Err(_) => query.bind(v.as_str()),
        },
        (Value::Text(v), "UUID") => match Uuid::parse_str(v) {
            Ok(id) => query.bind(id),
            Err(_) => query.bind(v.as_str()),
        },
        (Value::Text(v), "JSON" | "JSONB") => match serde_json::from_str::<JsonValue>(v) {
            Ok(doc) => query.bind(Json(doc)),
            Err(_) => query.bind(v.as_str()),
        },
        (Value::Timestamp(v), "TIMESTAMP") => query.bind(v.naive_utc()),
        (Value::Timestamp(v), "DATE") => query.bind(v.date_naive()),
        _ => bind_postgres_native(query, param),
    }
}

/// Bind a value with its natural PostgreSQL type.
fn bind_postgres_native<'q>(query: PgQuery<'q>, param: &'q Value) -> PgQuery<'q> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Timestamp(v) => query.bind(*v),
        Value::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a NULL carrying the declared parameter type.
fn bind_postgres_null<'q>(query: PgQuery<'q>, declared: &str) -> PgQuery<'q> {
    match declared {
        "BOOL" => query.bind(None::<bool>),
        "INT2" => query.bind(None::<i16>),
        "INT4" => query.bind(None::<i32>),
        "INT8" => query.bind(None::<i64>),
        "FLOAT4" => query.bind(None::<f32>),
        "FLOAT8" => query.bind(None::<f64>),
        "NUMERIC" => query.bind(None::<Decimal>),
        "BYTEA" => query.bind(None::<Vec<u8>>),
        "UUID" => query.bind(None::<Uuid>),
        "DATE" => query.bind(None::<NaiveDate>),
        "TIMESTAMP" => query.bind(None::<NaiveDateTime>),
        "TIMESTAMPTZ" => query.bind(None::<DateTime<Utc>>),
        "JSON" | "JSONB" => query.bind(None::<Json<JsonValue>>),
        _ => query.bind(None::<String>),
    }
}

/// Bind a parameter to a SQLite query.
fn bind_sqlite_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        // SQLite doesn't have native timestamp or JSON types, store as string
        Value::Timestamp(v) => query.bind(v.to_rfc3339()),
        Value::Json(v) => query.bind(v.to_string()),
    }
}
