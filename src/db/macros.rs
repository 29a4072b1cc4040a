//! Database dispatch macros for reducing code duplication.
//!
//! These macros generate one match arm per backend while keeping call sites
//! linear. They expand at compile time with zero runtime overhead.

/// Macro for generating database dispatch match arms over `DbPool`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(&pool, {
///     MySql(p) => p.begin().await.map(DbTransaction::MySql),
///     Postgres(p) => p.begin().await.map(DbTransaction::Postgres),
///     SQLite(p) => p.begin().await.map(DbTransaction::SQLite),
/// });
/// ```
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

/// Macro for running the same body against an open transaction of any backend.
///
/// Inside the body `$conn` is the transaction's connection, usable as a sqlx
/// executor.
///
/// # Example
///
/// ```ignore
/// dispatch_tx!(&mut tx, |conn| conn.prepare(text).await.map(|_| ()))
/// ```
macro_rules! dispatch_tx {
    ($tx:expr, |$conn:ident| $body:expr) => {
        match $tx {
            $crate::db::dealer::DbTransaction::MySql(tx) => {
                let $conn = &mut **tx;
                $body
            }
            $crate::db::dealer::DbTransaction::Postgres(tx) => {
                let $conn = &mut **tx;
                $body
            }
            $crate::db::dealer::DbTransaction::SQLite(tx) => {
                let $conn = &mut **tx;
                $body
            }
        }
    };
}

/// Macro for running a query with bound arguments against an open transaction.
///
/// Inside the body `$conn` is the transaction's connection and `$bind` is the
/// backend's binder from `db::params`. The PostgreSQL binder prepares `$sql`
/// first; a failure there is returned wrapped in `$stage` without running the
/// body, so the body must evaluate to a `DbResult`.
///
/// # Example
///
/// ```ignore
/// dispatch_query!(&mut tx, &sql, "executing query", |conn, bind| {
///     bind.query(&sql, args).execute(conn).await.map(|r| r.rows_affected()).stage("executing query")
/// })
/// ```
macro_rules! dispatch_query {
    ($tx:expr, $sql:expr, $stage:expr, |$conn:ident, $bind:ident| $body:expr) => {
        match $tx {
            $crate::db::dealer::DbTransaction::MySql(tx) => {
                let $conn = &mut **tx;
                let $bind = $crate::db::params::MySqlBinder;
                $body
            }
            $crate::db::dealer::DbTransaction::Postgres(tx) => {
                let $conn = &mut **tx;
                match $crate::db::params::PgBinder::prepare(&mut *$conn, $sql).await {
                    Ok($bind) => $body,
                    Err(err) => Err($crate::error::DbError::from(err).within($stage)),
                }
            }
            $crate::db::dealer::DbTransaction::SQLite(tx) => {
                let $conn = &mut **tx;
                let $bind = $crate::db::params::SqliteBinder;
                $body
            }
        }
    };
}

pub(crate) use dispatch_query;
pub(crate) use dispatch_tx;
pub(crate) use impl_db_dispatch;
