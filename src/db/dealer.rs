//! Transactional scopes.
//!
//! A [`Dealer`] owns one open server transaction. Every operation on it runs
//! inside that transaction until [`Dealing::jail`] commits or rolls it back;
//! afterwards the dealer is closed and every operation fails with
//! [`DbError::ConnClosed`]. A dealer dropped while still open rolls back.
//!
//! Queries passed to `deal` and `load` are resolved through the connector's
//! statement registry: a cooked statement key runs the cooked text, anything
//! else runs as raw SQL.

use std::fmt;
use std::sync::Arc;

use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::{Executor, MySql, Postgres, Sqlite, Transaction};
use tracing::{debug, warn};

use crate::db::LogLevel;
use crate::db::macros::{dispatch_query, dispatch_tx};
use crate::db::pool::Shared;
use crate::db::types::DecodeRow;
use crate::error::{DbError, DbResult, ResultExt};
use crate::models::{Collector, DatabaseType, Shaper, Value};

/// Database-specific transaction wrapper.
pub(crate) enum DbTransaction {
    /// MySQL transaction
    MySql(Transaction<'static, MySql>),
    /// PostgreSQL transaction
    Postgres(Transaction<'static, Postgres>),
    /// SQLite transaction
    SQLite(Transaction<'static, Sqlite>),
}

impl DbTransaction {
    /// Get the database type for this transaction.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbTransaction::MySql(_) => DatabaseType::MySQL,
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Commit the transaction.
    ///
    /// If the commit does not complete, the connection is released with the
    /// transaction still open and sqlx rolls it back on release.
    pub async fn commit(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.commit().await.map_err(DbError::from),
            DbTransaction::Postgres(tx) => tx.commit().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.commit().await.map_err(DbError::from),
        }
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.rollback().await.map_err(DbError::from),
            DbTransaction::Postgres(tx) => tx.rollback().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.rollback().await.map_err(DbError::from),
        }
    }
}

/// The data-access surface shared by connectors and dealers.
///
/// On a [`Dealer`] every call runs inside its transaction. On a
/// [`Connector`](crate::db::Connector) every call runs in a fresh transaction
/// that is committed on success and rolled back on error.
///
/// Every returned future is `Send`, so code generic over `Dealing` can hand
/// the work to `tokio::spawn`.
pub trait Dealing {
    /// Prepare `text` on the server and register it for later use by key.
    ///
    /// `columns` names, in placeholder order, the fields a [`save`](Dealing::save)
    /// binds. Returns the statement key.
    fn cook(
        &mut self,
        text: &str,
        columns: &[&str],
    ) -> impl Future<Output = DbResult<String>> + Send;

    /// Run a query, feeding every returned row to `result` if one is given.
    ///
    /// Without a collector the statement is executed and its rows are ignored.
    /// The collector can stop reading early by returning no new item.
    fn deal(
        &mut self,
        result: Option<&mut dyn Collector>,
        query: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Run a query and scan its first row, if any, into `item`.
    ///
    /// Zero rows leave `item` untouched and are not an error.
    fn load(
        &mut self,
        item: &mut dyn Shaper,
        query: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Run the cooked statement `key` with arguments taken from `item`.
    ///
    /// The statement's columns are resolved through `item`'s model, in order;
    /// columns the model does not know are bound as NULL. A failed save is
    /// reserved to disk when reservation is enabled.
    fn save(
        &mut self,
        item: &dyn Shaper,
        key: &str,
        result: Option<&mut dyn Collector>,
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Finish the scope: commit when `commit` is true, roll back otherwise.
    fn jail(&mut self, commit: bool) -> impl Future<Output = DbResult<()>> + Send;
}

struct Active {
    tx: DbTransaction,
    shared: Arc<Shared>,
}

/// A transactional scope over one pooled connection.
pub struct Dealer {
    id: String,
    state: Option<Active>,
}

impl fmt::Debug for Dealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dealer")
            .field("id", &self.id)
            .field("open", &self.state.is_some())
            .finish()
    }
}

impl Dealer {
    pub(crate) fn new(tx: DbTransaction, shared: Arc<Shared>) -> Self {
        let id = generate_dealer_id();
        debug!(dealer = %id, database_type = %tx.db_type(), "Transaction started");
        Self {
            id,
            state: Some(Active { tx, shared }),
        }
    }

    /// Unique identifier used in log events.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the dealer can still run operations.
    pub fn is_open(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|active| !active.shared.is_closed())
    }

    /// Open a sibling dealer with its own transaction on the same pool.
    pub async fn new_dealer(&self) -> DbResult<Dealer> {
        match &self.state {
            Some(active) => active.shared.begin().await.stage("creating dealer"),
            None => Err(DbError::ConnClosed.within("creating dealer")),
        }
    }

    /// Commit if `outcome` succeeded, roll back otherwise, and pass it on.
    ///
    /// A failed commit replaces a successful outcome; a failed rollback is
    /// logged and the original error is kept.
    pub(crate) async fn settle<T>(mut self, outcome: DbResult<T>) -> DbResult<T> {
        match outcome {
            Ok(value) => {
                self.jail(true).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.jail(false).await {
                    warn!(dealer = %self.id, error = %rollback, "Rollback after failed operation did not complete");
                }
                Err(err)
            }
        }
    }
}

impl Drop for Dealer {
    fn drop(&mut self) {
        if self.state.is_some() {
            warn!(dealer = %self.id, "Dealer dropped without jail, transaction rolled back");
        }
    }
}

/// The open transaction, unless the dealer is jailed or its pool is closed.
fn ready(state: &mut Option<Active>) -> DbResult<&mut Active> {
    match state {
        Some(active) if !active.shared.is_closed() => Ok(active),
        _ => Err(DbError::ConnClosed),
    }
}

impl Dealing for Dealer {
    async fn cook(&mut self, text: &str, columns: &[&str]) -> DbResult<String> {
        let Active { tx, shared } = ready(&mut self.state).stage("preparing statement")?;
        dispatch_tx!(tx, |conn| conn.prepare(text).await.map(|_| ()))
            .stage("preparing statement")?;
        shared.log.statement(LogLevel::Debug, "Prepare", &self.id, text, 0);
        shared.register(text, columns).await
    }

    async fn deal(
        &mut self,
        result: Option<&mut dyn Collector>,
        query: &str,
        args: &[Value],
    ) -> DbResult<()> {
        let Active { tx, shared } = ready(&mut self.state).stage("executing query")?;
        let sql = shared.statements.resolve(query).await;

        let Some(collector) = result else {
            let outcome = dispatch_query!(tx, &sql, "executing query", |conn, bind| {
                bind.query(&sql, args)
                    .execute(conn)
                    .await
                    .map(|r| r.rows_affected())
                    .stage("executing query")
            });
            return match outcome {
                Ok(rows) => {
                    shared.log.statement(LogLevel::Info, "Exec", &self.id, &sql, rows);
                    Ok(())
                }
                Err(err) => {
                    shared.log.failure("Exec failed", &self.id, &sql, &err);
                    Err(err)
                }
            };
        };

        let outcome = dispatch_query!(tx, &sql, "selecting data", |conn, bind| {
            collect_rows(bind.query(&sql, args).fetch(conn), collector).await
        });
        match outcome {
            Ok(rows) => {
                shared.log.statement(LogLevel::Info, "Query", &self.id, &sql, rows);
                Ok(())
            }
            Err(err) => {
                shared.log.failure("Query failed", &self.id, &sql, &err);
                Err(err)
            }
        }
    }

    async fn load(&mut self, item: &mut dyn Shaper, query: &str, args: &[Value]) -> DbResult<()> {
        let Active { tx, shared } = ready(&mut self.state).stage("loading item")?;
        let sql = shared.statements.resolve(query).await;

        let outcome = dispatch_query!(tx, &sql, "selecting data", |conn, bind| {
            load_row(bind.query(&sql, args).fetch(conn), item).await
        });
        match outcome {
            Ok(found) => {
                shared
                    .log
                    .statement(LogLevel::Info, "Query", &self.id, &sql, u64::from(found));
                Ok(())
            }
            Err(err) => {
                shared.log.failure("Query failed", &self.id, &sql, &err);
                Err(err)
            }
        }
    }

    async fn save(
        &mut self,
        item: &dyn Shaper,
        key: &str,
        result: Option<&mut dyn Collector>,
    ) -> DbResult<()> {
        let active = ready(&mut self.state).stage("saving item")?;
        let shared = Arc::clone(&active.shared);
        let statement = shared
            .statements
            .get(key)
            .await
            .ok_or_else(|| DbError::unknown_statement(key))
            .stage("saving item")?;

        let mut model = item.extrude();
        let args: Vec<Value> = statement
            .columns
            .iter()
            .map(|column| model.translate(column).map_or(Value::Null, |slot| slot.value()))
            .collect();

        let outcome = self.deal(result, key, &args).await;
        if let (Err(err), Some(reserve)) = (&outcome, &shared.reserve) {
            match reserve.store_args(key, &statement.columns, &args).await {
                Ok(path) => warn!(
                    dealer = %self.id,
                    key,
                    path = %path.display(),
                    error = %err,
                    "Save failed, arguments reserved"
                ),
                Err(reserve_err) => warn!(
                    dealer = %self.id,
                    key,
                    error = %reserve_err,
                    "Save failed and its arguments could not be reserved"
                ),
            }
        }
        outcome
    }

    async fn jail(&mut self, commit: bool) -> DbResult<()> {
        let Some(Active { tx, shared }) = self.state.take() else {
            return Err(DbError::ConnClosed.within("closing transaction"));
        };
        // dropping the transaction rolls it back
        if shared.is_closed() {
            drop(tx);
            return Err(DbError::ConnClosed.within("closing transaction"));
        }

        let (outcome, event) = if commit {
            (tx.commit().await, "Commit")
        } else {
            (tx.rollback().await, "Rollback")
        };
        match &outcome {
            Ok(()) => shared.log.statement(LogLevel::Debug, event, &self.id, "", 0),
            Err(err) => warn!(dealer = %self.id, error = %err, "{event} failed, transaction released"),
        }
        debug!(dealer = %self.id, commit, "Transaction closed");
        outcome.stage("closing transaction")
    }
}

/// Feed rows to `collector` until the stream ends or the collector stops.
///
/// Returns the number of collected rows. Errors before the first row come from
/// the query itself; errors after it are reported as result checks.
async fn collect_rows<R: DecodeRow>(
    mut rows: BoxStream<'_, Result<R, sqlx::Error>>,
    collector: &mut dyn Collector,
) -> DbResult<u64> {
    let mut columns: Option<Vec<String>> = None;
    let mut collected = 0;
    loop {
        let row = match rows.try_next().await {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(err) if columns.is_none() => return Err(DbError::from(err).within("selecting data")),
            Err(err) => return Err(DbError::from(err).within("checking result")),
        };
        let Some(mut item) = collector.new_item() else {
            break;
        };
        let names = columns.get_or_insert_with(|| row.column_names());
        fill(&row, names, item.as_mut())?;
        collector.collect(item).stage("collecting item")?;
        collected += 1;
    }
    Ok(collected)
}

/// Scan the first row, if any, into `item`.
async fn load_row<R: DecodeRow>(
    mut rows: BoxStream<'_, Result<R, sqlx::Error>>,
    item: &mut dyn Shaper,
) -> DbResult<bool> {
    let Some(row) = rows.try_next().await.stage("selecting data")? else {
        return Ok(false);
    };
    fill(&row, &row.column_names(), item)?;
    Ok(true)
}

/// Scan one row through a fresh model of `item` and hand the model back.
fn fill<R: DecodeRow>(row: &R, names: &[String], item: &mut dyn Shaper) -> DbResult<()> {
    let mut model = item.extrude();
    for (idx, name) in names.iter().enumerate() {
        let Some(slot) = model.translate(name) else {
            continue;
        };
        let value = row.decode_value(idx).stage("scanning data row")?;
        slot.scan(value)
            .map_err(|mismatch| DbError::scan(name.as_str(), mismatch))
            .stage("scanning data row")?;
    }
    item.receive(model).stage("receiving model")
}

fn generate_dealer_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}
