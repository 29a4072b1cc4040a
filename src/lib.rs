//! sql-dealer
//!
//! Transactional data access over PostgreSQL, MySQL and SQLite.
//!
//! A [`Connector`] owns a connection pool and a registry of cooked (server
//! prepared) statements. Work happens through the [`Dealing`] surface: on the
//! connector each call is its own transaction, on a [`Dealer`] every call shares
//! one transaction until it is jailed. Rows are mapped to domain objects by
//! column name through the [`Shaper`]/[`Translator`]/[`Collector`] protocol.
//!
//! ```ignore
//! use sql_dealer::{ConnectOption, Connector, Dealing, Strings};
//!
//! let mut db = Connector::connect("sqlite:app.db", &[ConnectOption::PoolSize(4)]).await?;
//! let mut names = Strings::new();
//! db.deal(Some(&mut names), "SELECT name FROM users", &[]).await?;
//!
//! let mut dealer = db.new_dealer().await?;
//! let key = dealer.cook("INSERT INTO users (name) VALUES ($1)", &["name"]).await?;
//! dealer.save(&user, &key, None).await?;
//! dealer.jail(true).await?;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, ConnectOption};
pub use db::{Connector, DbPool, Dealer, Dealing, LogLevel, Statement};
pub use error::{DbError, DbResult, ResultExt};
pub use models::{
    Collector, DatabaseType, Ints, Mismatch, RawList, Shaper, Slot, Strings, Translator, Value,
    downcast,
};
