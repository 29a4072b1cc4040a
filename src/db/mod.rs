//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management and the autocommit connector
//! - Transactional dealers
//! - Cooked statement registry
//! - Failure reservation
//! - Type mappings and parameter binding
//! - Driver event logging
//! - Database dispatch macros for reducing code duplication

pub mod dealer;
pub mod logger;
pub mod macros;
pub mod params;
pub mod pool;
pub mod reserve;
pub mod statements;
pub mod types;

pub use dealer::{Dealer, Dealing};
pub use logger::{DriverLog, LogLevel, forward};
pub use pool::{Connector, DbPool};
pub use reserve::Reserve;
pub use statements::{Statement, StatementCache, content_key};
