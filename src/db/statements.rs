//! Registry of cooked statements.
//!
//! A cooked statement is SQL text that the server accepted for preparation,
//! registered under a key derived from the text itself. Queries and saves can
//! then refer to the statement by key; any string that is not a registered key
//! is treated as raw SQL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Content key for a piece of text: lowercase hex SHA-256.
///
/// Used both as the statement key and as the digest of reserved argument dumps.
pub fn content_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// A statement accepted by the server, with the column names its arguments bind.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub key: String,
    pub text: String,
    /// Argument order for saves: the i-th column is bound to the i-th placeholder.
    pub columns: Vec<String>,
    pub cooked_at: DateTime<Utc>,
}

impl Statement {
    pub fn new(text: &str, columns: &[&str]) -> Self {
        Self {
            key: content_key(text),
            text: text.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            cooked_at: Utc::now(),
        }
    }
}

/// Shared statement registry, readable concurrently and written on cook.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<String, Arc<Statement>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a statement, replacing any earlier registration of the same text.
    pub async fn register(&self, statement: Statement) -> Arc<Statement> {
        let statement = Arc::new(statement);
        self.entries
            .write()
            .await
            .insert(statement.key.clone(), Arc::clone(&statement));
        statement
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Statement>> {
        self.entries.read().await.get(key).cloned()
    }

    /// The SQL text to run for `query`: the registered text if `query` is a key,
    /// otherwise `query` itself.
    pub async fn resolve(&self, query: &str) -> String {
        match self.entries.read().await.get(query) {
            Some(statement) => statement.text.clone(),
            None => query.to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every registration, returning how many there were.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let released = entries.len();
        entries.clear();
        released
    }
}
