//! Shared fixtures for integration tests.
#![allow(dead_code)]

use sql_dealer::models::downcast;
use sql_dealer::{
    Collector, ConnectOption, Connector, DbResult, Dealing, Shaper, Slot, Translator, Value,
};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

pub const CREATE_USERS: &str =
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)";
pub const INSERT_USER: &str = "INSERT INTO users (name) VALUES ($1) RETURNING id";
pub const SELECT_USER: &str = "SELECT * FROM users WHERE id = $1";
pub const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

pub const CREATE_MEMBERS: &str = "CREATE TABLE members \
     (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)";
pub const INSERT_MEMBER: &str = "INSERT INTO members (name, age) VALUES ($1, $2) RETURNING id";
pub const SELECT_MEMBER: &str = "SELECT * FROM members WHERE id = $1";

/// Route library events to the test output; filter with RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connect to a fresh SQLite database file.
///
/// The returned file must outlive the connector.
pub async fn sqlite(options: &[ConnectOption]) -> (Connector, NamedTempFile) {
    init_tracing();
    let temp_file = NamedTempFile::new().unwrap();
    let url = format!("sqlite:{}", temp_file.path().display());
    let connector = Connector::connect(&url, options).await.unwrap();
    (connector, temp_file)
}

/// Connect to a fresh SQLite database with an empty `users` table.
pub async fn sqlite_with_users(options: &[ConnectOption]) -> (Connector, NamedTempFile) {
    let (mut connector, temp_file) = sqlite(options).await;
    connector.deal(None, CREATE_USERS, &[]).await.unwrap();
    (connector, temp_file)
}

pub async fn count_users<D: Dealing>(dealer: &mut D) -> DbResult<i64> {
    let mut counts = sql_dealer::Ints::new();
    dealer.deal(Some(&mut counts), COUNT_USERS, &[]).await?;
    Ok(counts.first().copied().unwrap_or_default())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

/// Row model for `users`; an empty name binds as NULL.
#[derive(Debug, Default)]
pub struct UserModel {
    id: i64,
    name: Option<String>,
}

impl Translator for UserModel {
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot> {
        match name {
            "id" => Some(&mut self.id),
            "name" => Some(&mut self.name),
            _ => None,
        }
    }
}

impl Shaper for User {
    fn extrude(&self) -> Box<dyn Translator> {
        Box::new(UserModel {
            id: self.id,
            name: (!self.name.is_empty()).then(|| self.name.clone()),
        })
    }

    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
        let model = downcast::<UserModel, _>(model)?;
        self.id = model.id;
        self.name = model.name.unwrap_or_default();
        Ok(())
    }
}

/// Collects users, optionally stopping after `limit` rows.
#[derive(Debug, Default)]
pub struct Users {
    pub items: Vec<User>,
    pub limit: Option<usize>,
}

impl Users {
    pub fn limited(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit: Some(limit),
        }
    }
}

impl Collector for Users {
    fn new_item(&mut self) -> Option<Box<dyn Shaper>> {
        if self.limit.is_some_and(|limit| self.items.len() >= limit) {
            return None;
        }
        Some(Box::new(User::default()))
    }

    fn collect(&mut self, item: Box<dyn Shaper>) -> DbResult<()> {
        let user = downcast::<User, _>(item)?;
        self.items.push(*user);
        Ok(())
    }
}

/// A row with a nullable column; the struct is its own model.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
}

impl Member {
    pub fn new(name: &str, age: Option<i64>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            age,
        }
    }
}

impl Translator for Member {
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot> {
        match name {
            "id" => Some(&mut self.id),
            "name" => Some(&mut self.name),
            "age" => Some(&mut self.age),
            _ => None,
        }
    }
}

impl Shaper for Member {
    fn extrude(&self) -> Box<dyn Translator> {
        Box::new(self.clone())
    }

    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
        *self = *downcast::<Member, _>(model)?;
        Ok(())
    }
}

/// A model no shaper in these tests accepts.
#[derive(Debug, Default)]
pub struct ForeignModel {
    value: Value,
}

impl Translator for ForeignModel {
    fn translate(&mut self, _name: &str) -> Option<&mut dyn Slot> {
        Some(&mut self.value)
    }
}
