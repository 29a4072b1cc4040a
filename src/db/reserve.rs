//! Failure reservation: on-disk dumps for replaying failed saves.
//!
//! When enabled, every cooked statement is written to `<dir>/<key>.sql`, and
//! every failed save writes its arguments to `<dir>/<key>_<digest>.json`, where
//! the digest is the content key of the JSON document. The document is an
//! indented object mapping each bound column name to its value, so a failed
//! save can be inspected and replayed against the statement file later.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::db::statements::content_key;
use crate::error::{DbError, DbResult, ResultExt};
use crate::models::Value;

/// A validated, writable reservation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserve {
    dir: PathBuf,
}

impl Reserve {
    /// Validate a reservation directory.
    ///
    /// An empty path disables reservation and yields `None`. Otherwise the path
    /// is made absolute and must name an existing directory. Writability is
    /// checked with a freshly named scratch file, so existing files are never
    /// opened.
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Option<Self>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(None);
        }
        let dir = std::path::absolute(path).stage("resolving reserve path")?;
        let meta = tokio::fs::metadata(&dir)
            .await
            .stage("testing reserve path")?;
        if !meta.is_dir() {
            return Err(DbError::config(format!(
                "reserve path is not a directory: {}",
                dir.display()
            )));
        }

        let scratch = dir.join(scratch_name());
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&scratch)
            .await
            .stage("checking reserve path is writable")?;
        tokio::fs::remove_file(&scratch)
            .await
            .stage("checking reserve path is writable")?;

        Ok(Some(Self { dir }))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn statement_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.sql"))
    }

    pub fn args_path(&self, key: &str, digest: &str) -> PathBuf {
        self.dir.join(format!("{key}_{digest}.json"))
    }

    /// Write the statement text, replacing any earlier copy.
    pub async fn store_statement(&self, key: &str, text: &str) -> DbResult<PathBuf> {
        let path = self.statement_path(key);
        tokio::fs::write(&path, text).await?;
        Ok(path)
    }

    /// Write the argument dump of a failed save and return its path.
    ///
    /// Identical argument sets for the same statement land in the same file.
    pub async fn store_args(
        &self,
        key: &str,
        columns: &[String],
        args: &[Value],
    ) -> DbResult<PathBuf> {
        let document = args_document(columns, args)?;
        let path = self.args_path(key, &content_key(&document));
        tokio::fs::write(&path, document).await?;
        Ok(path)
    }
}

fn scratch_name() -> String {
    format!(".reserve-{}.tmp", uuid::Uuid::new_v4().simple())
}

/// Render the name-keyed argument dump of a save.
pub fn args_document(columns: &[String], args: &[Value]) -> DbResult<String> {
    let named: BTreeMap<&str, &Value> = columns
        .iter()
        .map(String::as_str)
        .zip(args.iter())
        .collect();
    Ok(serde_json::to_string_pretty(&named)?)
}
