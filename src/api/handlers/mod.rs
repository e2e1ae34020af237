//! API handlers for claimsdesk.
//!
//! Each resource lives in its own module: route functions parse input and map
//! outcomes to responses, `storage` modules own the SQL. Failures are reported
//! through [`ApiError`].

pub mod documents;
mod error;
pub mod health;
pub mod incidents;
pub mod reference;
pub mod root;
pub mod traders;

#[cfg(test)]
mod tests;

pub use error::ApiError;

use crate::graph::DocumentStore;
use std::sync::Arc;

/// Document storage as seen by handlers; disabled when Graph is not configured.
#[derive(Clone)]
pub struct DocumentsState {
    store: Option<Arc<dyn DocumentStore>>,
    root_folder: String,
}

impl DocumentsState {
    #[must_use]
    pub fn enabled(store: Arc<dyn DocumentStore>, root_folder: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            root_folder: root_folder.into(),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: None,
            root_folder: String::new(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub(crate) fn store(&self) -> Option<&dyn DocumentStore> {
        self.store.as_deref()
    }

    pub(crate) fn root_folder(&self) -> &str {
        &self.root_folder
    }
}

impl std::fmt::Debug for DocumentsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentsState")
            .field("enabled", &self.is_enabled())
            .field("root_folder", &self.root_folder)
            .finish()
    }
}

/// Returns `true` for Postgres `unique_violation` (23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Returns `true` for Postgres `foreign_key_violation` (23503).
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}
