//! Storage interface for engine state.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::EngineState;

/// Stores [`EngineState`] documents under string keys.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Loads the document stored under `key`, if any.
    async fn load_state(&self, key: &str) -> Result<Option<EngineState>, PersistenceError>;

    /// Stores `state` under `key`, replacing any previous document.
    async fn save_state(&self, key: &str, state: &EngineState) -> Result<(), PersistenceError>;

    /// Deletes the document under `key`. Returns false if there was none.
    async fn delete_state(&self, key: &str) -> Result<bool, PersistenceError>;

    /// Ensures all pending writes are flushed to disk.
    async fn flush(&self) -> Result<(), PersistenceError>;
}
