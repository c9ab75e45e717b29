//! Implementation of the StateRepository trait for SqliteStateRepository

use async_trait::async_trait;
use sqlx::Row;

use crate::{
    models::EngineState,
    persistence::{error::PersistenceError, sqlite::SqliteStateRepository, traits::StateRepository},
};

#[async_trait]
impl StateRepository for SqliteStateRepository {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn load_state(&self, key: &str) -> Result<Option<EngineState>, PersistenceError> {
        tracing::debug!(key, "Attempting to load engine state.");

        let row = self
            .execute_query_with_error_handling(
                "load engine state",
                sqlx::query("SELECT value FROM engine_state WHERE key = ?")
                    .bind(key)
                    .fetch_optional(self.pool()),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String =
            row.try_get("value").map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;
        serde_json::from_str(&value)
            .map(Some)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))
    }

    #[tracing::instrument(skip(self, state), level = "debug")]
    async fn save_state(&self, key: &str, state: &EngineState) -> Result<(), PersistenceError> {
        tracing::debug!(key, templates = state.templates.len(), contexts = state.contexts.len(), "Saving engine state.");

        let value = serde_json::to_string(state)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        self.execute_query_with_error_handling(
            "save engine state",
            sqlx::query(
                "INSERT INTO engine_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            )
            .bind(key)
            .bind(value)
            .execute(self.pool()),
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete_state(&self, key: &str) -> Result<bool, PersistenceError> {
        let result = self
            .execute_query_with_error_handling(
                "delete engine state",
                sqlx::query("DELETE FROM engine_state WHERE key = ?").bind(key).execute(self.pool()),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "WAL checkpoint",
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(self.pool()),
        )
        .await?;
        Ok(())
    }
}
