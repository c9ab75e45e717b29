//! Durable storage of the engine state document.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::PersistenceError;
pub use sqlite::SqliteStateRepository;
pub use traits::StateRepository;

use crate::engine::ScriptEngine;

/// Loads the document under `key` into `engine`. Returns false if nothing
/// was stored.
#[tracing::instrument(skip(engine, repo), level = "info")]
pub async fn restore_engine_state(
    engine: &ScriptEngine,
    repo: &dyn StateRepository,
    key: &str,
) -> Result<bool, PersistenceError> {
    let Some(state) = repo.load_state(key).await? else {
        tracing::info!("No saved engine state found.");
        return Ok(false);
    };
    engine.import_state(state).map_err(|e| PersistenceError::InvalidInput(e.to_string()))?;
    Ok(true)
}

/// Exports `engine` and stores the document under `key`.
#[tracing::instrument(skip(engine, repo), level = "info")]
pub async fn persist_engine_state(
    engine: &ScriptEngine,
    repo: &dyn StateRepository,
    key: &str,
) -> Result<(), PersistenceError> {
    let state = engine.export_state();
    repo.save_state(key, &state).await?;
    repo.flush().await
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::{traits::MockStateRepository, *};
    use crate::models::{ENGINE_STATE_VERSION, EngineState, ExecutionContext, ExecutionStats};

    #[tokio::test]
    async fn test_restore_without_saved_state() {
        let mut repo = MockStateRepository::new();
        repo.expect_load_state().with(eq("engine_state")).times(1).returning(|_| Ok(None));

        let engine = ScriptEngine::default();
        assert!(!restore_engine_state(&engine, &repo, "engine_state").await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_imports_contexts() {
        let mut repo = MockStateRepository::new();
        repo.expect_load_state().returning(|_| {
            Ok(Some(EngineState {
                version: ENGINE_STATE_VERSION,
                stats: ExecutionStats::default(),
                templates: vec![],
                contexts: vec![ExecutionContext::new("ctx_restored", "Restored")],
            }))
        });

        let engine = ScriptEngine::default();
        assert!(restore_engine_state(&engine, &repo, "engine_state").await.unwrap());
        assert!(engine.contexts().get_context("ctx_restored").is_some());
    }

    #[tokio::test]
    async fn test_restore_rejects_invalid_document() {
        let mut repo = MockStateRepository::new();
        repo.expect_load_state().returning(|_| {
            Ok(Some(EngineState {
                version: ENGINE_STATE_VERSION + 1,
                stats: ExecutionStats::default(),
                templates: vec![],
                contexts: vec![],
            }))
        });

        let engine = ScriptEngine::default();
        let err = restore_engine_state(&engine, &repo, "engine_state").await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_persist_saves_and_flushes() {
        let mut repo = MockStateRepository::new();
        repo.expect_save_state()
            .withf(|key, state| key == "engine_state" && state.version == ENGINE_STATE_VERSION)
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_flush().times(1).returning(|| Ok(()));

        let engine = ScriptEngine::default();
        persist_engine_state(&engine, &repo, "engine_state").await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_propagates_errors() {
        let mut repo = MockStateRepository::new();
        repo.expect_save_state()
            .returning(|_, _| Err(PersistenceError::OperationFailed("disk full".into())));
        repo.expect_flush().never();

        let engine = ScriptEngine::default();
        assert!(persist_engine_state(&engine, &repo, "engine_state").await.is_err());
    }
}
