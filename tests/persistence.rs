//! Integration tests for the persistence layer

use script_engine::{
    engine::ScriptEngine,
    models::{NewTemplate, ParameterType, TemplateCategory, TemplateParameter},
    persistence::{
        PersistenceError, SqliteStateRepository, StateRepository, persist_engine_state, restore_engine_state,
    },
};
use serde_json::json;
use tempfile::tempdir;

async fn setup_db(url: &str) -> SqliteStateRepository {
    let repo = SqliteStateRepository::new(url).await.expect("Failed to set up database");
    repo.run_migrations().await.expect("Failed to run migrations");
    repo
}

fn triple_template() -> NewTemplate {
    NewTemplate {
        name: "Triple".to_string(),
        category: TemplateCategory::Utility,
        description: "Multiplies by three".to_string(),
        code: "{{n}} * 3".to_string(),
        parameters: vec![TemplateParameter::new("n", ParameterType::Number).required()],
    }
}

#[tokio::test]
async fn engine_state_survives_a_restart() {
    let dir = tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("state.db").display());

    let template_id;
    let context_id;
    {
        let repo = setup_db(&url).await;
        let engine = ScriptEngine::default();
        engine.execute("1 + 1", None).await.unwrap();
        template_id = engine.templates().create_template(triple_template()).unwrap().id;
        context_id = engine
            .contexts()
            .create_context("persisted", Some([("factor".to_string(), json!(7))].into()))
            .id;

        persist_engine_state(&engine, &repo, "engine_state").await.unwrap();
        repo.close().await;
    }

    let repo = setup_db(&url).await;
    let engine = ScriptEngine::default();
    assert!(restore_engine_state(&engine, &repo, "engine_state").await.unwrap());

    assert_eq!(engine.get_execution_stats().total_executions, 1);
    let result = engine
        .execute_template(&template_id, &json!({"n": 4}).as_object().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(result.data, json!(12));
    let result = engine.execute_in_context("factor * 6", &context_id).await.unwrap();
    assert_eq!(result.data, json!(42));
}

#[tokio::test]
async fn restore_without_state_leaves_engine_untouched() {
    let repo = setup_db("sqlite::memory:").await;
    let engine = ScriptEngine::default();

    assert!(!restore_engine_state(&engine, &repo, "engine_state").await.unwrap());
    let state = engine.export_state();
    assert!(state.templates.is_empty());
    assert_eq!(state.stats.total_executions, 0);
    assert_eq!(state.contexts.len(), 2);
}

#[tokio::test]
async fn states_are_kept_per_key() {
    let repo = setup_db("sqlite::memory:").await;
    let first = ScriptEngine::default();
    first.contexts().create_context("first", None);
    let second = ScriptEngine::default();
    second.contexts().create_context("second", None);

    repo.save_state("a", &first.export_state()).await.unwrap();
    repo.save_state("b", &second.export_state()).await.unwrap();

    let a = repo.load_state("a").await.unwrap().unwrap();
    let b = repo.load_state("b").await.unwrap().unwrap();
    assert!(a.contexts.iter().any(|c| c.name == "first"));
    assert!(b.contexts.iter().any(|c| c.name == "second"));
    assert!(repo.delete_state("a").await.unwrap());
    assert!(repo.load_state("a").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_migrations_are_reported() {
    let repo = SqliteStateRepository::new("sqlite::memory:").await.unwrap();
    let engine = ScriptEngine::default();

    let err = persist_engine_state(&engine, &repo, "engine_state").await.unwrap_err();
    assert!(matches!(err, PersistenceError::OperationFailed(_)));
}
