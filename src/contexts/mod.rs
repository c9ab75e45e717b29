//! Storage of named execution contexts.
//!
//! Contexts live in a concurrent map keyed by id. Callers only ever receive
//! owned snapshots; mutation happens through the manager.

mod seeds;

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use dashmap::DashMap;
pub use seeds::{DATA_VALIDATION_CONTEXT_ID, DEFAULT_CONTEXT_ID, DEVICE_MESSAGE_CONTEXT_ID, seed_contexts};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ContextUpdate, ExecutionContext, ScriptFunction};

/// Owns every execution context of an engine.
#[derive(Debug)]
pub struct ContextManager {
    contexts: DashMap<String, ExecutionContext>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    /// Creates a manager holding the seed contexts.
    pub fn new() -> Self {
        let contexts = DashMap::new();
        for context in seed_contexts() {
            contexts.insert(context.id.clone(), context);
        }
        Self { contexts }
    }

    /// Creates an empty manager.
    pub fn empty() -> Self {
        Self { contexts: DashMap::new() }
    }

    fn generate_id() -> String {
        format!("ctx_{}", Uuid::new_v4().simple())
    }

    /// Creates a context with a fresh id.
    pub fn create_context(
        &self,
        name: impl Into<String>,
        initial_variables: Option<BTreeMap<String, Value>>,
    ) -> ExecutionContext {
        let mut context = ExecutionContext::new(Self::generate_id(), name);
        context.variables = initial_variables.unwrap_or_default();
        self.contexts.insert(context.id.clone(), context.clone());
        tracing::debug!(id = %context.id, name = %context.name, "Context created");
        context
    }

    /// Applies a partial update. Returns false if the context does not exist.
    pub fn update_context(&self, id: &str, update: ContextUpdate) -> bool {
        let Some(mut context) = self.contexts.get_mut(id) else {
            return false;
        };
        if let Some(name) = update.name {
            context.name = name;
        }
        context.variables.extend(update.variables);
        context
            .functions
            .extend(update.functions.into_iter().map(|(name, function)| (name, Arc::new(function))));
        context.updated_at = Utc::now();
        true
    }

    /// Copies a context under a new id and name. Variables are deep copied,
    /// functions are shared.
    pub fn clone_context(&self, id: &str, new_name: impl Into<String>) -> Option<ExecutionContext> {
        let source = self.get_context(id)?;
        let now = Utc::now();
        let clone = ExecutionContext {
            id: Self::generate_id(),
            name: new_name.into(),
            created_at: now,
            updated_at: now,
            ..source
        };
        self.contexts.insert(clone.id.clone(), clone.clone());
        tracing::debug!(source = %id, id = %clone.id, "Context cloned");
        Some(clone)
    }

    /// Copies every variable and function of `source_id` into `target_id`,
    /// overwriting on collision. The source is left unchanged.
    pub fn merge_contexts(&self, source_id: &str, target_id: &str) -> bool {
        let Some(source) = self.get_context(source_id) else {
            return false;
        };
        let Some(mut target) = self.contexts.get_mut(target_id) else {
            return false;
        };
        target.variables.extend(source.variables);
        target.functions.extend(source.functions);
        target.updated_at = Utc::now();
        true
    }

    /// Adds or replaces a function.
    pub fn add_function(&self, id: &str, name: impl Into<String>, function: ScriptFunction) -> bool {
        let Some(mut context) = self.contexts.get_mut(id) else {
            return false;
        };
        context.functions.insert(name.into(), Arc::new(function));
        context.updated_at = Utc::now();
        true
    }

    /// Removes a function. Returns false if the context or function does
    /// not exist.
    pub fn remove_function(&self, id: &str, name: &str) -> bool {
        let Some(mut context) = self.contexts.get_mut(id) else {
            return false;
        };
        if context.functions.remove(name).is_none() {
            return false;
        }
        context.updated_at = Utc::now();
        true
    }

    /// A snapshot of the context.
    pub fn get_context(&self, id: &str) -> Option<ExecutionContext> {
        self.contexts.get(id).map(|entry| entry.value().clone())
    }

    /// Deletes a context. The default context cannot be deleted.
    pub fn delete_context(&self, id: &str) -> bool {
        if id == DEFAULT_CONTEXT_ID {
            tracing::warn!("Refusing to delete the default context");
            return false;
        }
        self.contexts.remove(id).is_some()
    }

    /// Snapshots of every context, oldest first.
    pub fn list_contexts(&self) -> Vec<ExecutionContext> {
        let mut contexts: Vec<_> = self.contexts.iter().map(|entry| entry.value().clone()).collect();
        contexts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        contexts
    }

    /// Inserts or replaces a context as is, keeping its id.
    pub fn insert_context(&self, context: ExecutionContext) {
        self.contexts.insert(context.id.clone(), context);
    }

    /// Number of contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True if there are no contexts.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
