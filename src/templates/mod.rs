//! Template catalogue and code generation.

mod builtin;
pub mod substitution;
pub mod validation;

use std::collections::{BTreeMap, BTreeSet};

pub use builtin::system_templates;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;
pub use validation::ParameterValidationError;

use crate::models::{NewTemplate, ScriptTemplate, TemplateCategory, TemplateParameter, TemplateUpdate};

/// Errors raised by the template manager.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template with the id exists.
    #[error("Template '{0}' not found")]
    NotFound(String),

    /// System templates cannot be changed.
    #[error("Template '{0}' is a system template and is read-only")]
    ReadOnly(String),

    /// The template definition is inconsistent.
    #[error("Invalid template: {0}")]
    Invalid(String),

    /// A parameter value failed validation.
    #[error(transparent)]
    Parameter(#[from] ParameterValidationError),
}

/// Checks that a definition is usable: it has a name and code, parameter
/// names are unique, placeholders and parameters match one to one, patterns
/// compile and defaults satisfy their own constraints.
pub fn validate_definition(name: &str, code: &str, parameters: &[TemplateParameter]) -> Result<(), TemplateError> {
    if name.trim().is_empty() {
        return Err(TemplateError::Invalid("name must not be empty".into()));
    }
    if code.trim().is_empty() {
        return Err(TemplateError::Invalid("code must not be empty".into()));
    }

    let mut declared = BTreeSet::new();
    for parameter in parameters {
        if !declared.insert(parameter.name.clone()) {
            return Err(TemplateError::Invalid(format!("duplicate parameter '{}'", parameter.name)));
        }
        if let Some(pattern) = parameter.validation.as_ref().and_then(|v| v.pattern.as_deref()) {
            validation::compile_pattern(&parameter.name, pattern)
                .map_err(|err| TemplateError::Invalid(err.to_string()))?;
        }
        if let Some(default) = parameter.default_value.as_ref().filter(|v| !v.is_null()) {
            validation::validate_value(parameter, default).map_err(|err| {
                TemplateError::Invalid(format!("default value rejected: {err}"))
            })?;
        }
    }

    let used = substitution::placeholders(code);
    if let Some(undeclared) = used.difference(&declared).next() {
        return Err(TemplateError::Invalid(format!("placeholder '{undeclared}' has no parameter")));
    }
    if let Some(unused) = declared.difference(&used).next() {
        return Err(TemplateError::Invalid(format!("parameter '{unused}' is not used in the code")));
    }
    Ok(())
}

/// Owns system and user templates.
#[derive(Debug)]
pub struct TemplateManager {
    templates: DashMap<String, ScriptTemplate>,
}

impl Default for TemplateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateManager {
    /// Creates a manager holding the system catalogue.
    pub fn new() -> Self {
        let templates = DashMap::new();
        for template in system_templates() {
            templates.insert(template.id.clone(), template);
        }
        Self { templates }
    }

    fn sorted(mut templates: Vec<ScriptTemplate>) -> Vec<ScriptTemplate> {
        templates.sort_by(|a, b| {
            b.is_system
                .cmp(&a.is_system)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        templates
    }

    /// Every template, system templates first.
    pub fn get_all_templates(&self) -> Vec<ScriptTemplate> {
        Self::sorted(self.templates.iter().map(|entry| entry.value().clone()).collect())
    }

    /// Templates in `category`.
    pub fn get_templates_by_category(&self, category: TemplateCategory) -> Vec<ScriptTemplate> {
        Self::sorted(
            self.templates
                .iter()
                .filter(|entry| entry.category == category)
                .map(|entry| entry.value().clone())
                .collect(),
        )
    }

    /// A template by id.
    pub fn get_template(&self, id: &str) -> Option<ScriptTemplate> {
        self.templates.get(id).map(|entry| entry.value().clone())
    }

    /// User templates only.
    pub fn user_templates(&self) -> Vec<ScriptTemplate> {
        Self::sorted(
            self.templates
                .iter()
                .filter(|entry| !entry.is_system)
                .map(|entry| entry.value().clone())
                .collect(),
        )
    }

    /// Stores a new user template under a fresh id.
    pub fn create_template(&self, new: NewTemplate) -> Result<ScriptTemplate, TemplateError> {
        validate_definition(&new.name, &new.code, &new.parameters)?;
        let now = Utc::now();
        let template = ScriptTemplate {
            id: format!("tpl_{}", Uuid::new_v4().simple()),
            name: new.name,
            category: new.category,
            description: new.description,
            code: new.code,
            parameters: new.parameters,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        self.templates.insert(template.id.clone(), template.clone());
        tracing::info!(id = %template.id, name = %template.name, "Template created");
        Ok(template)
    }

    /// Applies `update` to a user template. Returns `Ok(false)` if the
    /// template is missing or a system template.
    pub fn update_template(&self, id: &str, update: TemplateUpdate) -> Result<bool, TemplateError> {
        let Some(mut entry) = self.templates.get_mut(id) else {
            return Ok(false);
        };
        if entry.is_system {
            tracing::warn!(id = %id, "Refusing to update a system template");
            return Ok(false);
        }

        let mut updated = entry.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(category) = update.category {
            updated.category = category;
        }
        if let Some(description) = update.description {
            updated.description = description;
        }
        if let Some(code) = update.code {
            updated.code = code;
        }
        if let Some(parameters) = update.parameters {
            updated.parameters = parameters;
        }
        validate_definition(&updated.name, &updated.code, &updated.parameters)?;

        updated.updated_at = Utc::now();
        *entry = updated;
        Ok(true)
    }

    /// Deletes a user template. System templates are never deleted.
    pub fn delete_template(&self, id: &str) -> bool {
        self.templates.remove_if(id, |_, template| !template.is_system).is_some()
    }

    /// Validates `parameters` against the template and returns the code with
    /// every placeholder substituted.
    pub fn generate_code(&self, template_id: &str, parameters: &Map<String, Value>) -> Result<String, TemplateError> {
        let template = self.get_template(template_id).ok_or_else(|| TemplateError::NotFound(template_id.into()))?;
        let resolved = validation::resolve_parameters(&template.parameters, parameters)?;

        let literals: BTreeMap<String, String> = template
            .parameters
            .iter()
            .filter_map(|parameter| {
                resolved
                    .get(&parameter.name)
                    .map(|value| (parameter.name.clone(), substitution::to_script_literal(value, parameter.param_type)))
            })
            .collect();

        Ok(substitution::substitute(&template.code, &literals))
    }

    /// Inserts an imported user template, keeping its id and timestamps.
    pub fn import_template(&self, template: ScriptTemplate) -> Result<(), TemplateError> {
        if let Some(existing) = self.templates.get(&template.id) {
            if existing.is_system {
                return Err(TemplateError::ReadOnly(template.id.clone()));
            }
        }
        if template.is_system {
            return Err(TemplateError::Invalid(format!("'{}' is marked as a system template", template.id)));
        }
        validate_definition(&template.name, &template.code, &template.parameters)?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// True if `id` names a system template.
    pub fn is_system_template(&self, id: &str) -> bool {
        self.templates.get(id).is_some_and(|entry| entry.is_system)
    }
}
