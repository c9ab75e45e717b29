//! The serializable engine state used for persistence and migration.

use serde::{Deserialize, Serialize};

use super::{ExecutionContext, ExecutionStats, ScriptTemplate};

/// Current version of the [`EngineState`] document.
pub const ENGINE_STATE_VERSION: u32 = 1;

/// Aggregate statistics, user templates and every context except `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Document version.
    pub version: u32,
    /// Statistics at export time.
    pub stats: ExecutionStats,
    /// User-defined templates.
    #[serde(default)]
    pub templates: Vec<ScriptTemplate>,
    /// Contexts other than `default`.
    #[serde(default)]
    pub contexts: Vec<ExecutionContext>,
}
