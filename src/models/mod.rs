//! This module contains the data models shared by the engine, its managers and
//! the HTTP interface.

pub mod context;
pub mod execution;
pub mod script;
pub mod state;
pub mod template;

pub use context::{ContextUpdate, ExecutionContext, ScriptFunction};
pub use execution::{
    ErrorKind, ExecutionError, ExecutionRequest, ExecutionResult, ExecutionStats, SecurityReport,
    StreamEvent, SyntaxCheck,
};
pub use script::ScriptConfig;
pub use state::{ENGINE_STATE_VERSION, EngineState};
pub use template::{
    NewTemplate, ParameterType, ParameterValidation, ScriptTemplate, TemplateCategory,
    TemplateParameter, TemplateUpdate,
};
