//! The script engine: sandboxed evaluation, execution bookkeeping and the
//! facade applications talk to.

pub mod executor;
pub mod facade;
pub mod global;
pub mod rhai;
pub mod sandbox;
pub mod stats;

pub use executor::ScriptExecutor;
pub use facade::{EngineError, ExecutionStream, ScriptEngine, StateImportError};
pub use sandbox::{Capability, Sandbox, SandboxError};
