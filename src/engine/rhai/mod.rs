//! Rhai integration: engine construction, syntax checking, AST analysis and
//! value conversions.

pub mod ast_analysis;
pub mod compiler;
pub mod conversions;
mod create_engine;

pub use compiler::SyntaxValidator;
pub use create_engine::create_engine;
