#![warn(missing_docs)]
//! A sandboxed, template-driven script engine. Scripts are Rhai programs run
//! in fresh, capability-limited sandboxes with timeouts, named contexts and a
//! catalogue of parameterized templates.

pub mod cmd;
pub mod config;
pub mod contexts;
pub mod engine;
pub mod http_server;
pub mod models;
pub mod persistence;
pub mod templates;
