//! Configuration module for the script engine.

mod app_config;
mod engine;
mod helpers;
mod rhai;
mod sandbox;
mod server;

pub use app_config::AppConfig;
pub use engine::{AdmissionPolicy, EngineConfig};
pub use helpers::{deserialize_duration_from_ms, serialize_duration_to_ms};
pub use rhai::RhaiConfig;
pub use sandbox::{SandboxConfig, SecurityPredicate};
pub use server::ServerConfig;
