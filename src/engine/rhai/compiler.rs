//! Syntax pre-checking with a result cache.
//!
//! Polling dashboards submit the same scripts over and over, so parse results
//! are cached by the SHA-256 of the source.

use dashmap::DashMap;
use rhai::Engine;
use sha2::{Digest, Sha256};

use crate::{config::RhaiConfig, models::SyntaxCheck};

/// A type alias for the hash of a Rhai script.
type ScriptHash = [u8; 32];

/// Parses scripts without running them and remembers the outcome.
#[derive(Debug)]
pub struct SyntaxValidator {
    /// Parser configured without any disabled symbols, so a script that
    /// mentions a dangerous primitive still parses and is rejected by
    /// security screening instead.
    engine: Engine,
    cache: DashMap<ScriptHash, SyntaxCheck>,
    capacity: usize,
}

impl SyntaxValidator {
    /// Creates a validator whose cache holds at most `capacity` entries.
    pub fn new(rhai_config: &RhaiConfig, capacity: usize) -> Self {
        let mut engine = Engine::new_raw();
        engine.set_max_expr_depths(rhai_config.max_expr_depth, rhai_config.max_expr_depth);
        Self { engine, cache: DashMap::new(), capacity }
    }

    /// A helper function to compute the hash of a script.
    fn hash_script(script: &str) -> ScriptHash {
        let mut hasher = Sha256::new();
        hasher.update(script.as_bytes());
        hasher.finalize().into()
    }

    /// Checks whether `code` parses.
    pub fn validate(&self, code: &str) -> SyntaxCheck {
        let key = Self::hash_script(code);

        if let Some(cached) = self.cache.get(&key) {
            return cached.value().clone();
        }

        let check = match self.engine.compile(code) {
            Ok(_) => SyntaxCheck { valid: true, error: None },
            Err(err) => SyntaxCheck { valid: false, error: Some(err.to_string()) },
        };

        if self.capacity > 0 {
            if self.cache.len() >= self.capacity {
                tracing::debug!(entries = self.cache.len(), "Syntax cache full, clearing");
                self.cache.clear();
            }
            self.cache.insert(key, check.clone());
        }

        check
    }

    /// Number of cached results.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
