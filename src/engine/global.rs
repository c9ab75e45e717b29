//! The process-wide default engine.
//!
//! A thin wrapper over an explicitly constructed [`ScriptEngine`] for callers
//! that want a shared instance without threading one through.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::ScriptEngine;

static DEFAULT_ENGINE: ArcSwapOption<ScriptEngine> = ArcSwapOption::const_empty();

/// Installs `engine` as the default unless one is already installed, and
/// returns whichever engine is installed afterwards.
pub fn init(engine: ScriptEngine) -> ScriptEngine {
    init_with(|| engine)
}

fn init_with(make: impl FnOnce() -> ScriptEngine) -> ScriptEngine {
    if let Some(existing) = DEFAULT_ENGINE.load_full() {
        return (*existing).clone();
    }
    let candidate = Arc::new(make());
    let previous = DEFAULT_ENGINE.compare_and_swap(&None::<Arc<ScriptEngine>>, Some(candidate.clone()));
    match &*previous {
        Some(existing) => (**existing).clone(),
        None => {
            tracing::debug!("Default script engine installed");
            (*candidate).clone()
        }
    }
}

/// The default engine, creating one with default settings if needed.
pub fn get() -> ScriptEngine {
    init_with(ScriptEngine::default)
}

/// The default engine, if one is installed.
pub fn try_get() -> Option<ScriptEngine> {
    DEFAULT_ENGINE.load_full().map(|engine| (*engine).clone())
}

/// Removes the default engine. Clones already handed out keep working.
/// Returns false if none was installed.
pub fn dispose() -> bool {
    DEFAULT_ENGINE.swap(None).is_some()
}
