//! The closed registry of capabilities a sandbox can expose.
//!
//! Every capability is a small Rhai custom type. Installing one registers its
//! methods on the sandbox's engine and binds one instance into the scope
//! under a fixed name; nothing reaches a script any other way.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use rhai::{Engine, EvalAltResult, Scope};
use serde::{Deserialize, Serialize};

use super::{
    CancellationToken,
    builtins::{self, ConsoleApi, DateApi, JsonApi, MathApi, TimersApi},
    utilities::{self, DataApi, RandomApi, TimeApi},
};

/// Result type used by capability methods.
pub(crate) type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Upper bound on captured log lines per execution.
pub const MAX_LOG_LINES: usize = 1_000;

/// A named piece of functionality that can be bound into a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `console.log/info/warn/error/debug`, captured into the result logs.
    Console,
    /// `Math` numeric helpers.
    Math,
    /// `JSON.stringify/parse`.
    Json,
    /// `Date.now/iso`.
    Date,
    /// `timers.sleep`, cooperative with the execution deadline.
    Timers,
    /// `random` data generators.
    Random,
    /// `data` structural helpers.
    Data,
    /// `time` calendar helpers.
    Time,
}

impl Capability {
    /// Every capability, in binding order.
    pub const ALL: [Capability; 8] = [
        Capability::Console,
        Capability::Math,
        Capability::Json,
        Capability::Date,
        Capability::Timers,
        Capability::Random,
        Capability::Data,
        Capability::Time,
    ];

    /// The configuration name of the capability.
    pub fn tag(self) -> &'static str {
        match self {
            Capability::Console => "console",
            Capability::Math => "math",
            Capability::Json => "json",
            Capability::Date => "date",
            Capability::Timers => "timers",
            Capability::Random => "random",
            Capability::Data => "data",
            Capability::Time => "time",
        }
    }

    /// The name the capability is bound under inside scripts.
    pub fn binding_name(self) -> &'static str {
        match self {
            Capability::Console => "console",
            Capability::Math => "Math",
            Capability::Json => "JSON",
            Capability::Date => "Date",
            Capability::Timers => "timers",
            Capability::Random => "random",
            Capability::Data => "data",
            Capability::Time => "time",
        }
    }

    /// Registers the capability's methods on `engine` and binds its object
    /// into `scope`. Frozen bindings are scope constants, so scripts cannot
    /// replace them.
    pub fn install(self, engine: &mut Engine, scope: &mut Scope, env: &CapabilityEnv, frozen: bool) {
        let name = self.binding_name();
        match self {
            Capability::Console => {
                builtins::register_console(engine);
                bind(scope, name, ConsoleApi::new(env.logs.clone()), frozen);
            }
            Capability::Math => {
                builtins::register_math(engine);
                bind(scope, name, MathApi, frozen);
            }
            Capability::Json => {
                builtins::register_json(engine);
                bind(scope, name, JsonApi, frozen);
            }
            Capability::Date => {
                builtins::register_date(engine);
                bind(scope, name, DateApi, frozen);
            }
            Capability::Timers => {
                builtins::register_timers(engine);
                bind(scope, name, TimersApi::new(env.token.clone()), frozen);
            }
            Capability::Random => {
                utilities::register_random(engine);
                bind(scope, name, RandomApi, frozen);
            }
            Capability::Data => {
                utilities::register_data(engine);
                bind(scope, name, DataApi, frozen);
            }
            Capability::Time => {
                utilities::register_time(engine);
                bind(scope, name, TimeApi, frozen);
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn bind<T: Clone + Send + Sync + 'static>(
    scope: &mut Scope,
    name: &'static str,
    value: T,
    frozen: bool,
) {
    if frozen {
        scope.push_constant(name, value);
    } else {
        scope.push(name, value);
    }
}

/// Per-execution resources capabilities are wired to.
#[derive(Debug, Clone, Default)]
pub struct CapabilityEnv {
    /// Destination of console output.
    pub logs: LogSink,
    /// Deadline and cancellation shared with the caller.
    pub token: CancellationToken,
}

/// Ordered, bounded buffer of captured output lines.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line. Past [`MAX_LOG_LINES`] a single truncation marker is
    /// recorded and further lines are dropped.
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() < MAX_LOG_LINES {
            lines.push(line.into());
        } else if lines.len() == MAX_LOG_LINES {
            lines.push("... log output truncated".to_string());
        }
    }

    /// Copies out the captured lines.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
