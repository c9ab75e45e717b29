//! Language-level capabilities: `console`, `Math`, `JSON`, `Date` and
//! `timers`.
//!
//! Methods take the capability object by value so they stay callable when
//! the object is bound as a constant.

use std::{thread, time::Duration};

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position};

use super::{CancellationToken, LogSink, capabilities::RhaiResult};
use crate::engine::rhai::conversions::{
    display_dynamic, dynamic_to_f64, dynamic_to_json, json_to_dynamic,
};

/// Granularity at which `timers.sleep` re-checks cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Script-facing `console` object.
#[derive(Debug, Clone)]
pub struct ConsoleApi {
    sink: LogSink,
}

impl ConsoleApi {
    /// Creates a console writing into `sink`.
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    fn write(&self, level: Option<&str>, args: &[Dynamic]) {
        let message = args.iter().map(display_dynamic).collect::<Vec<_>>().join(" ");
        match level {
            Some(level) => self.sink.push(format!("[{level}] {message}")),
            None => self.sink.push(message),
        }
    }
}

pub(crate) fn register_console(engine: &mut Engine) {
    engine.register_type_with_name::<ConsoleApi>("Console");

    let levels: [(&str, Option<&'static str>); 5] = [
        ("log", None),
        ("info", None),
        ("warn", Some("warn")),
        ("error", Some("error")),
        ("debug", Some("debug")),
    ];
    for (name, level) in levels {
        engine.register_fn(name, move |console: ConsoleApi, a: Dynamic| {
            console.write(level, &[a]);
        });
        engine.register_fn(name, move |console: ConsoleApi, a: Dynamic, b: Dynamic| {
            console.write(level, &[a, b]);
        });
        engine.register_fn(name, move |console: ConsoleApi, a: Dynamic, b: Dynamic, c: Dynamic| {
            console.write(level, &[a, b, c]);
        });
    }
}

/// Script-facing `Math` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathApi;

fn keep_numeric_type(value: &Dynamic, f: impl Fn(f64) -> f64) -> RhaiResult<Dynamic> {
    if let Ok(i) = value.as_int() {
        Ok(Dynamic::from_int(f(i as f64) as i64))
    } else {
        Ok(Dynamic::from_float(f(dynamic_to_f64(value)?)))
    }
}

pub(crate) fn register_math(engine: &mut Engine) {
    engine
        .register_type_with_name::<MathApi>("Math")
        .register_fn("abs", |_: MathApi, x: Dynamic| keep_numeric_type(&x, f64::abs))
        .register_fn("floor", |_: MathApi, x: Dynamic| -> RhaiResult<i64> {
            Ok(dynamic_to_f64(&x)?.floor() as i64)
        })
        .register_fn("ceil", |_: MathApi, x: Dynamic| -> RhaiResult<i64> {
            Ok(dynamic_to_f64(&x)?.ceil() as i64)
        })
        .register_fn("round", |_: MathApi, x: Dynamic| -> RhaiResult<i64> {
            Ok(dynamic_to_f64(&x)?.round() as i64)
        })
        .register_fn("trunc", |_: MathApi, x: Dynamic| -> RhaiResult<i64> {
            Ok(dynamic_to_f64(&x)?.trunc() as i64)
        })
        .register_fn("sqrt", |_: MathApi, x: Dynamic| -> RhaiResult<f64> {
            Ok(dynamic_to_f64(&x)?.sqrt())
        })
        .register_fn("pow", |_: MathApi, x: Dynamic, y: Dynamic| -> RhaiResult<f64> {
            Ok(dynamic_to_f64(&x)?.powf(dynamic_to_f64(&y)?))
        })
        .register_fn("min", |_: MathApi, x: Dynamic, y: Dynamic| -> RhaiResult<Dynamic> {
            Ok(if dynamic_to_f64(&y)? < dynamic_to_f64(&x)? { y } else { x })
        })
        .register_fn("max", |_: MathApi, x: Dynamic, y: Dynamic| -> RhaiResult<Dynamic> {
            Ok(if dynamic_to_f64(&y)? > dynamic_to_f64(&x)? { y } else { x })
        })
        .register_fn("random", |_: MathApi| rand::thread_rng().r#gen::<f64>())
        .register_fn("pi", |_: MathApi| std::f64::consts::PI);
}

/// Script-facing `JSON` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApi;

pub(crate) fn register_json(engine: &mut Engine) {
    engine
        .register_type_with_name::<JsonApi>("JSON")
        .register_fn("stringify", |_: JsonApi, value: Dynamic| -> RhaiResult<String> {
            serde_json::to_string(&dynamic_to_json(&value))
                .map_err(|e| format!("JSON.stringify failed: {e}").into())
        })
        .register_fn("parse", |_: JsonApi, text: ImmutableString| -> RhaiResult<Dynamic> {
            serde_json::from_str::<serde_json::Value>(&text)
                .map(|value| json_to_dynamic(&value))
                .map_err(|e| format!("JSON.parse failed: {e}").into())
        });
}

/// Script-facing `Date` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateApi;

pub(crate) fn register_date(engine: &mut Engine) {
    engine
        .register_type_with_name::<DateApi>("Date")
        .register_fn("now", |_: DateApi| Utc::now().timestamp_millis())
        .register_fn("iso", |_: DateApi| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
}

/// Script-facing `timers` object.
#[derive(Debug, Clone)]
pub struct TimersApi {
    token: CancellationToken,
}

impl TimersApi {
    /// Creates a timer bound to the execution's cancellation token.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Sleeps in short slices so a deadline or cancel ends the wait early.
    fn sleep(&self, millis: i64) -> RhaiResult<()> {
        if millis < 0 {
            return Err("timers.sleep expects a non-negative duration".into());
        }
        let mut remaining = Duration::from_millis(millis as u64);
        while !remaining.is_zero() {
            if self.token.is_cancelled() {
                return Err(Box::new(EvalAltResult::ErrorTerminated(
                    "execution cancelled".into(),
                    Position::NONE,
                )));
            }
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
        Ok(())
    }
}

pub(crate) fn register_timers(engine: &mut Engine) {
    engine
        .register_type_with_name::<TimersApi>("Timers")
        .register_fn("sleep", |timers: TimersApi, millis: i64| timers.sleep(millis));
}
