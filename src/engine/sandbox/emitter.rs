//! The in-script `emit` function used by streaming executions.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use rhai::{Dynamic, Engine};
use tokio::sync::mpsc;

use crate::{engine::rhai::conversions::dynamic_to_json, models::StreamEvent};

/// Destination of the in-script `emit(value)` function.
///
/// A disabled emitter discards values, so scripts written for streaming also
/// run as plain executions. Once the receiving side is dropped, further
/// emits are discarded too.
///
/// The channel is bounded. A full channel blocks the evaluation thread until
/// the subscriber catches up, so `emit` must only run off the async runtime.
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    tx: Option<mpsc::Sender<StreamEvent>>,
    sequence: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl Emitter {
    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// An emitter delivering partial events to `tx`.
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx: Some(tx), ..Default::default() }
    }

    /// Sends one partial event. Returns false if the value was discarded.
    pub fn emit(&self, value: &Dynamic) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel);
        let event = StreamEvent::Partial { sequence, data: dynamic_to_json(value) };
        if tx.blocking_send(event).is_err() {
            self.closed.store(true, Ordering::Release);
            tracing::debug!("Stream subscriber dropped, discarding further partial results");
            return false;
        }
        true
    }

    /// Number of partial events delivered or attempted.
    pub fn emitted(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Registers the global `emit` function on `engine`.
    pub(crate) fn register(&self, engine: &mut Engine) {
        let emitter = self.clone();
        engine.register_fn("emit", move |value: Dynamic| {
            emitter.emit(&value);
        });
    }
}
