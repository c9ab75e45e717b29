//! Deadline and cancellation shared with a running evaluation.

use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

/// Deadline plus cancellation flag shared between the caller and a running
/// evaluation. The evaluation polls it at safe points; whichever of the
/// deadline or an explicit cancel comes first stops it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    deadline: OnceLock<Instant>,
}

impl CancellationToken {
    /// Creates a token with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline. Only the first call has an effect.
    pub fn arm(&self, deadline: Instant) {
        let _ = self.inner.deadline.set(deadline);
    }

    /// Cancels the evaluation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.inner.deadline.get().is_some_and(|deadline| Instant::now() >= *deadline)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_past_deadline_cancels() {
        let token = CancellationToken::new();
        token.arm(Instant::now() - Duration::from_millis(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_only_first_deadline_counts() {
        let token = CancellationToken::new();
        token.arm(Instant::now() + Duration::from_secs(60));
        token.arm(Instant::now() - Duration::from_secs(1));
        assert!(!token.is_cancelled());
    }
}
