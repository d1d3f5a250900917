//! Caller-owned cancellation and deadline handle.
//!
//! # Design
//! Every network call and every backoff sleep takes a `&Context`. A context
//! carries a shared cancellation flag plus an optional deadline. Derived
//! contexts (`with_timeout`, `with_deadline`) share the parent's flag, so
//! cancelling the parent cancels the child. Cancellation is cooperative:
//! long waits race against `done()` inside `tokio::select!`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Execution context passed through every call chain.
///
/// Clones observe the same cancellation state.
#[derive(Debug, Clone)]
pub struct Context {
    state: Option<Arc<CancelState>>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            state: None,
            deadline: None,
        }
    }

    /// A cancellable context with no deadline.
    pub fn new() -> Self {
        Self {
            state: Some(Arc::new(CancelState::default())),
            deadline: None,
        }
    }

    /// Derive a context that expires after `timeout`.
    ///
    /// A timeout too large to represent as an instant adds no deadline; the
    /// parent's deadline, if any, still applies.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => Self {
                state: Some(self.shared_state()),
                deadline: self.deadline,
            },
        }
    }

    /// Derive a context that expires at `deadline`, or at the parent's
    /// deadline if that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            state: Some(self.shared_state()),
            deadline: Some(deadline),
        }
    }

    fn shared_state(&self) -> Arc<CancelState> {
        self.state
            .clone()
            .unwrap_or_else(|| Arc::new(CancelState::default()))
    }

    /// Cancel this context and every context sharing its state.
    ///
    /// A no-op on `background()`.
    pub fn cancel(&self) {
        if let Some(state) = &self.state {
            state.cancelled.store(true, Ordering::SeqCst);
            state.notify.notify_waiters();
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn is_cancelled(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.cancelled.load(Ordering::SeqCst))
    }

    /// The reason this context is done, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Check the context and return its error if done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for `background()`.
    pub async fn done(&self) -> ContextError {
        let cancelled = async {
            match &self.state {
                Some(state) => loop {
                    // Register before checking the flag so a concurrent
                    // `cancel()` cannot slip between the two.
                    let notified = state.notify.notified();
                    if state.cancelled.load(Ordering::SeqCst) {
                        return;
                    }
                    notified.await;
                },
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => ContextError::Cancelled,
            _ = expired => self.err().unwrap_or(ContextError::DeadlineExceeded),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
