#![forbid(unsafe_code)]

//! Cancellation tokens handed to getters and setters.
//!
//! Every cell operation owns a [`CancelToken`]. When a newer operation
//! supersedes it, the token is cancelled: registered hooks run, pending
//! [`CancelToken::cancelled`] futures complete and [`CancelToken::check`]
//! starts returning [`Cancelled`].
//!
//! Cancellation is advisory. The cell never aborts a running getter or
//! setter; it only stops listening to its result. Callbacks that talk to a
//! slow backend should observe the token and bail out early.
//!
//! # Design
//!
//! `CancelToken` is cheaply cloneable (`Rc` inside) and read-only. The owner
//! of the operation holds the companion [`CancelHandle`] to trigger
//! cancellation. Dropping the handle does **not** cancel the token.
//!
//! # Example
//!
//! ```
//! use asyncable::cancel::CancelToken;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let (token, handle) = CancelToken::new();
//! let fired = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&fired);
//! token.on_cancel(move || flag.set(true));
//!
//! handle.cancel();
//! assert!(token.is_cancelled());
//! assert!(fired.get());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};

use tracing::debug;

use crate::error::Cancelled;

// ─── Token ID generation ─────────────────────────────────────────────────────

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

fn next_token_id() -> u64 {
    NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Metrics counters ────────────────────────────────────────────────────────

/// Total number of token cancellations observed.
static CANCELLATIONS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Read the total cancellation count (for diagnostics).
#[must_use]
pub fn cancellations_total() -> u64 {
    CANCELLATIONS_TOTAL.load(Ordering::Relaxed)
}

// ─── Inner shared state ──────────────────────────────────────────────────────

struct TokenInner {
    id: u64,
    cancelled: Cell<bool>,
    hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
    wakers: RefCell<Vec<Waker>>,
}

// ─── CancelToken ─────────────────────────────────────────────────────────────

/// Read side of a cancellation signal.
///
/// Check `is_cancelled()` at natural yield points, register a hook with
/// [`on_cancel`](Self::on_cancel), or race work against
/// [`cancelled`](Self::cancelled).
#[derive(Clone)]
pub struct CancelToken {
    inner: Rc<TokenInner>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("id", &self.inner.id)
            .field("cancelled", &self.inner.cancelled.get())
            .finish()
    }
}

impl CancelToken {
    /// Create a fresh, live token together with its controller.
    #[must_use]
    pub fn new() -> (Self, CancelHandle) {
        let inner = Rc::new(TokenInner {
            id: next_token_id(),
            cancelled: Cell::new(false),
            hooks: RefCell::new(Vec::new()),
            wakers: RefCell::new(Vec::new()),
        });
        let token = Self {
            inner: Rc::clone(&inner),
        };
        (token, CancelHandle { inner })
    }

    /// Unique identifier for this token (for logging).
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Return `Err` once the token has been cancelled.
    ///
    /// ```ignore
    /// token.check()?;
    /// // ... continue work ...
    /// ```
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Register a hook that runs once when the token is cancelled.
    ///
    /// If the token is already cancelled the hook runs immediately.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            hook();
            return;
        }
        self.inner.hooks.borrow_mut().push(Box::new(hook));
    }

    /// A future that completes when the token is cancelled.
    #[must_use]
    pub fn cancelled(&self) -> WaitCancelled {
        WaitCancelled {
            inner: Rc::clone(&self.inner),
        }
    }
}

// ─── CancelHandle ────────────────────────────────────────────────────────────

/// Control side of a [`CancelToken`].
pub struct CancelHandle {
    inner: Rc<TokenInner>,
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &self.inner.id)
            .field("cancelled", &self.inner.cancelled.get())
            .finish()
    }
}

impl CancelHandle {
    /// Cancel the associated token.
    ///
    /// Hooks run in registration order, after the flag is set, and with no
    /// internal borrow held, so a hook may freely inspect the token.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        CANCELLATIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
        debug!(token_id = self.inner.id, "cancel.token.cancelled");

        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
        let wakers = std::mem::take(&mut *self.inner.wakers.borrow_mut());
        for waker in wakers {
            waker.wake();
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// A token observing this handle.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            inner: Rc::clone(&self.inner),
        }
    }
}

// ─── WaitCancelled ───────────────────────────────────────────────────────────

/// Future returned by [`CancelToken::cancelled`].
#[must_use = "futures do nothing unless polled"]
pub struct WaitCancelled {
    inner: Rc<TokenInner>,
}

impl Future for WaitCancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.inner.cancelled.get() {
            return Poll::Ready(());
        }
        let mut wakers = self.inner.wakers.borrow_mut();
        if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn fresh_token_is_live() {
        let (token, handle) = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!handle.is_cancelled());
        assert_eq!(token.check(), Ok(()));
    }

    #[test]
    fn cancel_propagates_to_clones() {
        let (token, handle) = CancelToken::new();
        let other = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        assert_eq!(other.check(), Err(Cancelled));
    }

    #[test]
    fn hooks_run_once_in_order() {
        let (token, handle) = CancelToken::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            token.on_cancel(move || log.borrow_mut().push(i));
        }
        handle.cancel();
        handle.cancel();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn hook_after_cancel_runs_immediately() {
        let (token, handle) = CancelToken::new();
        handle.cancel();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        token.on_cancel(move || flag.set(true));
        assert!(fired.get());
    }

    #[test]
    fn hook_may_inspect_token() {
        let (token, handle) = CancelToken::new();
        let seen = Rc::new(Cell::new(false));
        let seen_in_hook = Rc::clone(&seen);
        let observed = token.clone();
        token.on_cancel(move || seen_in_hook.set(observed.is_cancelled()));
        handle.cancel();
        assert!(seen.get());
    }

    #[test]
    fn cancelled_future_completes_after_cancel() {
        let (token, handle) = CancelToken::new();
        let mut wait = token.cancelled();
        assert!((&mut wait).now_or_never().is_none());
        handle.cancel();
        assert!(wait.now_or_never().is_some());
    }

    #[test]
    fn token_ids_are_unique() {
        let (a, _) = CancelToken::new();
        let (b, _) = CancelToken::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn handle_token_observes_same_state() {
        let (_token, handle) = CancelToken::new();
        let token = handle.token();
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancellation_counter_increments_once() {
        let before = cancellations_total();
        let (_token, handle) = CancelToken::new();
        handle.cancel();
        let after_first = cancellations_total();
        assert!(after_first > before);
        handle.cancel();
        // Other tests may cancel concurrently, but this handle adds nothing more.
        assert!(cancellations_total() >= after_first);
    }
}
