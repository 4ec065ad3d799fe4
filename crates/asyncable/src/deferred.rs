#![forbid(unsafe_code)]

//! Controlled futures: settle by hand, or hand the outcome over to a newer one.
//!
//! A [`Deferred<T>`] is the producer side of a single cell operation. It is
//! resolved or rejected directly, or *adopted*: the operation is superseded
//! and its eventual outcome becomes whatever the replacement settles to.
//! [`Settle<T>`] is the consumer side, a cloneable future that follows the
//! adoption chain at poll time.
//!
//! # Invariants
//!
//! 1. A `Deferred` leaves `Pending` at most once. `resolve`, `reject` and
//!    `adopt` on a non-pending deferred are no-ops.
//! 2. Adoption cancels the deferred's own [`CancelToken`] and never settles it
//!    directly; `Adopted` is terminal for the deferred's own state.
//! 3. A `Settle` always reports the outcome at the **tail** of the adoption
//!    chain, including adoptions that happen after the `Settle` was created.
//! 4. Adoption only points at operations created later than the adopted one,
//!    so chains are acyclic.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::cancel::{CancelHandle, CancelToken};
use crate::error::CellError;

/// Lifecycle of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    Pending,
    Resolved,
    Rejected,
    /// Superseded; the outcome is forwarded from a replacement.
    Adopted,
}

struct Slot<T> {
    state: DeferredState,
    outcome: Option<Result<T, CellError>>,
    redirect: Option<Deferred<T>>,
    wakers: Vec<Waker>,
}

struct DeferredInner<T> {
    slot: RefCell<Slot<T>>,
    token: CancelToken,
    handle: CancelHandle,
}

/// Producer side of a supersedable operation.
///
/// Cloning creates a new handle to the **same** operation.
pub struct Deferred<T> {
    inner: Rc<DeferredInner<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.borrow();
        f.debug_struct("Deferred")
            .field("state", &slot.state)
            .field("token", &self.inner.token.id())
            .finish()
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// A pending operation with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_slot(DeferredState::Pending, None)
    }

    /// An operation that has already resolved.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::with_slot(DeferredState::Resolved, Some(Ok(value)))
    }

    /// An operation that has already failed.
    #[must_use]
    pub fn rejected(error: CellError) -> Self {
        Self::with_slot(DeferredState::Rejected, Some(Err(error)))
    }

    fn with_slot(state: DeferredState, outcome: Option<Result<T, CellError>>) -> Self {
        let (token, handle) = CancelToken::new();
        Self {
            inner: Rc::new(DeferredInner {
                slot: RefCell::new(Slot {
                    state,
                    outcome,
                    redirect: None,
                    wakers: Vec::new(),
                }),
                token,
                handle,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> DeferredState {
        self.inner.slot.borrow().state
    }

    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    #[inline]
    #[must_use]
    pub fn is_adopted(&self) -> bool {
        self.state() == DeferredState::Adopted
    }

    /// Token cancelled when this operation is adopted.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.inner.token.clone()
    }

    pub fn resolve(&self, value: T) {
        self.settle_with(DeferredState::Resolved, Ok(value));
    }

    pub fn reject(&self, error: CellError) {
        self.settle_with(DeferredState::Rejected, Err(error));
    }

    fn settle_with(&self, state: DeferredState, outcome: Result<T, CellError>) {
        let wakers = {
            let mut slot = self.inner.slot.borrow_mut();
            if slot.state != DeferredState::Pending {
                return;
            }
            slot.state = state;
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// Hand this operation's outcome over to `replacement`.
    ///
    /// Cancels this operation's token. Everyone awaiting this operation now
    /// observes the replacement's settlement instead.
    pub fn adopt(&self, replacement: &Settle<T>) {
        let wakers = {
            let mut slot = self.inner.slot.borrow_mut();
            if slot.state != DeferredState::Pending {
                return;
            }
            slot.state = DeferredState::Adopted;
            slot.redirect = Some(replacement.source.clone());
            std::mem::take(&mut slot.wakers)
        };
        self.inner.handle.cancel();
        for waker in wakers {
            waker.wake();
        }
    }

    /// The consumer side of this operation.
    #[must_use]
    pub fn settle(&self) -> Settle<T> {
        Settle {
            source: self.clone(),
        }
    }
}

/// Awaitable outcome of a [`Deferred`], following adoptions.
#[must_use = "futures do nothing unless polled"]
pub struct Settle<T> {
    source: Deferred<T>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T> fmt::Debug for Settle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Settle").field(&self.source).finish()
    }
}

impl<T> Settle<T> {
    /// A settlement that is already resolved.
    pub fn ready(value: T) -> Self {
        Deferred::resolved(value).settle()
    }

    /// A settlement that has already failed.
    pub fn failed(error: CellError) -> Self {
        Deferred::rejected(error).settle()
    }

    /// The last operation in the adoption chain.
    fn tail(&self) -> Deferred<T> {
        let mut current = self.source.clone();
        loop {
            let next = current.inner.slot.borrow().redirect.clone();
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Whether the winning operation has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tail().inner.slot.borrow().outcome.is_some()
    }

    /// Whether the winning operation has settled with an error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.tail().inner.slot.borrow().outcome, Some(Err(_)))
    }
}

impl<T: Clone> Settle<T> {
    /// The current outcome, if the winning operation has settled.
    #[must_use]
    pub fn peek(&self) -> Option<Result<T, CellError>> {
        self.tail().inner.slot.borrow().outcome.clone()
    }
}

impl<T: Clone> Future for Settle<T> {
    type Output = Result<T, CellError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let tail = self.tail();
        let mut slot = tail.inner.slot.borrow_mut();
        if let Some(outcome) = &slot.outcome {
            return Poll::Ready(outcome.clone());
        }
        // Adoption of the tail wakes this waker so the chain is re-walked.
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
