#![forbid(unsafe_code)]

//! Dual-mode values: a synchronous snapshot plus an awaitable fresh result.
//!
//! Every value a cell publishes is an [`AsyncValue<T>`]. Read it
//! synchronously through [`snapshot`](AsyncValue::snapshot) /
//! [`try_get`](AsyncValue::try_get) to get the last known result, or `.await`
//! it to get the outcome of the operation that is producing the next one.
//!
//! Awaiting follows supersession: a value published before a newer refresh or
//! write still resolves to whatever that newer operation produces.
//!
//! ```
//! use asyncable::deferred::Deferred;
//! use asyncable::value::{enrich, ready};
//!
//! let loading = Deferred::new();
//! let value = enrich(loading.settle(), Some(5));
//! assert!(ready(&value));
//! assert_eq!(value, 5);
//! assert_eq!(value.to_string(), "5");
//! ```

use std::fmt;
use std::future::IntoFuture;

use crate::deferred::Settle;
use crate::error::NotReady;

/// What a dual-mode value currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation behind the value is still running.
    Loading,
    /// The operation settled successfully.
    Ready,
    /// The operation settled with an error.
    Failed,
}

/// A snapshot of the last resolved payload paired with the in-flight result.
///
/// Published values are never mutated; a new one is built for every change.
#[derive(Clone)]
pub struct AsyncValue<T> {
    settle: Settle<T>,
    snapshot: Option<T>,
}

/// Pair a settlement with an optional snapshot.
pub fn enrich<T>(settle: Settle<T>, snapshot: Option<T>) -> AsyncValue<T> {
    AsyncValue::new(settle, snapshot)
}

/// True iff the value carries a snapshot.
pub fn ready<T>(value: &AsyncValue<T>) -> bool {
    value.is_ready()
}

impl<T> AsyncValue<T> {
    pub fn new(settle: Settle<T>, snapshot: Option<T>) -> Self {
        Self { settle, snapshot }
    }

    /// A value with no snapshot yet.
    pub fn empty(settle: Settle<T>) -> Self {
        Self::new(settle, None)
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.snapshot.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }

    /// The snapshot, or [`NotReady`] while the first load is still running.
    pub fn try_get(&self) -> Result<&T, NotReady> {
        self.snapshot.as_ref().ok_or(NotReady)
    }

    /// Consume the value, keeping only the snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> Option<T> {
        self.snapshot
    }

    /// The awaitable side of the value.
    pub fn settle(&self) -> Settle<T> {
        self.settle.clone()
    }

    /// State of the operation this value is waiting on.
    #[must_use]
    pub fn status(&self) -> Status {
        if !self.settle.is_settled() {
            Status::Loading
        } else if self.settle.is_failed() {
            Status::Failed
        } else {
            Status::Ready
        }
    }

    /// Map the snapshot, keeping the same settlement.
    pub fn map_snapshot<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.snapshot.as_ref().map(f)
    }
}

impl<T: Clone> AsyncValue<T> {
    /// The snapshot, or `fallback` while not ready.
    #[must_use]
    pub fn value_or(&self, fallback: T) -> T {
        self.snapshot.clone().unwrap_or(fallback)
    }
}

impl<T: Clone + Default> AsyncValue<T> {
    /// The snapshot, or `T::default()` while not ready.
    #[must_use]
    pub fn value_or_default(&self) -> T {
        self.snapshot.clone().unwrap_or_default()
    }
}

impl<T: Copy> AsyncValue<T> {
    /// Scalar extraction for `Copy` payloads.
    #[must_use]
    pub fn copied(&self) -> Option<T> {
        self.snapshot
    }
}

impl<T: fmt::Display> AsyncValue<T> {
    /// Render the snapshot, or fail with [`NotReady`].
    pub fn to_text(&self) -> Result<String, NotReady> {
        self.try_get().map(ToString::to_string)
    }
}

/// Renders the snapshot; an empty value renders as `<not ready>`.
impl<T: fmt::Display> fmt::Display for AsyncValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.snapshot {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("<not ready>"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncValue")
            .field("snapshot", &self.snapshot)
            .field("status", &self.status())
            .finish()
    }
}

/// Compares the snapshot; an empty value equals nothing.
impl<T: PartialEq> PartialEq<T> for AsyncValue<T> {
    fn eq(&self, other: &T) -> bool {
        self.snapshot.as_ref() == Some(other)
    }
}

impl<T: Clone> IntoFuture for AsyncValue<T> {
    type Output = crate::error::Result<T>;
    type IntoFuture = Settle<T>;

    fn into_future(self) -> Settle<T> {
        self.settle
    }
}

impl<T: Clone> IntoFuture for &AsyncValue<T> {
    type Output = crate::error::Result<T>;
    type IntoFuture = Settle<T>;

    fn into_future(self) -> Settle<T> {
        self.settle.clone()
    }
}
