#![forbid(unsafe_code)]

//! Shared observable values with change notification and a lazy lifecycle.
//!
//! # Design
//!
//! [`Observable<T>`] keeps its value and subscriber list in
//! `Rc<RefCell<..>>`. Subscribers are stored as `Weak` callbacks; the strong
//! reference lives in the [`Subscription`] guard returned to the caller.
//!
//! An observable created with [`Observable::with_start`] runs its start hook
//! when the first subscriber arrives and drops the returned guard when the
//! last one leaves. This is how a cell only listens to its dependencies while
//! somebody listens to the cell.
//!
//! # Invariants
//!
//! 1. `subscribe` calls the callback once with the current value, then once
//!    per change, in registration order.
//! 2. `set` with a value equal to the current one is a no-op (no version bump,
//!    no notification). `publish` always notifies.
//! 3. Values published while the start hook runs are stored but not
//!    broadcast; the subscriber that triggered the start sees the latest one.
//! 4. No internal borrow is held while callbacks or hooks run, so they may
//!    read or write the same observable.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);
type StartHook = dyn Fn() -> Subscription;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    active: usize,
    start: Option<Rc<StartHook>>,
    running: Option<Subscription>,
    starting: bool,
}

/// A shared, version-tracked value with subscriber callbacks.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.active)
            .finish()
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// An observable that runs `start` while it has at least one subscriber.
    ///
    /// `start` is called on the 0 → 1 subscriber transition; the returned
    /// guard is dropped on the 1 → 0 transition.
    pub fn with_start(value: T, start: impl Fn() -> Subscription + 'static) -> Self {
        Self::build(value, Some(Rc::new(start)))
    }

    fn build(value: T, start: Option<Rc<StartHook>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                active: 0,
                start,
                running: None,
                starting: false,
            })),
        }
    }

    /// Read the current value.
    ///
    /// An idle observable with a start hook runs one start/stop cycle around
    /// the read, so the value reflects whatever the hook publishes.
    #[must_use]
    pub fn get(&self) -> T {
        let transient = {
            let inner = self.inner.borrow();
            inner.active == 0 && inner.start.is_some()
        };
        if transient {
            let probe = self.subscribe(|_| {});
            let value = self.inner.borrow().value.clone();
            drop(probe);
            return value;
        }
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// Never runs the start hook.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and notify every subscriber.
    pub fn publish(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Subscribe to the value.
    ///
    /// The callback runs immediately with the current value and again after
    /// every change, until the returned guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        let start = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.push(Rc::downgrade(&callback));
            inner.active += 1;
            if inner.active == 1 {
                inner.start.clone()
            } else {
                None
            }
        };

        if let Some(start) = start {
            self.inner.borrow_mut().starting = true;
            let guard = start();
            let mut inner = self.inner.borrow_mut();
            inner.starting = false;
            inner.running = Some(guard);
        }

        let current = self.inner.borrow().value.clone();
        callback(&current);

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            drop(callback);
            if let Some(inner) = weak.upgrade() {
                Self::release(&inner);
            }
        })
    }

    fn release(inner: &RefCell<ObservableInner<T>>) {
        let stopped = {
            let mut inner = inner.borrow_mut();
            inner.active = inner.active.saturating_sub(1);
            inner.subscribers.retain(|w| w.strong_count() > 0);
            if inner.active == 0 {
                inner.running.take()
            } else {
                None
            }
        };
        // Dropped outside the borrow: stopping may unsubscribe from other
        // observables whose callbacks read this one.
        drop(stopped);
    }

    fn notify(&self) {
        let (callbacks, value) = {
            let mut inner = self.inner.borrow_mut();
            if inner.starting {
                return;
            }
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, inner.value.clone())
        };
        for callback in callbacks {
            callback(&value);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().active
    }

    /// Monotonically increasing version, bumped on every stored change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Store `value` if it differs from the current one and notify subscribers.
    pub fn set(&self, value: T) {
        if self.inner.borrow().value == value {
            return;
        }
        self.publish(value);
    }

    /// Set the value from a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.inner.borrow().value.clone();
        self.set(f(&current));
    }
}

/// RAII guard for a subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Subscription {
    /// A guard that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A guard that does nothing.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// One guard for many subscriptions, released in order.
    pub fn all(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
