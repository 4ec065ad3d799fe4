#![forbid(unsafe_code)]

//! Asynchronous reactive cells.
//!
//! A cell's value is produced by an async getter over the values of its
//! dependencies, and may be written back through an async setter. Every value
//! the cell publishes is an [`AsyncValue`]: the last resolved payload plus a
//! handle to the operation producing the next one.
//!
//! # Lifecycle
//!
//! The cell listens to its dependencies only while it has subscribers. Each
//! dependency change starts a refresh. Reading an idle cell with
//! [`get`](AsyncReadable::get) runs one refresh and returns the loading value.
//!
//! Every entry point performs its synchronous part at call time (supersession,
//! optimistic publish) and spawns the rest on the configured executor. The
//! returned [`Settle`] may be awaited or dropped; dropping it never cancels
//! the operation.
//!
//! # Invariants
//!
//! 1. At most one pending read and one pending write exist per cell. A newer
//!    operation adopts every pending older one; only the newest commits.
//! 2. A refresh started while a write is pending resolves to the write's
//!    outcome and never runs the getter.
//! 3. A refresh whose dependency values equal the ones behind the current
//!    value does not run the getter.
//! 4. A failed write restores the value published before it.
//! 5. A successful write that changes the value asks every reflected
//!    dependency to update, once, without waiting for it.
//!
//! # Failure Modes
//!
//! - **Getter fails**: the pending read rejects; the last good value stays
//!   as the snapshot. The next refresh retries.
//! - **Setter fails**: the optimistic value is rolled back and republished;
//!   the write's caller sees the error.
//! - **Superseded operation**: never reported; its awaiters observe the
//!   outcome of the operation that replaced it. Its getter or setter keeps
//!   running unless it observes its [`CancelToken`].
//! - **Executor refuses a task**: the operation rejects with
//!   [`CellError::Abandoned`].

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{LocalBoxFuture, try_join_all};
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::CellConfig;
use crate::deferred::{Deferred, Settle};
use crate::deps::{Dependencies, Dependency, Reflect, parse};
use crate::error::{CellError, SharedError};
use crate::reactive::{Derived, Observable, Subscription};
use crate::value::AsyncValue;

type GetterFn<T, D> = dyn Fn(CancelToken, Vec<D>) -> LocalBoxFuture<'static, Result<T, SharedError>>;
type SetterFn<T, D> =
    dyn Fn(CancelToken, (T, Option<T>), Vec<D>) -> LocalBoxFuture<'static, Result<Option<T>, SharedError>>;

fn box_getter<T, D, G, Fut, E>(getter: G) -> Rc<GetterFn<T, D>>
where
    T: 'static,
    D: 'static,
    G: Fn(CancelToken, Vec<D>) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<Box<dyn Error>>,
{
    Rc::new(move |token: CancelToken, parents: Vec<D>| {
        let pending = getter(token, parents);
        async move { pending.await.map_err(SharedError::new) }.boxed_local()
    })
}

fn box_setter<T, D, S, Fut, E>(setter: S) -> Rc<SetterFn<T, D>>
where
    T: 'static,
    D: 'static,
    S: Fn(CancelToken, (T, Option<T>), Vec<D>) -> Fut + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + 'static,
    E: Into<Box<dyn Error>>,
{
    Rc::new(
        move |token: CancelToken, values: (T, Option<T>), parents: Vec<D>| {
            let pending = setter(token, values, parents);
            async move { pending.await.map_err(SharedError::new) }.boxed_local()
        },
    )
}

/// Mutable engine state. Never borrowed across an await or a callback.
struct CellState<T, D> {
    /// Last resolved payload.
    value: Option<T>,
    /// Dependency values behind `value`; `None` forces the next refresh.
    parents: Option<Vec<D>>,
    getting: Deferred<T>,
    setting: Option<Deferred<T>>,
    /// Caller-facing outcome of the write in `setting`.
    committing: Option<Deferred<()>>,
    /// Diagnostics only: bumped once per started operation and recorded in
    /// log events. Commit decisions go through adoption, not this counter.
    generation: u64,
}

struct CellCore<T, D> {
    label: Rc<str>,
    state: RefCell<CellState<T, D>>,
    getter: Rc<GetterFn<T, D>>,
    setter: Option<Rc<SetterFn<T, D>>>,
    listener: Derived<D>,
    reflections: Vec<Rc<dyn Reflect>>,
    output: Observable<AsyncValue<T>>,
    spawner: Rc<dyn LocalSpawn>,
}

impl<T, D> CellCore<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    fn build(
        config: &CellConfig,
        dependencies: Dependencies<D>,
        getter: Rc<GetterFn<T, D>>,
        setter: Option<Rc<SetterFn<T, D>>>,
    ) -> Rc<Self> {
        let parsed = parse(dependencies);
        let getting = Deferred::new();
        let initial = AsyncValue::empty(getting.settle());
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let output = Observable::with_start(initial, move || match weak.upgrade() {
                Some(core) => core.listen(),
                None => Subscription::empty(),
            });
            Self {
                label: config.resolve_label(),
                state: RefCell::new(CellState {
                    value: None,
                    parents: None,
                    getting,
                    setting: None,
                    committing: None,
                    generation: 0,
                }),
                getter,
                setter,
                listener: Derived::new(parsed.stores),
                reflections: parsed.reflections,
                output,
                spawner: config.spawner(),
            }
        })
    }

    /// Subscribe to the dependencies; every emission starts a refresh.
    fn listen(self: &Rc<Self>) -> Subscription {
        let weak = Rc::downgrade(self);
        self.listener.subscribe(move |values| {
            if let Some(core) = weak.upgrade() {
                let _ = core.refresh(Some(values));
            }
        })
    }

    fn spawn(&self, task: impl Future<Output = ()> + 'static, on_refused: impl FnOnce()) {
        if let Err(error) = self.spawner.spawn_local(task) {
            warn!(cell = %self.label, %error, "cell.spawn.refused");
            on_refused();
        }
    }

    fn peek(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    // ── Read path ────────────────────────────────────────────────────

    /// Start a refresh.
    ///
    /// `values` carries dependency values from a change notification; `None`
    /// is a forced refresh that ignores change detection.
    fn refresh(self: &Rc<Self>, values: Option<Vec<Settle<D>>>) -> Settle<T> {
        let cached = {
            let mut state = self.state.borrow_mut();
            if let Some(setting) = state.setting.as_ref().filter(|s| s.is_pending()) {
                debug!(cell = %self.label, "cell.refresh.deferred_to_write");
                return setting.settle();
            }
            if values.is_some() {
                None
            } else {
                state.parents.take()
            }
        };
        let values = match (values, cached) {
            (Some(values), _) => values,
            (None, Some(parents)) => parents.into_iter().map(Settle::ready).collect(),
            (None, None) => self.listener.get(),
        };

        let loader = Deferred::new();
        let (stale, publish, generation) = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            let previous = std::mem::replace(&mut state.getting, loader.clone());
            if previous.is_pending() {
                (Some(previous), None, state.generation)
            } else {
                let loading = AsyncValue::new(loader.settle(), state.value.clone());
                (None, Some(loading), state.generation)
            }
        };
        if let Some(stale) = stale {
            debug!(cell = %self.label, generation, "cell.refresh.supersedes_read");
            stale.adopt(&loader.settle());
        }
        if let Some(loading) = publish {
            self.output.publish(loading);
        }

        let core = Rc::clone(self);
        let task_loader = loader.clone();
        self.spawn(core.load(task_loader, values, generation), || {
            loader.reject(CellError::Abandoned);
        });
        loader.settle()
    }

    async fn load(self: Rc<Self>, loader: Deferred<T>, values: Vec<Settle<D>>, generation: u64) {
        let awaited = match try_join_all(values).await {
            Ok(awaited) => awaited,
            Err(error) => {
                debug!(cell = %self.label, generation, %error, "cell.refresh.dependency_failed");
                loader.reject(error);
                return;
            }
        };
        if loader.is_adopted() {
            debug!(cell = %self.label, generation, "cell.refresh.superseded");
            return;
        }

        let unchanged = {
            let state = self.state.borrow();
            state.value.is_some() && state.parents.as_ref() == Some(&awaited)
        };
        if unchanged {
            debug!(cell = %self.label, generation, "cell.refresh.unchanged");
        } else {
            trace!(cell = %self.label, generation, "cell.getter.invoke");
            let result = (self.getter)(loader.token(), awaited.clone()).await;
            if loader.is_adopted() {
                debug!(cell = %self.label, generation, "cell.refresh.superseded");
                return;
            }
            let updated = match result {
                Ok(updated) => updated,
                Err(error) => {
                    debug!(cell = %self.label, generation, %error, "cell.getter.failed");
                    loader.reject(CellError::Getter(error));
                    return;
                }
            };
            let publish = {
                let mut state = self.state.borrow_mut();
                state.parents = Some(awaited);
                if state.value.as_ref() == Some(&updated) {
                    None
                } else {
                    state.value = Some(updated.clone());
                    Some(AsyncValue::new(loader.settle(), Some(updated)))
                }
            };
            if let Some(fresh) = publish {
                self.output.publish(fresh);
            }
        }

        if let Some(value) = self.peek() {
            loader.resolve(value);
        }
    }

    // ── Write path ───────────────────────────────────────────────────

    fn write(self: &Rc<Self>, updated: T) -> Settle<()> {
        let Some(setter) = self.setter.clone() else {
            return Settle::ready(());
        };
        let loader = Deferred::new();
        let outcome = Deferred::new();
        let (stale, stale_outcome, previous, generation) = {
            let mut state = self.state.borrow_mut();
            if state.value.as_ref() == Some(&updated) {
                return Settle::ready(());
            }
            state.generation += 1;
            let mut stale = Vec::with_capacity(2);
            if state.getting.is_pending() {
                stale.push(state.getting.clone());
            }
            if let Some(setting) = state.setting.replace(loader.clone()) {
                if setting.is_pending() {
                    stale.push(setting);
                }
            }
            let stale_outcome = state
                .committing
                .replace(outcome.clone())
                .filter(Deferred::is_pending);
            let previous = state.value.replace(updated.clone());
            (stale, stale_outcome, previous, state.generation)
        };
        if !stale.is_empty() {
            debug!(cell = %self.label, generation, superseded = stale.len(), "cell.write.supersedes");
        }
        for operation in &stale {
            operation.adopt(&loader.settle());
        }
        // The superseded caller settles with this write.
        if let Some(stale_outcome) = stale_outcome {
            stale_outcome.adopt(&outcome.settle());
        }

        // Optimistic: subscribers see the new value before the setter runs.
        self.output
            .publish(AsyncValue::new(Settle::ready(updated.clone()), Some(updated.clone())));

        let core = Rc::clone(self);
        let task = core.store(
            loader.clone(),
            setter,
            updated,
            previous,
            generation,
            outcome.clone(),
        );
        self.spawn(task, || {
            loader.reject(CellError::Abandoned);
            outcome.reject(CellError::Abandoned);
        });
        outcome.settle()
    }

    async fn store(
        self: Rc<Self>,
        loader: Deferred<T>,
        setter: Rc<SetterFn<T, D>>,
        updated: T,
        previous: Option<T>,
        generation: u64,
        outcome: Deferred<()>,
    ) {
        let result = self
            .commit(&loader, &setter, updated, previous.clone(), generation)
            .await;
        if loader.is_adopted() {
            // `outcome` was adopted along with `loader`.
            debug!(cell = %self.label, generation, "cell.write.superseded");
            return;
        }

        if let Err(error) = &result {
            debug!(cell = %self.label, generation, %error, "cell.write.rollback");
            let reverted = {
                let mut state = self.state.borrow_mut();
                state.value = previous;
                AsyncValue::new(state.getting.settle(), state.value.clone())
            };
            self.output.publish(reverted);
        }

        match (self.peek(), &result) {
            (Some(value), _) => loader.resolve(value),
            (None, Err(error)) => loader.reject(error.clone()),
            (None, Ok(())) => loader.reject(CellError::Abandoned),
        }
        match result {
            Ok(()) => outcome.resolve(()),
            Err(error) => outcome.reject(error),
        }
    }

    async fn commit(
        &self,
        loader: &Deferred<T>,
        setter: &Rc<SetterFn<T, D>>,
        updated: T,
        previous: Option<T>,
        generation: u64,
    ) -> Result<(), CellError> {
        let cached = self.state.borrow().parents.clone();
        let parents = match cached {
            Some(parents) => parents,
            None => {
                let fresh = try_join_all(self.listener.get()).await?;
                if loader.is_adopted() {
                    return Ok(());
                }
                self.state.borrow_mut().parents = Some(fresh.clone());
                fresh
            }
        };

        trace!(cell = %self.label, generation, "cell.setter.invoke");
        let canonical = setter(loader.token(), (updated, previous.clone()), parents)
            .await
            .map_err(CellError::Setter)?;
        if loader.is_adopted() {
            return Ok(());
        }

        let (publish, changed) = {
            let mut state = self.state.borrow_mut();
            let publish = match canonical {
                Some(canonical) if state.value.as_ref() != Some(&canonical) => {
                    state.value = Some(canonical.clone());
                    Some(AsyncValue::new(
                        Settle::ready(canonical.clone()),
                        Some(canonical),
                    ))
                }
                _ => None,
            };
            (publish, state.value != previous)
        };
        if let Some(canonical) = publish {
            self.output.publish(canonical);
        }

        if changed && !self.reflections.is_empty() {
            debug!(
                cell = %self.label,
                generation,
                reflections = self.reflections.len(),
                "cell.write.reflect"
            );
            for reflection in &self.reflections {
                reflection.reflect();
            }
        }
        Ok(())
    }

    // ── Updaters ─────────────────────────────────────────────────────

    fn update_with(self: &Rc<Self>, updater: impl FnOnce(Option<T>) -> Option<T>) -> Settle<()> {
        if self.setter.is_none() {
            return Settle::ready(());
        }
        match updater(self.peek()) {
            Some(next) => self.write(next),
            None => Settle::ready(()),
        }
    }

    fn update_with_async<F, Fut>(self: &Rc<Self>, updater: F) -> Settle<()>
    where
        F: FnOnce(Option<T>) -> Fut,
        Fut: Future<Output = Option<T>> + 'static,
    {
        if self.setter.is_none() {
            return Settle::ready(());
        }
        let pending = updater(self.peek());
        let outcome = Deferred::new();
        let core = Rc::clone(self);
        let task_outcome = outcome.clone();
        let task = async move {
            let result = match pending.await {
                Some(next) => core.write(next).await,
                None => Ok(()),
            };
            match result {
                Ok(()) => task_outcome.resolve(()),
                Err(error) => task_outcome.reject(error),
            }
        };
        self.spawn(task, || outcome.reject(CellError::Abandoned));
        outcome.settle()
    }
}

impl<T: fmt::Debug, D> fmt::Debug for CellCore<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Cell");
        out.field("label", &self.label);
        match self.state.try_borrow() {
            Ok(state) => out
                .field("value", &state.value)
                .field("generation", &state.generation),
            Err(_) => out.field("value", &"<busy>"),
        };
        out.field("writable", &self.setter.is_some()).finish()
    }
}

// ─── Read-only handle ────────────────────────────────────────────────────────

/// A cell without a setter: `subscribe`, `get` and `update`.
///
/// Cloning creates a new handle to the **same** cell.
pub struct AsyncReadable<T, D = ()> {
    core: Rc<CellCore<T, D>>,
}

impl<T, D> Clone for AsyncReadable<T, D> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug, D> fmt::Debug for AsyncReadable<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}

impl<T, D> AsyncReadable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    /// A read-only cell computed by `getter` from `dependencies`.
    pub fn new<G, Fut, E>(
        config: &CellConfig,
        dependencies: impl Into<Dependencies<D>>,
        getter: G,
    ) -> Self
    where
        G: Fn(CancelToken, Vec<D>) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<Box<dyn Error>>,
    {
        Self {
            core: CellCore::build(config, dependencies.into(), box_getter(getter), None),
        }
    }

    /// The current value; starts a load if nobody is subscribed.
    #[must_use]
    pub fn get(&self) -> AsyncValue<T> {
        self.core.output.get()
    }

    /// Last resolved payload, without starting anything.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.core.peek()
    }

    /// Subscribe to published values. The callback runs immediately.
    pub fn subscribe(&self, callback: impl Fn(&AsyncValue<T>) + 'static) -> Subscription {
        self.core.output.subscribe(callback)
    }

    /// Force a full refresh, re-running the getter.
    pub fn update(&self) -> Settle<T> {
        self.core.refresh(None)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }
}

impl<T> AsyncReadable<T, ()>
where
    T: Clone + PartialEq + 'static,
{
    /// A read-only cell with no dependencies.
    pub fn independent<G, Fut, E>(config: &CellConfig, getter: G) -> Self
    where
        G: Fn(CancelToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<Box<dyn Error>>,
    {
        Self::new(config, (), move |token, _: Vec<()>| getter(token))
    }
}

// ─── Read-write handle ───────────────────────────────────────────────────────

/// A cell with a setter: `subscribe`, `get`, `set` and the `update` family.
///
/// Cloning creates a new handle to the **same** cell.
pub struct AsyncWritable<T, D = ()> {
    core: Rc<CellCore<T, D>>,
}

impl<T, D> Clone for AsyncWritable<T, D> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug, D> fmt::Debug for AsyncWritable<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}

impl<T, D> AsyncWritable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    /// A cell computed by `getter` and written through `setter`.
    ///
    /// The setter receives `(new, old)`; returning `Ok(None)` accepts the
    /// optimistic value, `Ok(Some(v))` replaces it with the canonical `v`.
    pub fn new<G, GFut, GE, S, SFut, SE>(
        config: &CellConfig,
        dependencies: impl Into<Dependencies<D>>,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(CancelToken, Vec<D>) -> GFut + 'static,
        GFut: Future<Output = Result<T, GE>> + 'static,
        GE: Into<Box<dyn Error>>,
        S: Fn(CancelToken, (T, Option<T>), Vec<D>) -> SFut + 'static,
        SFut: Future<Output = Result<Option<T>, SE>> + 'static,
        SE: Into<Box<dyn Error>>,
    {
        Self {
            core: CellCore::build(
                config,
                dependencies.into(),
                box_getter(getter),
                Some(box_setter(setter)),
            ),
        }
    }

    /// The current value; starts a load if nobody is subscribed.
    #[must_use]
    pub fn get(&self) -> AsyncValue<T> {
        self.core.output.get()
    }

    /// Last resolved payload, without starting anything.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.core.peek()
    }

    /// Subscribe to published values. The callback runs immediately.
    pub fn subscribe(&self, callback: impl Fn(&AsyncValue<T>) + 'static) -> Subscription {
        self.core.output.subscribe(callback)
    }

    /// Write `value`: publish it optimistically, then run the setter.
    ///
    /// Resolves once the write commits; rejects with the setter's error after
    /// rolling back. A write superseded by a newer one settles with the newer
    /// write's outcome.
    pub fn set(&self, value: T) -> Settle<()> {
        self.core.write(value)
    }

    /// Force a full refresh, re-running the getter.
    pub fn update(&self) -> Settle<T> {
        self.core.refresh(None)
    }

    /// Write `updater(current)` unless it returns `None`.
    pub fn update_with(&self, updater: impl FnOnce(Option<T>) -> Option<T>) -> Settle<()> {
        self.core.update_with(updater)
    }

    /// Like [`update_with`](Self::update_with) with an async updater.
    pub fn update_with_async<F, Fut>(&self, updater: F) -> Settle<()>
    where
        F: FnOnce(Option<T>) -> Fut,
        Fut: Future<Output = Option<T>> + 'static,
    {
        self.core.update_with_async(updater)
    }

    /// A read-only handle to the same cell.
    #[must_use]
    pub fn readonly(&self) -> AsyncReadable<T, D> {
        AsyncReadable {
            core: Rc::clone(&self.core),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }
}

impl<T> AsyncWritable<T, ()>
where
    T: Clone + PartialEq + 'static,
{
    /// A writable cell with no dependencies.
    pub fn independent<G, GFut, GE, S, SFut, SE>(config: &CellConfig, getter: G, setter: S) -> Self
    where
        G: Fn(CancelToken) -> GFut + 'static,
        GFut: Future<Output = Result<T, GE>> + 'static,
        GE: Into<Box<dyn Error>>,
        S: Fn(CancelToken, (T, Option<T>)) -> SFut + 'static,
        SFut: Future<Output = Result<Option<T>, SE>> + 'static,
        SE: Into<Box<dyn Error>>,
    {
        Self::new(
            config,
            (),
            move |token, _: Vec<()>| getter(token),
            move |token, values, _: Vec<()>| setter(token, values),
        )
    }
}

// ─── Factories ───────────────────────────────────────────────────────────────

/// Build a read-only cell.
pub fn asyncable<T, D, G, Fut, E>(
    config: &CellConfig,
    dependencies: impl Into<Dependencies<D>>,
    getter: G,
) -> AsyncReadable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    G: Fn(CancelToken, Vec<D>) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<Box<dyn Error>>,
{
    AsyncReadable::new(config, dependencies, getter)
}

/// Build a read-write cell.
pub fn asyncable_writable<T, D, G, GFut, GE, S, SFut, SE>(
    config: &CellConfig,
    dependencies: impl Into<Dependencies<D>>,
    getter: G,
    setter: S,
) -> AsyncWritable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    G: Fn(CancelToken, Vec<D>) -> GFut + 'static,
    GFut: Future<Output = Result<T, GE>> + 'static,
    GE: Into<Box<dyn Error>>,
    S: Fn(CancelToken, (T, Option<T>), Vec<D>) -> SFut + 'static,
    SFut: Future<Output = Result<Option<T>, SE>> + 'static,
    SE: Into<Box<dyn Error>>,
{
    AsyncWritable::new(config, dependencies, getter, setter)
}

// ─── Cells as dependencies ───────────────────────────────────────────────────

impl<T, D> Dependency<T> for AsyncReadable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    fn current(&self) -> Settle<T> {
        self.get().settle()
    }

    fn watch(&self, on_change: Box<dyn Fn(Settle<T>)>) -> Subscription {
        self.subscribe(move |value| on_change(value.settle()))
    }

    fn reflector(&self) -> Option<Rc<dyn Reflect>> {
        Some(Rc::new(self.clone()))
    }
}

impl<T, D> Reflect for AsyncReadable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    fn reflect(&self) {
        let _ = self.update();
    }
}

impl<T, D> Dependency<T> for AsyncWritable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    fn current(&self) -> Settle<T> {
        self.get().settle()
    }

    fn watch(&self, on_change: Box<dyn Fn(Settle<T>)>) -> Subscription {
        self.subscribe(move |value| on_change(value.settle()))
    }

    fn reflector(&self) -> Option<Rc<dyn Reflect>> {
        Some(Rc::new(self.clone()))
    }
}

impl<T, D> Reflect for AsyncWritable<T, D>
where
    T: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    fn reflect(&self) {
        let _ = self.update();
    }
}
