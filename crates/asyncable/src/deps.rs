#![forbid(unsafe_code)]

//! Dependency lists and their normalization.
//!
//! A cell may depend on a single source, a `(source, reflect)` pair, or a list
//! mixing both. [`parse`] flattens any of these into the ordered list of
//! sources plus the subset that should be *reflected*: asked to update after a
//! successful write on the dependent cell.
//!
//! Reflection requires the [`Reflect`] capability. Plain observables do not
//! have it, so flagging one for reflection is accepted and silently ignored.

use std::fmt;
use std::rc::Rc;

use crate::deferred::Settle;
use crate::reactive::{Observable, Subscription};

/// Something a cell can depend on.
pub trait Dependency<D> {
    /// The instantaneous value, as an awaitable.
    fn current(&self) -> Settle<D>;

    /// Call `on_change` with the current value now and after every change.
    fn watch(&self, on_change: Box<dyn Fn(Settle<D>)>) -> Subscription;

    /// The update capability of this source, if it has one.
    fn reflector(&self) -> Option<Rc<dyn Reflect>> {
        None
    }
}

/// A source that can be told to recompute itself.
///
/// Calling [`reflect`](Reflect::reflect) is fire-and-forget: it starts a
/// refresh and returns without waiting for it.
pub trait Reflect {
    fn reflect(&self);
}

impl<D: Clone + 'static> Dependency<D> for Observable<D> {
    fn current(&self) -> Settle<D> {
        Settle::ready(self.get())
    }

    fn watch(&self, on_change: Box<dyn Fn(Settle<D>)>) -> Subscription {
        self.subscribe(move |value| on_change(Settle::ready(value.clone())))
    }
}

/// One entry of a dependency list: a source and its reflect flag.
pub struct Dep<D> {
    source: Rc<dyn Dependency<D>>,
    reflect: bool,
}

impl<D> Clone for Dep<D> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            reflect: self.reflect,
        }
    }
}

impl<D> fmt::Debug for Dep<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("reflect", &self.reflect)
            .finish_non_exhaustive()
    }
}

impl<D> Dep<D> {
    pub fn new(source: impl Dependency<D> + 'static, reflect: bool) -> Self {
        Self {
            source: Rc::new(source),
            reflect,
        }
    }

    /// A source that is only read.
    pub fn plain(source: impl Dependency<D> + 'static) -> Self {
        Self::new(source, false)
    }

    /// A source that is asked to update after a successful write.
    pub fn reflecting(source: impl Dependency<D> + 'static) -> Self {
        Self::new(source, true)
    }

    #[must_use]
    pub fn is_reflecting(&self) -> bool {
        self.reflect
    }

    /// Identity of the underlying source.
    #[must_use]
    pub fn source(&self) -> &Rc<dyn Dependency<D>> {
        &self.source
    }
}

impl<D, S> From<&S> for Dep<D>
where
    S: Dependency<D> + Clone + 'static,
{
    fn from(source: &S) -> Self {
        Self::plain(source.clone())
    }
}

impl<D, S> From<(&S, bool)> for Dep<D>
where
    S: Dependency<D> + Clone + 'static,
{
    fn from((source, reflect): (&S, bool)) -> Self {
        Self::new(source.clone(), reflect)
    }
}

/// An ordered dependency list.
///
/// Built from a single source (`&source`), a single pair
/// (`(&source, true)`), or a list of [`Dep`] entries. `()` means no
/// dependencies.
pub struct Dependencies<D> {
    entries: Vec<Dep<D>>,
}

impl<D> fmt::Debug for Dependencies<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

impl<D> Default for Dependencies<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D> Dependencies<D> {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<D> From<()> for Dependencies<D> {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl<D> From<Dep<D>> for Dependencies<D> {
    fn from(entry: Dep<D>) -> Self {
        Self {
            entries: vec![entry],
        }
    }
}

impl<D, S> From<&S> for Dependencies<D>
where
    S: Dependency<D> + Clone + 'static,
{
    fn from(source: &S) -> Self {
        Dep::from(source).into()
    }
}

impl<D, S> From<(&S, bool)> for Dependencies<D>
where
    S: Dependency<D> + Clone + 'static,
{
    fn from(pair: (&S, bool)) -> Self {
        Dep::from(pair).into()
    }
}

impl<D> From<Vec<Dep<D>>> for Dependencies<D> {
    fn from(entries: Vec<Dep<D>>) -> Self {
        Self { entries }
    }
}

impl<D, const N: usize> From<[Dep<D>; N]> for Dependencies<D> {
    fn from(entries: [Dep<D>; N]) -> Self {
        Self {
            entries: entries.into(),
        }
    }
}

impl<D> FromIterator<Dep<D>> for Dependencies<D> {
    fn from_iter<I: IntoIterator<Item = Dep<D>>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A normalized dependency list.
pub struct Parsed<D> {
    /// Every source, in input order, duplicates preserved.
    pub stores: Vec<Rc<dyn Dependency<D>>>,
    /// Sources flagged for reflection that can actually update.
    pub reflections: Vec<Rc<dyn Reflect>>,
}

impl<D> fmt::Debug for Parsed<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parsed")
            .field("stores", &self.stores.len())
            .field("reflections", &self.reflections.len())
            .finish()
    }
}

/// Normalize a dependency list.
pub fn parse<D>(dependencies: impl Into<Dependencies<D>>) -> Parsed<D> {
    let Dependencies { entries } = dependencies.into();
    let mut stores = Vec::with_capacity(entries.len());
    let mut reflections = Vec::new();
    for Dep { source, reflect } in entries {
        if reflect {
            if let Some(reflector) = source.reflector() {
                reflections.push(reflector);
            }
        }
        stores.push(source);
    }
    Parsed {
        stores,
        reflections,
    }
}
