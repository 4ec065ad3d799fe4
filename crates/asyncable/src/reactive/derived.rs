#![forbid(unsafe_code)]

//! A combined view over an ordered list of dependencies.
//!
//! # Design
//!
//! [`Derived<D>`] is the derivation operator a cell uses to listen to its
//! dependencies. Its value is the ordered tuple of per-dependency awaitables
//! (`Vec<Settle<D>>`). Subscribing subscribes to every input; the callback
//! fires once with the initial tuple and then once per input change.
//!
//! # Invariants
//!
//! 1. The tuple has exactly one entry per dependency, in input order.
//! 2. Input notifications delivered while the subscription is being set up
//!    are folded into the single initial emission.
//! 3. Dropping the returned [`Subscription`] unsubscribes from every input.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::deferred::Settle;
use crate::deps::Dependency;

use super::observable::Subscription;

/// Per-subscription state shared with the input callbacks.
struct DerivedRun<D> {
    values: RefCell<Vec<Option<Settle<D>>>>,
    live: Cell<bool>,
    callback: Box<dyn Fn(Vec<Settle<D>>)>,
}

impl<D> DerivedRun<D> {
    fn emit(&self) {
        let values: Option<Vec<Settle<D>>> = self.values.borrow().iter().cloned().collect();
        if let Some(values) = values {
            (self.callback)(values);
        }
    }
}

/// Ordered view over the dependencies of one cell.
///
/// Cloning a `Derived` creates a new handle to the **same** inputs.
pub struct Derived<D> {
    inputs: Rc<[Rc<dyn Dependency<D>>]>,
}

impl<D> Clone for Derived<D> {
    fn clone(&self) -> Self {
        Self {
            inputs: Rc::clone(&self.inputs),
        }
    }
}

impl<D> fmt::Debug for Derived<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

impl<D: 'static> Derived<D> {
    pub fn new(inputs: Vec<Rc<dyn Dependency<D>>>) -> Self {
        Self {
            inputs: inputs.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The current tuple of dependency values.
    #[must_use]
    pub fn get(&self) -> Vec<Settle<D>> {
        self.inputs.iter().map(|input| input.current()).collect()
    }

    /// Subscribe to the tuple.
    pub fn subscribe(&self, callback: impl Fn(Vec<Settle<D>>) + 'static) -> Subscription {
        let run = Rc::new(DerivedRun {
            values: RefCell::new(vec![None; self.inputs.len()]),
            live: Cell::new(false),
            callback: Box::new(callback),
        });

        let subscriptions: Vec<Subscription> = self
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let run = Rc::downgrade(&run);
                input.watch(Box::new(move |settle| {
                    let Some(run) = run.upgrade() else {
                        return;
                    };
                    run.values.borrow_mut()[index] = Some(settle);
                    if run.live.get() {
                        run.emit();
                    }
                }))
            })
            .collect();

        run.live.set(true);
        run.emit();

        Subscription::new(move || {
            run.live.set(false);
            drop(subscriptions);
            drop(run);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;

    fn snapshot(values: &[Settle<i32>]) -> Vec<i32> {
        values
            .iter()
            .map(|s| s.peek().and_then(Result::ok).unwrap_or(-1))
            .collect()
    }

    fn listener(a: &Observable<i32>, b: &Observable<i32>) -> Derived<i32> {
        let inputs: Vec<Rc<dyn Dependency<i32>>> = vec![Rc::new(a.clone()), Rc::new(b.clone())];
        Derived::new(inputs)
    }

    #[test]
    fn get_reads_inputs_in_order() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let derived = listener(&a, &b);
        assert_eq!(derived.len(), 2);
        assert_eq!(snapshot(&derived.get()), vec![1, 2]);
    }

    #[test]
    fn subscribe_emits_once_initially() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let derived = listener(&a, &b);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = derived.subscribe(move |values| sink.borrow_mut().push(snapshot(&values)));
        assert_eq!(*log.borrow(), vec![vec![1, 2]]);
    }

    #[test]
    fn each_input_change_emits() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let derived = listener(&a, &b);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = derived.subscribe(move |values| sink.borrow_mut().push(snapshot(&values)));

        a.set(3);
        b.set(8);
        b.set(8);
        assert_eq!(*log.borrow(), vec![vec![1, 2], vec![3, 2], vec![3, 8]]);
    }

    #[test]
    fn drop_unsubscribes_from_all_inputs() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let derived = listener(&a, &b);
        let sub = derived.subscribe(|_| {});
        assert_eq!(a.subscriber_count(), 1);
        assert_eq!(b.subscriber_count(), 1);
        drop(sub);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn empty_derived_emits_empty_tuple() {
        let derived: Derived<i32> = Derived::new(Vec::new());
        assert!(derived.is_empty());
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let _sub = derived.subscribe(move |values| {
            assert!(values.is_empty());
            sink.set(sink.get() + 1);
        });
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn clone_shares_inputs() {
        let a = Observable::new(5);
        let b = Observable::new(6);
        let d1 = listener(&a, &b);
        let d2 = d1.clone();
        a.set(7);
        assert_eq!(snapshot(&d1.get()), snapshot(&d2.get()));
    }
}
