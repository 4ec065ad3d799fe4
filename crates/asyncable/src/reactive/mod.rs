#![forbid(unsafe_code)]

//! Observable stores backing every cell.
//!
//! - [`Observable`]: a shared, version-tracked value with subscriber
//!   callbacks and an optional lazy start/stop lifecycle.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Derived`]: an ordered view over a cell's dependencies, emitting the
//!   tuple of dependency values whenever any input changes.
//!
//! # Architecture
//!
//! Everything here is single-threaded: `Rc<RefCell<..>>` for shared state,
//! `Weak` callbacks for subscriber lists. Callbacks always run with no
//! internal borrow held.

pub mod derived;
pub mod observable;

pub use derived::Derived;
pub use observable::{Observable, Subscription};
