#![forbid(unsafe_code)]

//! Asynchronous reactive cells.
//!
//! A cell is an observable whose value comes from an async getter over its
//! dependencies, and which may be written through an async setter. Reads and
//! writes supersede each other, writes are optimistic with rollback, and a
//! write can ask its dependencies to refresh themselves.
//!
//! ```
//! use asyncable::{AsyncWritable, CellConfig};
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let config = CellConfig::new(pool.spawner());
//! let name = AsyncWritable::independent(
//!     &config,
//!     |_| async { Ok::<_, String>("draft".to_string()) },
//!     |_, (new, _old): (String, Option<String>)| async move { Ok::<_, String>(Some(new.to_uppercase())) },
//! );
//!
//! assert_eq!(pool.run_until(name.get().settle()).ok().as_deref(), Some("draft"));
//! pool.run_until(name.set("final".to_string())).ok();
//! assert_eq!(name.get(), "FINAL".to_string());
//! ```

pub mod cancel;
pub mod cell;
pub mod config;
pub mod deferred;
pub mod deps;
pub mod error;
pub mod reactive;
pub mod value;

pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::cell::{AsyncReadable, AsyncWritable, asyncable, asyncable_writable};
    pub use crate::config::CellConfig;
    pub use crate::deferred::Settle;
    pub use crate::deps::{Dep, Dependencies, Dependency};
    pub use crate::error::CellError;
    pub use crate::reactive::{Observable, Subscription};
    pub use crate::value::{AsyncValue, enrich, ready};
}

pub use cancel::{CancelToken, cancellations_total};
pub use cell::{AsyncReadable, AsyncWritable, asyncable, asyncable_writable};
pub use config::CellConfig;
pub use deferred::Settle;
pub use deps::{Dep, Dependencies, Dependency, Reflect};
pub use error::{CellError, Result};
pub use reactive::{Derived, Observable, Subscription};
pub use value::{AsyncValue, Status, enrich, ready};
