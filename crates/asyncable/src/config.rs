#![forbid(unsafe_code)]

//! Cell configuration.
//!
//! Cells run the asynchronous half of every operation on a local executor.
//! [`CellConfig`] carries that executor's spawner and an optional label used
//! in log events.
//!
//! ```
//! use asyncable::CellConfig;
//! use futures::executor::LocalPool;
//!
//! let pool = LocalPool::new();
//! let config = CellConfig::new(pool.spawner()).with_label("profile");
//! assert_eq!(config.label(), Some("profile"));
//! ```

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::task::LocalSpawn;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Settings shared by the cells built from it.
#[derive(Clone)]
pub struct CellConfig {
    spawner: Rc<dyn LocalSpawn>,
    label: Option<Rc<str>>,
}

impl fmt::Debug for CellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellConfig")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl CellConfig {
    /// Configuration running cell tasks on `spawner`.
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            spawner: Rc::new(spawner),
            label: None,
        }
    }

    /// Name used as the `cell` field of log events.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Rc::from(label.into()));
        self
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn spawner(&self) -> Rc<dyn LocalSpawn> {
        Rc::clone(&self.spawner)
    }

    /// The configured label, or a unique `cell-N` fallback.
    pub(crate) fn resolve_label(&self) -> Rc<str> {
        match &self.label {
            Some(label) => Rc::clone(label),
            None => {
                let id = NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed);
                Rc::from(format!("cell-{id}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;

    #[test]
    fn default_label_is_unique() {
        let pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        assert_eq!(config.label(), None);
        let a = config.resolve_label();
        let b = config.resolve_label();
        assert!(a.starts_with("cell-"));
        assert_ne!(a, b);
    }

    #[test]
    fn explicit_label_is_shared() {
        let pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner()).with_label("total");
        assert_eq!(&*config.resolve_label(), "total");
        assert!(format!("{config:?}").contains("total"));
    }
}
