#![forbid(unsafe_code)]

//! Error types for cells, dual-mode values and cancellation tokens.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CellError>;

/// A user-supplied failure that can be observed by many awaiters at once.
///
/// Getters and setters return arbitrary errors; a single failed refresh may be
/// awaited by every subscriber holding the published value, so the error is
/// shared behind an `Rc`.
#[derive(Clone)]
pub struct SharedError(Rc<dyn Error>);

impl SharedError {
    pub fn new(error: impl Into<Box<dyn Error>>) -> Self {
        Self(Rc::from(error.into()))
    }

    /// The wrapped error.
    #[must_use]
    pub fn inner(&self) -> &(dyn Error + 'static) {
        &*self.0
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for SharedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Failure of a cell operation.
///
/// Superseded operations are never reported through this type; they are
/// silently redirected to the operation that replaced them.
#[derive(Debug, Clone, Error)]
pub enum CellError {
    #[error("getter failed: {0}")]
    Getter(#[source] SharedError),

    #[error("setter failed: {0}")]
    Setter(#[source] SharedError),

    #[error("operation abandoned before it settled")]
    Abandoned,
}

impl CellError {
    #[must_use]
    pub fn getter(error: impl Into<Box<dyn Error>>) -> Self {
        Self::Getter(SharedError::new(error))
    }

    #[must_use]
    pub fn setter(error: impl Into<Box<dyn Error>>) -> Self {
        Self::Setter(SharedError::new(error))
    }

    /// The user error behind a getter or setter failure.
    #[must_use]
    pub fn user_error(&self) -> Option<&SharedError> {
        match self {
            Self::Getter(e) | Self::Setter(e) => Some(e),
            Self::Abandoned => None,
        }
    }
}

/// Returned by synchronous accessors of a dual-mode value that has no snapshot yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value is not ready; check `ready()` before reading the snapshot")]
pub struct NotReady;

/// Returned by [`CancelToken::check`](crate::cancel::CancelToken::check) once
/// the token has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_user_message() {
        assert_eq!(
            CellError::getter("get failed").to_string(),
            "getter failed: get failed"
        );
        assert_eq!(
            CellError::setter(String::from("set failed")).to_string(),
            "setter failed: set failed"
        );
        assert_eq!(
            CellError::Abandoned.to_string(),
            "operation abandoned before it settled"
        );
    }

    #[test]
    fn shared_error_is_exposed_as_source() {
        let err = CellError::getter("boom");
        let source = err.source().expect("getter error has a source");
        assert_eq!(source.to_string(), "boom");
        assert_eq!(
            err.user_error().map(ToString::to_string).as_deref(),
            Some("boom")
        );
        assert!(CellError::Abandoned.user_error().is_none());
    }

    #[test]
    fn clones_share_the_same_error() {
        let err = SharedError::new("once");
        let other = err.clone();
        assert!(std::ptr::addr_eq(err.inner(), other.inner()));
    }

    #[test]
    fn not_ready_and_cancelled_display() {
        assert!(NotReady.to_string().contains("not ready"));
        assert_eq!(Cancelled.to_string(), "operation cancelled");
    }
}
