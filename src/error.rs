//! Error types for sequence mutation and view maintenance.

use {
    std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError},
    thiserror::Error,
};

/// Errors raised by sequences, emitters and materialized views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A count or length argument is unusable (e.g. overflows the index space).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An index lies outside the current bounds.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A mutation or pipeline run was attempted while a notification for the
    /// same object is still in flight.
    #[error("reentrant mutation during an active notification")]
    ReentrancyViolation,

    /// Auxiliary bookkeeping disagrees with itself. Indicates a bug upstream.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Change-log sink failed to write.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Change-log sink failed to encode or decode a record.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            ViewError::Io(err.into())
        } else {
            ViewError::Serialization(err.to_string())
        }
    }
}

impl From<bincode::Error> for ViewError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(err) => ViewError::Io(err),
            other => ViewError::Serialization(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Checks `index < len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(ViewError::IndexOutOfRange { index, len })
    }
}

/// Acquire a write lock without blocking.
///
/// On a single timeline the lock can only be held if we are being re-entered
/// from a callback, so a busy lock is reported as [`ViewError::ReentrancyViolation`].
pub(crate) fn try_write<T: ?Sized>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    match lock.try_write() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => {
            tracing::warn!("rejected reentrant write");
            Err(ViewError::ReentrancyViolation)
        }
        Err(TryLockError::Poisoned(_)) => Err(ViewError::InconsistentState(
            "lock poisoned by an earlier panic".into(),
        )),
    }
}

/// Read counterpart of [`try_write`].
pub(crate) fn try_read<T: ?Sized>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    match lock.try_read() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => {
            tracing::warn!("rejected reentrant read");
            Err(ViewError::ReentrancyViolation)
        }
        Err(TryLockError::Poisoned(_)) => Err(ViewError::InconsistentState(
            "lock poisoned by an earlier panic".into(),
        )),
    }
}
