//! Types for working with errors produced by roost.

use std::io;
use std::sync::PoisonError;

/// A specialized `Result` type for roost.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents all the ways a method can fail within roost.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error communicating with the remote endpoint.
    #[error("error communicating with remote endpoint: {0}")]
    Io(#[from] io::Error),

    /// Unexpected or invalid data encountered on the connection.
    ///
    /// This should indicate there is a programming error in the transport
    /// implementation or that the connection itself is corrupted.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// A connection was released to a pool that does not own it.
    ///
    /// This is raised both for releases to the wrong pool and for a second
    /// release of the same connection: the first release clears the
    /// ownership slot, so the second one no longer matches.
    #[error("connection released to a pool that does not own it")]
    MisusedRelease,

    /// The idle store declined to take a released connection back.
    ///
    /// The default store is unbounded and never declines; a user-supplied
    /// [`IdleStore`](crate::IdleStore) may impose a cap.
    #[error("idle store rejected the released connection")]
    PoolFull,

    /// [`Pool::close`] was called while we were waiting in [`Pool::acquire`].
    ///
    /// [`Pool::acquire`]: crate::Pool::acquire
    /// [`Pool::close`]: crate::Pool::close
    #[error("attempted to acquire a connection from a closed pool")]
    PoolClosed,

    /// The bound executor for a connection has stopped processing tasks.
    #[error("attempted to run a task on a stopped executor")]
    ExecutorStopped,
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::ExecutorStopped
    }
}
