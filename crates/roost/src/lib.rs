//! An asynchronous pool for long-lived network connections.
//!
//! Connections are opened on demand through a user-supplied
//! [`Connector`], bound for life to a single-threaded [`Executor`], and
//! handed out by [`Pool::acquire`] only after passing an executor-affine
//! health check. Callers hand them back explicitly with [`Pool::release`];
//! the pool validates ownership atomically, so double releases and
//! cross-pool releases fail instead of corrupting the idle store.
//!
//! A small [`chunked`] module wraps lazy byte sources into chunked HTTP
//! bodies for the transports built on top of the pool.

/// Chunked HTTP body streaming.
pub mod chunked;
/// Connection handle and ownership tracking.
mod connection;
/// Error types and result helpers.
pub mod error;
/// Single-threaded executor group for connection affinity.
mod executor;
/// Lifecycle callbacks and health checks.
mod handler;
/// Connection pool implementation.
mod pool;
/// Pool options and configuration.
mod roost;
/// Transport and connector seams.
mod transport;

pub use crate::{
    chunked::{ChunkSource, ChunkedBody, Content, Trailers},
    connection::Connection,
    error::{Error, Result},
    executor::{Executor, Executors},
    handler::{ActiveCheck, HealthCheck, NoopHandler, PoolHandler},
    pool::{CloseEvent, IdleStore, Pool},
    roost::Roost,
    transport::{ConnectConfig, Connector, Transport},
};
