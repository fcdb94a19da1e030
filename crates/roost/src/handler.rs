use futures_core::future::BoxFuture;
use futures_util::FutureExt;

use crate::{connection::Connection, error::Result};

/// Lifecycle callbacks a [`Pool`](crate::Pool) fires as connections move
/// through it.
///
/// Every callback runs synchronously on the connection's bound executor:
/// `on_created` once per connection right after the connector produced it,
/// `on_acquired` before an acquire completes (for fresh and pooled
/// connections alike), `on_released` after the connection has been parked in
/// the idle store or discarded. Returning an error closes the connection and
/// fails the in-flight operation with that error.
pub trait PoolHandler: Send + Sync + 'static {
    fn on_created(&self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn on_acquired(&self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn on_released(&self, _conn: &Connection) -> Result<()> {
        Ok(())
    }
}

/// The default handler: every callback is a no-op.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl PoolHandler for NoopHandler {}

/// Asynchronous liveness predicate over a connection.
///
/// Called by the pool on the connection's bound executor before handing a
/// pooled connection to a caller, and (if enabled) when one is released. A
/// future that resolves to `Err` counts as unhealthy; the error is never
/// surfaced to callers.
pub trait HealthCheck: Send + Sync + 'static {
    fn healthy(&self, conn: &Connection) -> BoxFuture<'static, Result<bool>>;
}

/// The default health check: healthy iff the transport reports itself
/// active.
#[derive(Debug, Default)]
pub struct ActiveCheck;

impl HealthCheck for ActiveCheck {
    fn healthy(&self, conn: &Connection) -> BoxFuture<'static, Result<bool>> {
        let active = conn.is_active();
        async move { Ok(active) }.boxed()
    }
}
