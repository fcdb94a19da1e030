//! Provides the connection pool for long-lived network connections.
//!
//! Opening a fresh connection for every request is expensive: sockets must
//! be established, handshakes run, caches warmed. A pool keeps healthy
//! connections around between uses and hands them out on demand, opening new
//! ones only when none are idle.
//!
//! Connections stay permanently bound to a single executor thread; the pool
//! trampolines health checks, lifecycle callbacks and ownership changes onto
//! that thread, so transports never need their own locking.
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use event_listener::EventListener;
use tokio::sync::oneshot;

use self::inner::PoolInner;
use crate::{Connection, Error, Result, roost::Roost, transport::Connector};

mod idle;
mod inner;

pub use self::idle::IdleStore;

/// An asynchronous pool of network connections.
///
/// Configure and create a pool with [`Roost`](crate::Roost), then call
/// [`Pool::acquire`] to get a connection and [`Pool::release`] to hand it
/// back when done. Releasing is explicit: the pool validates that the
/// connection really came from it before parking it for reuse.
///
/// There is no cap on the number of connections; [`Pool::acquire`] never
/// waits for another caller, it opens a fresh connection instead. A
/// user-supplied [`IdleStore`] may decline released connections, which
/// surfaces as [`Error::PoolFull`] to the releasing caller.
///
/// `Pool` is `Send`, `Sync` and `Clone`. Cloning is cheap as it is simply a
/// reference-counted handle to the inner pool state; clones share their
/// connections. Call [`.close().await`] to close the idle connections when
/// you are done; connections currently held by callers are closed as they
/// come back.
///
/// [`.close().await`]: Pool::close
pub struct Pool(pub(crate) Arc<PoolInner>);

impl Pool {
    pub(crate) fn new(options: Roost, connector: Arc<dyn Connector>) -> Result<Pool> {
        Ok(Pool(PoolInner::new_arc(options, connector)?))
    }

    /// Retrieves a healthy connection from the pool.
    ///
    /// Idle connections are health-checked on their bound executor before
    /// being handed out; unhealthy ones are closed and the next candidate is
    /// tried. Once the idle store drains, a fresh connection is opened
    /// through the connector and connect errors surface here.
    ///
    /// Dropping the returned future after the pool has already produced a
    /// connection does not leak it: the pool notices and parks the
    /// connection for the next caller.
    pub async fn acquire(&self) -> Result<Connection> {
        self.0.acquire().await
    }

    /// Like [`Pool::acquire`], but completes the supplied promise instead of
    /// returning a future.
    pub fn acquire_into(&self, promise: oneshot::Sender<Result<Connection>>) {
        self.0.acquire_into(promise)
    }

    /// Attempts to retrieve an idle connection without waiting.
    ///
    /// Returns `None` immediately if the pool is closed or no idle
    /// connection is instantly claimable. The asynchronous health check is
    /// skipped; only the transport-active probe gates the handout.
    pub fn try_acquire(&self) -> Option<Connection> {
        self.0.try_acquire()
    }

    /// Returns a connection to the pool for reuse.
    ///
    /// Fails with [`Error::MisusedRelease`] (and closes the connection) if
    /// it was not acquired from this pool, including the case where it
    /// already was released once. When the release health check is enabled
    /// and the connection fails it, the release still succeeds but the
    /// connection is discarded instead of parked.
    pub async fn release(&self, conn: Connection) -> Result<()> {
        self.0.release(conn).await
    }

    /// Like [`Pool::release`], but completes the supplied promise instead of
    /// returning a future.
    pub fn release_into(&self, conn: Connection, promise: oneshot::Sender<Result<()>>) {
        self.0.release_into(conn, promise)
    }

    /// Shut down the pool.
    ///
    /// Drains the idle store and closes every parked connection. Checked-out
    /// connections are unaffected; they are closed when their holders
    /// release them. Subsequent [`Pool::acquire`] calls fail with
    /// [`Error::PoolClosed`].
    ///
    /// `.close()` may be safely called and `.await`ed on multiple handles
    /// concurrently.
    pub async fn close(&self) {
        self.0.close().await
    }

    /// Returns `true` if [`.close()`][Pool::close] has been called on the
    /// pool, `false` otherwise.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Get a future that resolves when [`Pool::close()`] is called.
    ///
    /// If the pool is already closed, the future resolves immediately.
    ///
    /// This can be used to cancel long-running operations that hold onto a
    /// [`Connection`] so they don't keep a dying pool's connections alive.
    pub fn close_event(&self) -> CloseEvent {
        CloseEvent {
            listener: self.0.close_listener(),
        }
    }

    /// Returns the number of connections currently parked in the idle store.
    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }
}

/// Returns a new [Pool] tied to the same shared connection pool.
impl Clone for Pool {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Pool")
            .field("num_idle", &self.0.num_idle())
            .field("is_closed", &self.0.is_closed())
            .field("options", &self.0.options)
            .finish()
    }
}

/// A future that resolves when the pool is closed.
///
/// See [`Pool::close_event()`] for details.
pub struct CloseEvent {
    listener: Option<EventListener>,
}

impl CloseEvent {
    /// Run `fut` unless the pool closes first.
    ///
    /// Returns `Err(PoolClosed)` as soon as the pool closes; a pool that
    /// was already closed means `fut` is never polled at all. This is how
    /// callers put their own deadline or shutdown bound on work that holds
    /// a [`Connection`].
    pub async fn do_until<Fut: Future>(&mut self, fut: Fut) -> Result<Fut::Output> {
        tokio::select! {
            biased;
            _ = &mut *self => Err(Error::PoolClosed),
            output = fut => Ok(output),
        }
    }
}

impl Future for CloseEvent {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(listener) = self.listener.as_mut() else {
            // Either the pool was closed before this event was created, or
            // the event already fired on an earlier poll.
            return Poll::Ready(());
        };

        match Pin::new(listener).poll(cx) {
            Poll::Ready(()) => {
                // The listener must not be polled again after it yields;
                // dropping it also keeps this future fused.
                self.listener = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[test]
#[allow(dead_code)]
fn assert_pool_traits() {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_clone<T: Clone>() {}

    fn assert_pool() {
        assert_send_sync::<Pool>();
        assert_clone::<Pool>();
    }
}
