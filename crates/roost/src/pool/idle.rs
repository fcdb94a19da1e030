use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::connection::Connection;

/// Storage for connections the pool owns but no caller holds.
///
/// Implementations must be safe for concurrent producers and consumers.
/// `offer` may decline a connection, which the pool surfaces to the
/// releasing caller as [`Error::PoolFull`](crate::Error::PoolFull); the
/// default store is unbounded and never declines.
pub trait IdleStore: Send + Sync + 'static {
    /// Park a released connection. Returns `false` to decline it.
    fn offer(&self, conn: Connection) -> bool;

    /// Take a parked connection, or `None` if the store is empty.
    ///
    /// Which end gets popped is the implementation's policy decision.
    fn poll(&self) -> Option<Connection>;

    /// The number of parked connections.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default idle store: an unbounded deque popped LIFO or FIFO.
pub(crate) struct IdleQueue {
    conns: Mutex<VecDeque<Connection>>,
    /// Maintained separately so `len()` doesn't contend on the queue lock.
    len: AtomicUsize,
    lifo: bool,
}

impl IdleQueue {
    pub(crate) fn new(lifo: bool) -> Self {
        Self {
            conns: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
            lifo,
        }
    }
}

impl IdleStore for IdleQueue {
    fn offer(&self, conn: Connection) -> bool {
        let Ok(mut conns) = self.conns.lock() else {
            return false;
        };
        conns.push_back(conn);
        self.len.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn poll(&self) -> Option<Connection> {
        let mut conns = self.conns.lock().ok()?;
        let conn = if self.lifo {
            conns.pop_back()
        } else {
            conns.pop_front()
        }?;
        self.len.fetch_sub(1, Ordering::AcqRel);
        Some(conn)
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }
}
