use std::{
    fmt::{self, Debug, Formatter},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use crate::{
    error::Result,
    executor::Executor,
    transport::Transport,
};

/// Identifies a pool in a connection's ownership slot.
///
/// The value is the address of the pool's shared state, so it is unique for
/// the pool's lifetime and word-aligned: bit 0 is always free.
pub(crate) type PoolId = usize;

const UNOWNED: usize = 0;
const IDLE_BIT: usize = 1;

/// Decoded value of the ownership slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Owner {
    /// No pool claims the connection.
    Unowned,
    /// A caller of the identified pool holds the connection.
    Held(PoolId),
    /// The connection is parked in the identified pool's idle store.
    Idle(PoolId),
}

impl Owner {
    fn decode(raw: usize) -> Owner {
        if raw == UNOWNED {
            Owner::Unowned
        } else if raw & IDLE_BIT == IDLE_BIT {
            Owner::Idle(raw & !IDLE_BIT)
        } else {
            Owner::Held(raw)
        }
    }

    fn encode(self) -> usize {
        match self {
            Owner::Unowned => UNOWNED,
            Owner::Held(pool) => pool,
            Owner::Idle(pool) => pool | IDLE_BIT,
        }
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A live network connection managed by a [`Pool`](crate::Pool).
///
/// `Connection` is a cheap reference-counted handle; clones refer to the
/// same underlying transport. The transport itself is only ever touched on
/// the connection's bound executor thread.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    id: u64,
    executor: Executor,
    /// Locked only from the bound executor thread (and for the cheap
    /// `is_active` probe); never held across an await.
    transport: Mutex<Box<dyn Transport>>,
    owner: AtomicUsize,
    closed: AtomicBool,
}

impl Connection {
    pub(crate) fn bind(transport: Box<dyn Transport>, executor: Executor) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
                executor,
                transport: Mutex::new(transport),
                owner: AtomicUsize::new(UNOWNED),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// A process-unique id, for logging.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The single-threaded executor this connection is bound to.
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Whether the transport still reports itself usable.
    ///
    /// Returns `false` once the connection has been closed.
    pub fn is_active(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.inner
            .transport
            .lock()
            .map(|transport| transport.is_active())
            .unwrap_or(false)
    }

    /// Returns `true` once [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the connection.
    ///
    /// Idempotent: the first call tears the transport down on the bound
    /// executor, later calls return `Ok` immediately. The ownership slot is
    /// cleared before teardown, which also breaks the reference cycle
    /// between the pool and the connection.
    pub async fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        let conn = self.clone();
        self.inner
            .executor
            .run(move || conn.close_on_executor())
            .await?
    }

    /// Synchronous close for code already running on the bound executor.
    pub(crate) fn close_on_executor(&self) -> Result<()> {
        debug_assert!(self.inner.executor.is_current());

        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.inner.owner.store(UNOWNED, Ordering::Release);
        self.inner.transport.lock()?.close()
    }

    /// Two handles are the same connection iff they share the transport.
    pub fn same(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_owner(&self, owner: Owner) {
        self.inner.owner.store(owner.encode(), Ordering::Release);
    }

    /// Atomically clear the ownership slot, returning the prior owner.
    ///
    /// This swap is the linearization point for release validation.
    pub(crate) fn take_owner(&self) -> Owner {
        Owner::decode(self.inner.owner.swap(UNOWNED, Ordering::AcqRel))
    }

    pub(crate) fn owner(&self) -> Owner {
        Owner::decode(self.inner.owner.load(Ordering::Acquire))
    }
}

impl Debug for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("owner", &self.owner())
            .field("closed", &self.is_closed())
            .finish()
    }
}
