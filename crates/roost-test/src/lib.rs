//! Test support for roost: an in-memory transport, a scriptable connector
//! and a recording pool handler.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use roost::{
    ConnectConfig, Connection, Connector, Error, Pool, PoolHandler, Result, Roost, Transport,
};

/// A transport that exists only in memory, with liveness a test can flip.
pub struct MemoryTransport {
    active: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Transport for MemoryTransport {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// A test's view of one transport the [`TestConnector`] produced, in the
/// order they were opened.
#[derive(Clone)]
pub struct TransportHandle {
    active: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl TransportHandle {
    /// Flip the transport's liveness signal.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Whether the pool closed this transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A connector producing [`MemoryTransport`]s, with failure and latency
/// injection.
#[derive(Clone, Default)]
pub struct TestConnector {
    inner: Arc<ConnectorInner>,
}

#[derive(Default)]
struct ConnectorInner {
    connects: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    handles: Mutex<Vec<TransportHandle>>,
}

impl TestConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many connects have succeeded.
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::Acquire)
    }

    /// Make every subsequent connect fail.
    pub fn set_fail(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::Release);
    }

    /// Delay every subsequent connect by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.inner.delay.lock().unwrap() = delay;
    }

    /// Handles to every transport produced so far, in open order.
    pub fn handles(&self) -> Vec<TransportHandle> {
        self.inner.handles.lock().unwrap().clone()
    }
}

impl Connector for TestConnector {
    fn connect(&self, _config: &ConnectConfig) -> BoxFuture<'static, Result<Box<dyn Transport>>> {
        let inner = Arc::clone(&self.inner);

        async move {
            let delay = *inner.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if inner.fail.load(Ordering::Acquire) {
                return Err(Error::Protocol("connect refused by test connector".into()));
            }

            let active = Arc::new(AtomicBool::new(true));
            let closed = Arc::new(AtomicBool::new(false));
            inner.handles.lock().unwrap().push(TransportHandle {
                active: Arc::clone(&active),
                closed: Arc::clone(&closed),
            });
            inner.connects.fetch_add(1, Ordering::AcqRel);

            Ok(Box::new(MemoryTransport { active, closed }) as Box<dyn Transport>)
        }
        .boxed()
    }
}

/// What a [`RecordingHandler`] saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Acquired,
    Released,
}

#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
    pub conn_id: u64,
    /// Whether the callback ran on the connection's bound executor.
    pub on_executor: bool,
}

/// A pool handler that records every callback, with failure injection.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    inner: Arc<HandlerInner>,
}

#[derive(Default)]
struct HandlerInner {
    events: Mutex<Vec<Event>>,
    fail_created: AtomicBool,
    fail_acquired: AtomicBool,
    fail_released: AtomicBool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().unwrap().clone()
    }

    /// `(created, acquired, released)` counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let events = self.inner.events.lock().unwrap();
        let count = |kind| events.iter().filter(|e| e.kind == kind).count();
        (
            count(EventKind::Created),
            count(EventKind::Acquired),
            count(EventKind::Released),
        )
    }

    /// Whether every recorded callback ran on its connection's executor.
    pub fn all_on_executor(&self) -> bool {
        self.inner.events.lock().unwrap().iter().all(|e| e.on_executor)
    }

    pub fn set_fail_created(&self, fail: bool) {
        self.inner.fail_created.store(fail, Ordering::Release);
    }

    pub fn set_fail_acquired(&self, fail: bool) {
        self.inner.fail_acquired.store(fail, Ordering::Release);
    }

    pub fn set_fail_released(&self, fail: bool) {
        self.inner.fail_released.store(fail, Ordering::Release);
    }

    fn record(&self, kind: EventKind, conn: &Connection, fail: &AtomicBool) -> Result<()> {
        self.inner.events.lock().unwrap().push(Event {
            kind,
            conn_id: conn.id(),
            on_executor: conn.executor().is_current(),
        });

        if fail.load(Ordering::Acquire) {
            return Err(Error::Protocol(format!("{kind:?} rejected by test handler")));
        }
        Ok(())
    }
}

impl PoolHandler for RecordingHandler {
    fn on_created(&self, conn: &Connection) -> Result<()> {
        self.record(EventKind::Created, conn, &self.inner.fail_created)
    }

    fn on_acquired(&self, conn: &Connection) -> Result<()> {
        self.record(EventKind::Acquired, conn, &self.inner.fail_acquired)
    }

    fn on_released(&self, conn: &Connection) -> Result<()> {
        self.record(EventKind::Released, conn, &self.inner.fail_released)
    }
}

/// Pool options every test starts from.
pub fn roost() -> Roost {
    Roost::new()
        .endpoint("test.invalid:0")
        .executor_threads(2)
        .thread_name(|id| format!("roost-test-io-{id}"))
}

/// A default pool wired to fresh test doubles.
pub fn pool() -> anyhow::Result<(Pool, TestConnector, RecordingHandler)> {
    let connector = TestConnector::new();
    let handler = RecordingHandler::new();
    let pool = roost()
        .handler(handler.clone())
        .open(connector.clone())?;
    Ok((pool, connector, handler))
}
