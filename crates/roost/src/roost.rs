use std::{fmt, sync::Arc, thread};

use crate::{
    Result,
    executor::Executors,
    handler::{ActiveCheck, HealthCheck, NoopHandler, PoolHandler},
    pool::{IdleStore, Pool},
    transport::{ConnectConfig, Connector},
};

/// Configure and open a roost [`Pool`].
///
/// All options have defaults: an unbounded LIFO idle store, a health check
/// on release, the transport-active health check, no-op lifecycle callbacks,
/// and an executor group sized to the machine.
#[derive(Clone)]
pub struct Roost {
    pub(crate) config: ConnectConfig,
    pub(crate) release_health_check: bool,
    pub(crate) lifo: bool,
    pub(crate) executor_threads: usize,
    pub(crate) thread_name: Arc<dyn Fn(u64) -> String + Send + Sync>,
    pub(crate) handler: Arc<dyn PoolHandler>,
    pub(crate) health: Arc<dyn HealthCheck>,
    pub(crate) idle: Option<Arc<dyn IdleStore>>,
    pub(crate) executors: Option<Executors>,
}

impl Default for Roost {
    fn default() -> Self {
        Self::new()
    }
}

impl Roost {
    /// Construct `Self` with default options.
    ///
    /// See the source of this method for the current defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ConnectConfig::default(),
            release_health_check: true,
            lifo: true,
            executor_threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(4),
            thread_name: Arc::new(|id| format!("roost-io-{id}")),
            handler: Arc::new(NoopHandler),
            health: Arc::new(ActiveCheck),
            idle: None,
            executors: None,
        }
    }

    /// Set the remote endpoint handed to the connector on every connect.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Add a free-form connect parameter for the connector to interpret.
    #[must_use]
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.config = self.config.param(key, value);
        self
    }

    /// Replace the whole connect configuration.
    #[must_use]
    pub fn connect_config(mut self, config: ConnectConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether released connections are health-checked before being parked.
    ///
    /// When disabled, releases go straight to the idle store. Enabled by
    /// default.
    #[must_use]
    pub fn release_health_check(mut self, on: bool) -> Self {
        self.release_health_check = on;
        self
    }

    /// Select the idle store pop policy.
    ///
    /// LIFO (the default) hands out the most recently released connection,
    /// which keeps a small working set warm and lets the tail idle out;
    /// FIFO hands out the least recently released one.
    #[must_use]
    pub fn lifo(mut self, lifo: bool) -> Self {
        self.lifo = lifo;
        self
    }

    /// Set the number of executor threads spawned for a new pool.
    ///
    /// Ignored when an existing [`Executors`] group is supplied via
    /// [`Roost::executors`]. Clamped to at least one thread.
    #[must_use]
    pub fn executor_threads(mut self, threads: usize) -> Self {
        self.executor_threads = threads;
        self
    }

    /// Provide a callback to generate the name of the executor threads.
    ///
    /// The value passed to the callback is an auto-incremented integer for
    /// use as the thread ID.
    #[must_use]
    pub fn thread_name(mut self, generator: impl Fn(u64) -> String + Send + Sync + 'static) -> Self {
        self.thread_name = Arc::new(generator);
        self
    }

    /// Share an existing executor group instead of spawning a new one.
    ///
    /// Connections opened by the pool are bound round-robin to the group's
    /// threads; the group may be shared between pools.
    #[must_use]
    pub fn executors(mut self, executors: Executors) -> Self {
        self.executors = Some(executors);
        self
    }

    /// Install lifecycle callbacks. The default handler does nothing.
    #[must_use]
    pub fn handler(mut self, handler: impl PoolHandler) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Replace the health check. The default check reports a connection
    /// healthy iff its transport is active.
    #[must_use]
    pub fn health_check(mut self, health: impl HealthCheck) -> Self {
        self.health = Arc::new(health);
        self
    }

    /// Replace the idle store.
    ///
    /// The supplied store decides both the pop policy and whether to accept
    /// a released connection; declining one surfaces as
    /// [`Error::PoolFull`](crate::Error::PoolFull) to the releasing caller.
    /// When a store is supplied, [`Roost::lifo`] has no effect.
    #[must_use]
    pub fn idle_store(mut self, store: impl IdleStore) -> Self {
        self.idle = Some(Arc::new(store));
        self
    }

    /// Open a pool that connects through the given connector.
    pub fn open(self, connector: impl Connector) -> Result<Pool> {
        Pool::new(self, Arc::new(connector))
    }

    /// Open a pool with an already-shared connector.
    pub fn open_shared(self, connector: Arc<dyn Connector>) -> Result<Pool> {
        Pool::new(self, connector)
    }
}

impl fmt::Debug for Roost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roost")
            .field("endpoint", &self.config.endpoint)
            .field("release_health_check", &self.release_health_check)
            .field("lifo", &self.lifo)
            .field("executor_threads", &self.executor_threads)
            .finish()
    }
}
