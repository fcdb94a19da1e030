use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::oneshot;

use super::idle::{IdleQueue, IdleStore};
use crate::{
    connection::{Connection, Owner, PoolId},
    error::{Error, Result},
    executor::Executors,
    handler::{HealthCheck, PoolHandler},
    roost::Roost,
    transport::Connector,
};

/// Shared pool state and acquire/release orchestration.
pub struct PoolInner {
    /// Connections owned by the pool and available for reuse.
    idle: Arc<dyn IdleStore>,
    /// Opens new transports on demand.
    connector: Arc<dyn Connector>,
    /// Lifecycle callbacks, run on each connection's bound executor.
    handler: Arc<dyn PoolHandler>,
    /// Liveness predicate, run on each connection's bound executor.
    health: Arc<dyn HealthCheck>,
    /// Executor group new connections are bound to, round-robin.
    executors: Executors,
    /// Whether the pool is closed.
    is_closed: AtomicBool,
    /// Event fired when the pool closes.
    on_closed: event_listener::Event,
    /// Pool configuration options.
    pub(super) options: Roost,
}

impl PoolInner {
    /// Create the shared pool state.
    pub(super) fn new_arc(options: Roost, connector: Arc<dyn Connector>) -> Result<Arc<Self>> {
        let executors = match &options.executors {
            Some(executors) => executors.clone(),
            None => {
                let name = Arc::clone(&options.thread_name);
                Executors::with_thread_name(options.executor_threads, move |id| (*name)(id))?
            }
        };

        let idle: Arc<dyn IdleStore> = match &options.idle {
            Some(store) => Arc::clone(store),
            None => Arc::new(IdleQueue::new(options.lifo)),
        };

        Ok(Arc::new(Self {
            idle,
            connector,
            handler: Arc::clone(&options.handler),
            health: Arc::clone(&options.health),
            executors,
            is_closed: AtomicBool::new(false),
            on_closed: event_listener::Event::new(),
            options,
        }))
    }

    /// The value written into ownership slots of connections this pool owns.
    fn id(self: &Arc<Self>) -> PoolId {
        Arc::as_ptr(self) as PoolId
    }

    /// Return the number of idle connections.
    pub(super) fn num_idle(&self) -> usize {
        self.idle.len()
    }

    /// Returns `true` if the pool is closed.
    pub(super) fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    /// Mark the pool as closed and notify listeners.
    fn mark_closed(&self) {
        self.is_closed.store(true, Ordering::Release);
        self.on_closed.notify(usize::MAX);
    }

    /// Close the pool and drain the idle store.
    ///
    /// Connections currently held by callers are unaffected; they are closed
    /// when released.
    pub(super) async fn close(self: &Arc<Self>) {
        self.mark_closed();
        self.drain_idle().await;
    }

    /// Pop and close every parked connection.
    async fn drain_idle(self: &Arc<Self>) {
        while let Some(conn) = self.idle.poll() {
            if let Err(error) = conn.close().await {
                tracing::warn!(%error, id = conn.id(), "error closing idle connection");
            }
        }
    }

    /// A listener that fires when the pool closes; `None` if it already has.
    pub(super) fn close_listener(&self) -> Option<event_listener::EventListener> {
        (!self.is_closed()).then(|| self.on_closed.listen())
    }

    /// Start an acquire and complete `promise` with its outcome.
    ///
    /// Orchestration runs on a spawned task, so the connect keeps going even
    /// if the caller loses interest; a connection produced after the caller
    /// cancelled is released back into the pool rather than leaked.
    pub(super) fn acquire_into(self: &Arc<Self>, promise: oneshot::Sender<Result<Connection>>) {
        let pool = Arc::clone(self);

        tokio::spawn(async move {
            match pool.acquire_connection().await {
                Ok(conn) => {
                    if let Err(Ok(conn)) = promise.send(Ok(conn)) {
                        tracing::debug!(
                            id = conn.id(),
                            "acquire cancelled after connection was produced; returning it"
                        );
                        if let Err(error) = pool.release_connection(conn).await {
                            tracing::error!(
                                %error,
                                "failed to return connection after cancelled acquire"
                            );
                        }
                    }
                }
                Err(error) => {
                    let _ = promise.send(Err(error));
                }
            }
        });
    }

    /// Acquire a healthy connection, waiting for connect and health checks.
    pub(super) async fn acquire(self: &Arc<Self>) -> Result<Connection> {
        let (tx, rx) = oneshot::channel();
        self.acquire_into(tx);
        rx.await.map_err(|_| Error::PoolClosed)?
    }

    /// Attempt to take an idle connection without waiting.
    ///
    /// Skips the health check; the transport-active probe is the only gate.
    /// Lifecycle callbacks still run on the bound executor, ahead of any
    /// later operation on the connection, but a callback failure here closes
    /// the connection in the background instead of failing the acquire.
    pub(super) fn try_acquire(self: &Arc<Self>) -> Option<Connection> {
        if self.is_closed() {
            return None;
        }

        let conn = self.idle.poll()?;
        if !conn.is_active() {
            let dead = conn.clone();
            tokio::spawn(async move {
                let _ = dead.close().await;
            });
            return None;
        }

        conn.set_owner(Owner::Held(self.id()));

        let handler = Arc::clone(&self.handler);
        let callback_conn = conn.clone();
        let submitted = conn.executor().submit(move || {
            if let Err(error) = handler.on_acquired(&callback_conn) {
                tracing::warn!(%error, id = callback_conn.id(), "on_acquired failed; closing connection");
                if let Err(error) = callback_conn.close_on_executor() {
                    tracing::warn!(%error, id = callback_conn.id(), "error closing connection");
                }
            }
        });
        if submitted.is_err() {
            return None;
        }

        Some(conn)
    }

    /// The acquire algorithm: pop-and-check idle candidates until one passes,
    /// falling through to a fresh connect once the store drains.
    async fn acquire_connection(self: &Arc<Self>) -> Result<Connection> {
        loop {
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            let Some(candidate) = self.idle.poll() else {
                return self.connect_new().await;
            };

            if self.check_health(&candidate).await {
                return self.claim(candidate, false).await;
            }

            tracing::debug!(
                id = candidate.id(),
                "pooled connection failed health check; trying the next one"
            );
            if let Err(error) = candidate.close().await {
                tracing::warn!(%error, id = candidate.id(), "error closing unhealthy connection");
            }
        }
    }

    /// Open a fresh connection through the connector.
    async fn connect_new(self: &Arc<Self>) -> Result<Connection> {
        let config = self.options.config.clone();
        let transport = self.connector.connect(&config).await?;
        let conn = Connection::bind(transport, self.executors.next());

        tracing::debug!(
            id = conn.id(),
            endpoint = %config.display(),
            executor = conn.executor().name(),
            "opened connection"
        );

        self.claim(conn, true).await
    }

    /// Tag the connection as held by this pool and run the lifecycle
    /// callbacks on its bound executor. A callback error closes the
    /// connection and fails the acquire with that error.
    async fn claim(self: &Arc<Self>, conn: Connection, fresh: bool) -> Result<Connection> {
        let me = self.id();
        let handler = Arc::clone(&self.handler);
        let callback_conn = conn.clone();

        let callbacks = conn
            .executor()
            .run(move || -> Result<()> {
                callback_conn.set_owner(Owner::Held(me));
                if fresh {
                    handler.on_created(&callback_conn)?;
                }
                handler.on_acquired(&callback_conn)?;
                Ok(())
            })
            .await;

        match callbacks {
            Ok(Ok(())) => Ok(conn),
            Ok(Err(error)) | Err(error) => {
                let _ = conn.close().await;
                Err(error)
            }
        }
    }

    /// Run the health check on the connection's bound executor.
    ///
    /// A check that errors, or an executor that is gone, counts as
    /// unhealthy; nothing surfaces to the caller.
    async fn check_health(&self, conn: &Connection) -> bool {
        let health = Arc::clone(&self.health);
        let check_conn = conn.clone();

        let verdict = conn
            .executor()
            .run_future(move || async move { health.healthy(&check_conn).await })
            .await;

        match verdict {
            Ok(Ok(healthy)) => healthy,
            Ok(Err(error)) => {
                tracing::debug!(%error, id = conn.id(), "health check errored; treating as unhealthy");
                false
            }
            Err(_) => false,
        }
    }

    /// Start a release and complete `promise` with its outcome.
    pub(super) fn release_into(
        self: &Arc<Self>,
        conn: Connection,
        promise: oneshot::Sender<Result<()>>,
    ) {
        let pool = Arc::clone(self);

        tokio::spawn(async move {
            let result = pool.release_connection(conn).await;
            let _ = promise.send(result);
        });
    }

    /// Release a connection and wait for the outcome.
    pub(super) async fn release(self: &Arc<Self>, conn: Connection) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.release_into(conn, tx);
        rx.await.map_err(|_| Error::PoolClosed)?
    }

    /// The release algorithm: validate ownership by atomically clearing the
    /// slot, then health-gate (if configured) and park or discard.
    async fn release_connection(self: &Arc<Self>, conn: Connection) -> Result<()> {
        let me = self.id();

        // The swap runs on the bound executor like every other mutation of
        // the connection.
        let swap_conn = conn.clone();
        let prior = conn.executor().run(move || swap_conn.take_owner()).await?;

        if prior != Owner::Held(me) {
            tracing::debug!(id = conn.id(), ?prior, "misused release; closing connection");
            let _ = conn.close().await;
            return Err(Error::MisusedRelease);
        }

        if self.options.release_health_check && !self.check_health(&conn).await {
            // The transport is already broken; the last handle dropping
            // tears it down. The release itself still succeeds.
            tracing::debug!(id = conn.id(), "released connection unhealthy; discarding");
            return self.notify_released(conn).await;
        }

        self.offer(conn).await
    }

    /// Park the connection in the idle store, or close it if the store (or a
    /// closed pool) declines it.
    async fn offer(self: &Arc<Self>, conn: Connection) -> Result<()> {
        if self.is_closed() {
            tracing::debug!(id = conn.id(), "pool closed; closing released connection");
            if let Err(error) = conn.close().await {
                tracing::warn!(%error, id = conn.id(), "error closing released connection");
            }
            return Ok(());
        }

        // The slot is re-tagged before the push so any observer that finds
        // the connection in the store also sees this pool in its slot.
        conn.set_owner(Owner::Idle(self.id()));

        if self.idle.offer(conn.clone()) {
            // close() may have finished draining between the check above
            // and the push; sweep again so nothing is stranded in a closed
            // pool's store.
            if self.is_closed() {
                self.drain_idle().await;
            }
            self.notify_released(conn).await
        } else {
            let _ = conn.close().await;
            Err(Error::PoolFull)
        }
    }

    /// Fire `on_released` on the bound executor. A callback error closes the
    /// connection and fails the release with that error.
    async fn notify_released(self: &Arc<Self>, conn: Connection) -> Result<()> {
        let handler = Arc::clone(&self.handler);
        let callback_conn = conn.clone();

        let outcome = conn
            .executor()
            .run(move || handler.on_released(&callback_conn))
            .await;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) | Err(error) => {
                let _ = conn.close().await;
                Err(error)
            }
        }
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.mark_closed();
    }
}
