use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
};

use tokio::sync::oneshot;

use crate::error::{Error, Result};

// Each connection is permanently bound to a single executor thread. It's
// possible to multiplex connections over a shared reactor instead, but a
// dedicated thread per executor keeps every mutation of a connection on one
// thread without any locking discipline leaking into the transport.

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A group of single-threaded executors.
///
/// Connections are bound to one member executor for their whole lifetime;
/// the pool picks members round-robin as it opens new connections. Cloning
/// the group is cheap and all clones share the same worker threads.
#[derive(Clone)]
pub struct Executors {
    inner: Arc<ExecutorsInner>,
}

struct ExecutorsInner {
    workers: Vec<Executor>,
    next: AtomicUsize,
}

impl Executors {
    /// Spawn a group of `threads` executors with default thread names.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_thread_name(threads, |id| format!("roost-io-{id}"))
    }

    /// Spawn a group of `threads` executors, naming each thread with the
    /// given generator. The value passed to the generator is an
    /// auto-incremented integer for use as the thread ID.
    pub fn with_thread_name(
        threads: usize,
        name: impl Fn(u64) -> String,
    ) -> Result<Self> {
        let count = threads.max(1);
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            workers.push(Executor::spawn(name(id as u64))?);
        }

        Ok(Self {
            inner: Arc::new(ExecutorsInner {
                workers,
                next: AtomicUsize::new(0),
            }),
        })
    }

    /// Pick the executor for the next new connection.
    pub fn next(&self) -> Executor {
        let at = self.inner.next.fetch_add(1, Ordering::Relaxed);
        self.inner.workers[at % self.inner.workers.len()].clone()
    }

    /// The number of worker threads in this group.
    pub fn len(&self) -> usize {
        self.inner.workers.len()
    }

    /// Returns `true` if the group has no workers. Never true in practice:
    /// construction clamps the thread count to at least one.
    pub fn is_empty(&self) -> bool {
        self.inner.workers.is_empty()
    }
}

impl std::fmt::Debug for Executors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executors")
            .field("threads", &self.inner.workers.len())
            .finish()
    }
}

/// Handle to one single-threaded executor.
///
/// The worker thread drains submitted tasks in order and exits once every
/// handle clone is gone.
#[derive(Clone)]
pub struct Executor {
    shared: Arc<ExecutorShared>,
}

struct ExecutorShared {
    task_tx: flume::Sender<Task>,
    thread_id: ThreadId,
    name: String,
}

impl Executor {
    pub(crate) fn spawn(name: String) -> Result<Self> {
        let (task_tx, task_rx) = flume::unbounded::<Task>();
        let (id_tx, id_rx) = flume::bounded(1);

        thread::Builder::new().name(name.clone()).spawn(move || {
            let _ = id_tx.send(thread::current().id());
            for task in task_rx {
                task();
            }
        })?;

        let thread_id = id_rx.recv().map_err(|_| Error::ExecutorStopped)?;

        Ok(Self {
            shared: Arc::new(ExecutorShared {
                task_tx,
                thread_id,
                name,
            }),
        })
    }

    /// Returns `true` if the calling thread is this executor's worker thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.shared.thread_id
    }

    /// Queue a task for the worker thread without waiting for it to run.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.shared
            .task_tx
            .send(Box::new(task))
            .map_err(|_| Error::ExecutorStopped)
    }

    /// Run `f` on the worker thread and return its result.
    ///
    /// Runs inline when the caller is already on the worker thread, so
    /// executor-affine code can call back into itself without deadlocking.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        self.submit(move || {
            let _ = tx.send(f());
        })?;
        rx.await.map_err(|_| Error::ExecutorStopped)
    }

    /// Run the future produced by `f` to completion on the worker thread.
    ///
    /// The future is constructed and driven entirely on the worker, which
    /// blocks until it resolves; submissions queued behind it wait. Health
    /// checks are expected to be short.
    pub async fn run_future<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T>,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(futures_executor::block_on(f()));
        }

        let (tx, rx) = oneshot::channel();
        self.submit(move || {
            let _ = tx.send(futures_executor::block_on(f()));
        })?;
        rx.await.map_err(|_| Error::ExecutorStopped)
    }

    /// The configured thread name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.shared.name)
            .field("thread_id", &self.shared.thread_id)
            .finish()
    }
}
