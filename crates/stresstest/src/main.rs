use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::Parser;
use futures::FutureExt;
use futures::future::BoxFuture;
use rand::Rng;

use roost::{ConnectConfig, Connector, Result, Roost, Transport};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of acquire/release cycles per worker
    #[arg(short, long, default_value_t = 10000)]
    iterations: u64,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 16)]
    concurrency: usize,

    /// Maximum per-cycle hold time in microseconds
    #[arg(long, default_value_t = 50)]
    hold_us: u64,

    /// Probability (percent) of cancelling an acquire mid-flight
    #[arg(long, default_value_t = 5)]
    cancel_pct: u32,

    /// Number of executor threads
    #[arg(long, default_value_t = 4)]
    executor_threads: usize,

    /// Use FIFO instead of LIFO idle selection
    #[arg(long, default_value_t = false)]
    fifo: bool,
}

/// A transport that goes nowhere; connect cost is simulated.
struct LoopbackTransport {
    active: AtomicBool,
}

impl Transport for LoopbackTransport {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn close(&mut self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        Ok(())
    }
}

struct LoopbackConnector {
    connects: Arc<AtomicU64>,
}

impl Connector for LoopbackConnector {
    fn connect(&self, _config: &ConnectConfig) -> BoxFuture<'static, Result<Box<dyn Transport>>> {
        let connects = Arc::clone(&self.connects);
        async move {
            // A connect is never free; pretend the handshake costs a bit.
            tokio::time::sleep(Duration::from_micros(200)).await;
            connects.fetch_add(1, Ordering::AcqRel);
            Ok(Box::new(LoopbackTransport {
                active: AtomicBool::new(true),
            }) as Box<dyn Transport>)
        }
        .boxed()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let connects = Arc::new(AtomicU64::new(0));
    let pool = Roost::new()
        .endpoint("loopback:0")
        .lifo(!args.fifo)
        .executor_threads(args.executor_threads)
        .open(LoopbackConnector {
            connects: Arc::clone(&connects),
        })?;

    let cycles = Arc::new(AtomicU64::new(0));
    let cancels = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let mut workers = Vec::with_capacity(args.concurrency);
    for _ in 0..args.concurrency {
        let pool = pool.clone();
        let cycles = Arc::clone(&cycles);
        let cancels = Arc::clone(&cancels);

        workers.push(tokio::spawn(async move {
            for _ in 0..args.iterations {
                if rand::rng().random_range(0..100) < args.cancel_pct {
                    // Start an acquire and immediately walk away; the pool
                    // parks whatever the connector produces later.
                    let (tx, rx) = tokio::sync::oneshot::channel();
                    pool.acquire_into(tx);
                    drop(rx);
                    cancels.fetch_add(1, Ordering::AcqRel);
                    continue;
                }

                let conn = pool.acquire().await?;
                let hold = rand::rng().random_range(0..=args.hold_us);
                if hold > 0 {
                    tokio::time::sleep(Duration::from_micros(hold)).await;
                }
                pool.release(conn).await?;
                cycles.fetch_add(1, Ordering::AcqRel);
            }
            anyhow::Ok(())
        }));
    }

    for worker in workers {
        worker.await??;
    }

    let elapsed = start.elapsed();
    let done = cycles.load(Ordering::Acquire);
    println!(
        "cycles: {} | cancels: {} | connects: {} | idle at end: {} | elapsed: {:.2?} | cycles/sec: {:.0}",
        done,
        cancels.load(Ordering::Acquire),
        connects.load(Ordering::Acquire),
        pool.num_idle(),
        elapsed,
        done as f64 / elapsed.as_secs_f64(),
    );

    pool.close().await;

    Ok(())
}
