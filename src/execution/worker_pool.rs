//! Worker Pool for parallel batch execution
//!
//! A dedicated rayon `ThreadPool` with named threads, optional admission
//! control and an explicit shutdown that waits for submitted work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use crate::config::WorkerPoolConfig;
use crate::error::{BatchError, BatchResult, PanicFault};
use crate::execution::thread_factory::NamedThreadFactory;

static GLOBAL_POOL: OnceLock<WorkerPool> = OnceLock::new();

/// Fixed-size pool of named worker threads.
///
/// The pool is an explicitly owned resource: it starts its workers on
/// construction and stops them on `shutdown` or drop, once every submitted
/// task has finished. Each submitted task executes exactly once; a panicking
/// task is logged and does not take its worker down.
///
/// # Examples
///
/// ```rust
/// use batcher_core::execution::WorkerPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let pool = WorkerPool::with_workers(2).unwrap();
/// let hits = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let hits = Arc::clone(&hits);
///     pool.execute(move || {
///         hits.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
/// }
/// pool.shutdown();
/// assert_eq!(hits.load(Ordering::SeqCst), 10);
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    /// Running pool; `None` once shut down
    state: Mutex<Option<PoolState>>,

    /// One slot per task submitted but not yet finished, when bounded
    admission: Option<(Sender<()>, Receiver<()>)>,

    /// Pool configuration
    config: WorkerPoolConfig,

    /// Thread naming, for diagnostics
    factory: NamedThreadFactory,

    stats: Arc<PoolStats>,
}

#[derive(Debug)]
struct PoolState {
    pool: ThreadPool,
    /// Held by every task still queued or running
    in_flight: WaitGroup,
}

/// Counters maintained by the worker threads
#[derive(Debug, Default)]
pub struct PoolStats {
    pub tasks_completed: AtomicU64,
    pub tasks_panicked: AtomicU64,
}

/// Travels with a task and records its outcome when dropped.
///
/// Fields drop after `drop` runs, so stats are updated before the admission
/// slot and the in-flight handle are released.
struct TaskGuard {
    stats: Arc<PoolStats>,
    _permit: Option<Permit>,
    _in_flight: WaitGroup,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.stats.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.tasks_completed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

struct Permit(Receiver<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.0.try_recv();
    }
}

impl WorkerPool {
    /// Create a pool from configuration, spawning all workers up front
    pub fn new(config: WorkerPoolConfig) -> BatchResult<Self> {
        config.validate()?;

        let factory = NamedThreadFactory::new(&config.thread_name_prefix);
        let naming = factory.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(move |index| naming.thread_name(index))
            .panic_handler(|payload| {
                warn!(
                    error = %PanicFault::from_payload(payload.as_ref()),
                    "Worker task panicked"
                );
            })
            .build()
            .map_err(|e| BatchError::PoolError(format!("Failed to build worker pool: {e}")))?;

        let admission = config.queue_capacity.map(channel::bounded::<()>);

        info!(
            pool = %factory.name_prefix(),
            workers = config.worker_count,
            queue_capacity = ?config.queue_capacity,
            "Worker pool started"
        );

        Ok(Self {
            state: Mutex::new(Some(PoolState {
                pool,
                in_flight: WaitGroup::new(),
            })),
            admission,
            config,
            factory,
            stats: Arc::new(PoolStats::default()),
        })
    }

    /// Create a pool with `worker_count` workers and default settings otherwise
    pub fn with_workers(worker_count: usize) -> BatchResult<Self> {
        Self::new(WorkerPoolConfig {
            worker_count,
            ..WorkerPoolConfig::default()
        })
    }

    /// Shared default pool, built on first use and kept for the process lifetime.
    ///
    /// Nothing in the engine requires it; it backs the convenience entry point
    /// `batch_parallel_operate_default`.
    pub fn global() -> BatchResult<&'static WorkerPool> {
        if let Some(pool) = GLOBAL_POOL.get() {
            return Ok(pool);
        }
        let pool = WorkerPool::new(WorkerPoolConfig::default())?;
        // A racing initializer may win; the spare pool is shut down on drop.
        Ok(GLOBAL_POOL.get_or_init(|| pool))
    }

    /// Submit a task for asynchronous execution.
    ///
    /// Blocks only while a bounded pool is at capacity. Fails once the pool
    /// has been shut down; the rejected task is dropped without running.
    pub fn execute<F>(&self, task: F) -> BatchResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutdown() {
            return Err(self.shut_down_error());
        }
        let permit = self.acquire_permit()?;

        let state = self.state.lock();
        let Some(state) = state.as_ref() else {
            return Err(self.shut_down_error());
        };

        let guard = TaskGuard {
            stats: Arc::clone(&self.stats),
            _permit: permit,
            _in_flight: state.in_flight.clone(),
        };
        state.pool.spawn(move || {
            let _guard = guard;
            task();
        });
        Ok(())
    }

    fn acquire_permit(&self) -> BatchResult<Option<Permit>> {
        let Some((sender, receiver)) = &self.admission else {
            return Ok(None);
        };
        sender.send(()).map_err(|_| {
            BatchError::PoolError(format!(
                "Worker pool {} lost its admission queue",
                self.name_prefix()
            ))
        })?;
        Ok(Some(Permit(receiver.clone())))
    }

    fn shut_down_error(&self) -> BatchError {
        BatchError::PoolError(format!("Worker pool {} is shut down", self.name_prefix()))
    }

    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Prefix shared by every worker thread name
    pub fn name_prefix(&self) -> &str {
        self.factory.name_prefix()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().is_none()
    }

    /// Stop accepting tasks and wait until every submitted task has finished.
    ///
    /// Idempotent. Must not be called from one of this pool's own workers.
    pub fn shutdown(&self) {
        let Some(PoolState { pool, in_flight }) = self.state.lock().take() else {
            return;
        };

        // Rayon keeps its workers alive until spawned work has run
        drop(pool);
        in_flight.wait();

        info!(
            pool = %self.name_prefix(),
            workers = self.config.worker_count,
            tasks_completed = self.stats.tasks_completed.load(Ordering::Relaxed),
            tasks_panicked = self.stats.tasks_panicked.load(Ordering::Relaxed),
            "Worker pool shut down"
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
