//! Fixed worker pool with a priority queue.
//!
//! Tasks run on a fixed set of OS threads. Higher-priority tasks run first;
//! within the same priority, tasks run in FIFO order. Async callers use
//! [`WorkerPool::run`], which waits for a queue slot when the pool is
//! saturated and resolves with the task's result. Fire-and-forget work uses
//! [`WorkerPool::submit`], which fails fast instead of waiting.

use parking_lot::Mutex as ParkingMutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, error};

/// Priority levels for pool work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    /// Background flushes
    Low = 0,
    /// Client requests
    Normal = 1,
    /// Shutdown-path work
    High = 2,
}

/// Error returned by [`WorkerPool::submit`] when the queue is full or the
/// pool has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker pool queue is full")]
pub struct BackpressureError;

/// Error returned by [`WorkerPool::run`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool shut down before the task ran
    #[error("worker pool is shut down")]
    ShutDown,

    /// The task panicked
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Pool metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Total number of tasks completed since the pool was created.
    pub tasks_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct TaskEnvelope {
    priority: TaskPriority,
    sequence: u64,
    work: Box<dyn FnOnce() + Send>,
}

impl Eq for TaskEnvelope {}

impl PartialEq for TaskEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

// Higher priority first, then lower sequence (older) first
impl Ord for TaskEnvelope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TaskEnvelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct PoolInner {
    queue: ParkingMutex<BinaryHeap<TaskEnvelope>>,
    work_ready: parking_lot::Condvar,
    shutdown: AtomicBool,
    sequence: AtomicU64,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
}

impl PoolInner {
    /// Enqueue a task; returns `false` once shutdown has begun.
    ///
    /// The shutdown flag is checked under the queue lock, which workers also
    /// hold when deciding to exit, so an accepted task is always run.
    fn push(&self, priority: TaskPriority, work: Box<dyn FnOnce() + Send>) -> bool {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        {
            let mut queue = self.queue.lock();
            if self.shutdown.load(AtomicOrdering::Acquire) {
                return false;
            }
            queue.push(TaskEnvelope {
                priority,
                sequence,
                work,
            });
            self.queue_depth.fetch_add(1, AtomicOrdering::Release);
        }
        self.work_ready.notify_one();
        true
    }
}

/// Fixed pool of worker threads.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    slots: Arc<Semaphore>,
    workers: ParkingMutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Create a pool with `num_threads` workers.
    ///
    /// Workers are named `luxdb-worker-0`, `luxdb-worker-1`, etc. At most
    /// `max_queue_depth` tasks submitted through [`run`](Self::run) are
    /// queued or running at once; further callers wait.
    pub fn new(num_threads: usize, max_queue_depth: usize) -> std::io::Result<Self> {
        let num_threads = num_threads.max(1);
        let max_queue_depth = max_queue_depth.max(1);
        let inner = Arc::new(PoolInner {
            queue: ParkingMutex::new(BinaryHeap::new()),
            work_ready: parking_lot::Condvar::new(),
            shutdown: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
        });

        let pool = WorkerPool {
            inner: Arc::clone(&inner),
            slots: Arc::new(Semaphore::new(max_queue_depth)),
            workers: ParkingMutex::new(Vec::with_capacity(num_threads)),
            num_threads,
        };

        for i in 0..num_threads {
            let inner_clone = Arc::clone(&inner);
            let spawned = std::thread::Builder::new()
                .name(format!("luxdb-worker-{}", i))
                .spawn(move || worker_loop(&inner_clone));
            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }
        debug!(target: "luxdb::pool", workers = num_threads, max_queue_depth, "Worker pool started");
        Ok(pool)
    }

    /// Submit a fire-and-forget task.
    ///
    /// Returns `Err(BackpressureError)` if the queue is at capacity or the
    /// pool has been shut down. A panic in the task is logged.
    pub fn submit(
        &self,
        priority: TaskPriority,
        work: impl FnOnce() + Send + 'static,
    ) -> Result<(), BackpressureError> {
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(BackpressureError);
        }
        if self.inner.queue_depth.load(AtomicOrdering::Acquire) >= self.inner.max_queue_depth {
            return Err(BackpressureError);
        }
        if self.inner.push(priority, Box::new(work)) {
            Ok(())
        } else {
            Err(BackpressureError)
        }
    }

    /// Run `work` on the pool and await its result.
    ///
    /// Waits for a queue slot when the pool is saturated. If the awaiting
    /// future is dropped, the task still runs to completion; only its result
    /// is discarded.
    pub async fn run<F, R>(&self, priority: TaskPriority, work: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;

        let (tx, rx) = oneshot::channel();
        let accepted = self.inner.push(
            priority,
            Box::new(move || {
                let result = catch_unwind(AssertUnwindSafe(work)).map_err(|e| {
                    let msg = panic_message(e.as_ref());
                    error!(target: "luxdb::pool", panic = %msg, "pool task panicked");
                    PoolError::Panicked(msg)
                });
                drop(permit);
                let _ = tx.send(result);
            }),
        );
        if !accepted {
            return Err(PoolError::ShutDown);
        }

        rx.await.map_err(|_| PoolError::ShutDown)?
    }

    /// Signal workers to exit and join them.
    ///
    /// Workers finish every task already queued before exiting; new work is
    /// rejected. Blocking; call from a blocking context.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);
        self.slots.close();

        // Lock before notifying so a worker between its shutdown check and
        // its wait cannot miss the wakeup.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(AtomicOrdering::Acquire)
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue_depth.load(AtomicOrdering::Relaxed),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}

/// Decrements `active_tasks` on drop, including when the task panics.
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner
            .tasks_completed
            .fetch_add(1, AtomicOrdering::Relaxed);
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop() {
                    inner.queue_depth.fetch_sub(1, AtomicOrdering::Release);
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    break task;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        if let Err(e) = catch_unwind(AssertUnwindSafe(task.work)) {
            error!(
                target: "luxdb::pool",
                panic = %panic_message(e.as_ref()),
                "pool task panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn block_worker(pool: &WorkerPool) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        pool.submit(TaskPriority::Low, move || {
            b.wait();
        })
        .unwrap();
        // Wait until the worker picks up the blocking task
        std::thread::sleep(Duration::from_millis(50));
        barrier
    }

    /// Wait until nothing is queued or running.
    fn wait_idle(pool: &WorkerPool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let stats = pool.stats();
            if stats.queue_depth == 0 && stats.active_tasks == 0 {
                return;
            }
            assert!(std::time::Instant::now() < deadline, "pool never went idle");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_submitted_work_finishes_before_shutdown() {
        let pool = WorkerPool::new(2, 4096).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let c = Arc::clone(&counter);
            pool.submit(TaskPriority::Normal, move || {
                c.fetch_add(1, AtomicOrdering::Relaxed);
            })
            .unwrap();
        }

        pool.shutdown();
        assert_eq!(counter.load(AtomicOrdering::Relaxed), 10);
        let stats = pool.stats();
        assert_eq!(stats.tasks_completed, 10);
        assert_eq!(stats.worker_count, 2);
    }

    #[test]
    fn test_priority_then_fifo_ordering() {
        let pool = WorkerPool::new(1, 4096).unwrap();
        let barrier = block_worker(&pool);
        let order = Arc::new(ParkingMutex::new(Vec::new()));

        for (priority, tag) in [
            (TaskPriority::Low, "low"),
            (TaskPriority::Normal, "normal-1"),
            (TaskPriority::High, "high"),
            (TaskPriority::Normal, "normal-2"),
        ] {
            let o = Arc::clone(&order);
            pool.submit(priority, move || o.lock().push(tag)).unwrap();
        }

        barrier.wait();
        pool.shutdown();
        assert_eq!(
            *order.lock(),
            vec!["high", "normal-1", "normal-2", "low"]
        );
    }

    #[test]
    fn test_backpressure() {
        let pool = WorkerPool::new(1, 2).unwrap();
        let barrier = block_worker(&pool);

        pool.submit(TaskPriority::Normal, || {}).unwrap();
        pool.submit(TaskPriority::Normal, || {}).unwrap();
        assert_eq!(pool.submit(TaskPriority::Normal, || {}), Err(BackpressureError));

        barrier.wait();
        wait_idle(&pool);
        pool.submit(TaskPriority::Normal, || {}).unwrap();
        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let pool = WorkerPool::new(2, 16).unwrap();
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert!(pool.submit(TaskPriority::Normal, || {}).is_err());
        // Idempotent
        pool.shutdown();
    }

    #[test]
    fn test_task_panic_does_not_stop_workers() {
        let pool = WorkerPool::new(2, 4096).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(TaskPriority::Normal, || panic!("intentional test panic"))
            .unwrap();
        for _ in 0..5 {
            let c = Arc::clone(&counter);
            pool.submit(TaskPriority::Normal, move || {
                c.fetch_add(1, AtomicOrdering::Relaxed);
            })
            .unwrap();
        }

        pool.shutdown();
        assert_eq!(counter.load(AtomicOrdering::Relaxed), 5);
        assert_eq!(pool.stats().tasks_completed, 6);
    }

    #[tokio::test]
    async fn test_run_returns_result() {
        let pool = WorkerPool::new(2, 16).unwrap();
        let value = pool.run(TaskPriority::Normal, || 6 * 7).await.unwrap();
        assert_eq!(value, 42);

        let name = pool
            .run(TaskPriority::Normal, || {
                std::thread::current().name().map(str::to_string)
            })
            .await
            .unwrap();
        assert!(name.unwrap().starts_with("luxdb-worker-"));
    }

    #[tokio::test]
    async fn test_run_reports_panic() {
        let pool = WorkerPool::new(1, 16).unwrap();
        let err = pool
            .run(TaskPriority::Normal, || -> u32 { panic!("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, PoolError::Panicked("boom".to_string()));

        // Worker survives
        assert_eq!(pool.run(TaskPriority::Normal, || 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_waits_for_slot_instead_of_failing() {
        let pool = Arc::new(WorkerPool::new(1, 1).unwrap());
        let gate = Arc::new(Barrier::new(2));

        let g = Arc::clone(&gate);
        let p = Arc::clone(&pool);
        let first = tokio::spawn(async move { p.run(TaskPriority::Normal, move || g.wait()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let p = Arc::clone(&pool);
        let second = tokio::spawn(async move { p.run(TaskPriority::Normal, || 2).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        let g = Arc::clone(&gate);
        tokio::task::spawn_blocking(move || g.wait()).await.unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(second.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_task() {
        let pool = WorkerPool::new(1, 16).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let fut = pool.run(TaskPriority::Normal, move || {
            std::thread::sleep(Duration::from_millis(20));
            d.fetch_add(1, AtomicOrdering::Relaxed);
        });
        // Poll once so the task is queued, then drop the future.
        let _ = tokio::time::timeout(Duration::from_millis(1), fut).await;
        pool.shutdown();
        assert_eq!(done.load(AtomicOrdering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_run_after_shutdown() {
        let pool = WorkerPool::new(1, 16).unwrap();
        pool.shutdown();
        assert_eq!(
            pool.run(TaskPriority::Normal, || 1).await,
            Err(PoolError::ShutDown)
        );
    }
}
