//! Concurrent tests for luxdb-concurrency
//!
//! These exercise the coordinator and the pool under real contention:
//!
//! 1. **Per-index isolation** - a writer on one name never blocks another
//! 2. **Reader sharing** - readers of one name hold the lock together
//! 3. **Writer fairness** - a queued writer holds back later readers
//! 4. **Pool ordering** - priority first, FIFO within a priority
//! 5. **Pool failure modes** - panics, backpressure, shutdown

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use luxdb_concurrency::{BackpressureError, LockCoordinator, PoolError, TaskPriority, WorkerPool};

// ============================================================================
// Test Helpers
// ============================================================================

fn coordinator(names: &[&str]) -> Arc<LockCoordinator<Vec<u64>>> {
    Arc::new(LockCoordinator::from_entries(
        names.iter().map(|n| (n.to_string(), Vec::new())),
    ))
}

/// Occupy every worker until the returned sender is dropped or sent to.
fn block_workers(pool: &WorkerPool, workers: usize) -> Vec<mpsc::Sender<()>> {
    let mut releases = Vec::new();
    for _ in 0..workers {
        let (tx, rx) = mpsc::channel::<()>();
        pool.submit(TaskPriority::High, move || {
            let _ = rx.recv();
        })
        .unwrap();
        releases.push(tx);
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.stats().active_tasks < workers {
        assert!(Instant::now() < deadline, "workers never picked up blockers");
        std::thread::sleep(Duration::from_millis(5));
    }
    releases
}

fn wait_until_idle(pool: &WorkerPool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let stats = pool.stats();
        if stats.queue_depth == 0 && stats.active_tasks == 0 {
            return;
        }
        assert!(Instant::now() < deadline, "pool never went idle");
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// SECTION 1: Lock coordinator
// ============================================================================

mod lock_coordinator {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_writer_on_one_index_does_not_block_another() {
        let locks = coordinator(&["a", "b"]);

        let mut held = locks.write("a").await.unwrap();
        held.push(1);

        let started = Instant::now();
        let reader = tokio::time::timeout(Duration::from_secs(1), locks.read("b"))
            .await
            .expect("read on b must not wait for the writer on a")
            .unwrap();
        assert!(reader.is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_share_the_lock() {
        let locks = coordinator(&["a"]);
        let barrier = Arc::new(tokio::sync::Barrier::new(4));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    let _guard = locks.read("a").await.unwrap();
                    // Only passes if all four hold a read guard at once.
                    barrier.wait().await;
                })
            })
            .collect();

        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("readers deadlocked")
                .unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_writers_are_serialized() {
        let locks = coordinator(&["a"]);
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16u64)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                tokio::spawn(async move {
                    let mut guard = locks.write("a").await.unwrap();
                    if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    guard.push(i);
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(locks.read("a").await.unwrap().len(), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queued_writer_holds_back_new_readers() {
        let locks = coordinator(&["a"]);
        let first_reader = locks.read("a").await.unwrap();

        let writer = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let mut guard = locks.write("a").await.unwrap();
                guard.push(7);
            })
        };
        // Let the writer queue up behind the first reader.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let late = tokio::time::timeout(Duration::from_millis(100), locks.read("a")).await;
        assert!(late.is_err(), "a new reader jumped the queued writer");

        drop(first_reader);
        writer.await.unwrap();
        assert_eq!(*locks.read("a").await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_structural_changes() {
        let locks: LockCoordinator<u32> = LockCoordinator::new();
        {
            let guard = locks.structure_write().await;
            assert!(locks.insert(&guard, "x".into(), 1));
            assert!(!locks.insert(&guard, "x".into(), 2));
            assert!(locks.insert(&guard, "w".into(), 3));
        }
        assert_eq!(locks.names(), vec!["w".to_string(), "x".to_string()]);
        assert_eq!(*locks.read("x").await.unwrap(), 1);

        {
            let guard = locks.structure_write().await;
            assert!(locks.remove(&guard, "x"));
            assert!(!locks.remove(&guard, "x"));
        }
        assert!(locks.read("x").await.is_none());
        assert_eq!(locks.len(), 1);
    }
}

// ============================================================================
// SECTION 2: Worker pool
// ============================================================================

mod worker_pool {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_callers_get_their_own_results() {
        let pool = Arc::new(WorkerPool::new(4, 8).unwrap());

        let tasks: Vec<_> = (0..200u64)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.run(TaskPriority::Normal, move || i * i).await })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let i = i as u64;
            assert_eq!(task.await.unwrap(), Ok(i * i));
        }
        tokio::task::block_in_place(|| pool.shutdown());
        assert_eq!(pool.stats().tasks_completed, 200);
    }

    #[test]
    fn test_priority_then_fifo() {
        let pool = WorkerPool::new(1, 64).unwrap();
        let releases = block_workers(&pool, 1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for (tag, priority) in [
            ("low-1", TaskPriority::Low),
            ("normal-1", TaskPriority::Normal),
            ("low-2", TaskPriority::Low),
            ("high-1", TaskPriority::High),
            ("normal-2", TaskPriority::Normal),
        ] {
            let order = Arc::clone(&order);
            pool.submit(priority, move || order.lock().unwrap().push(tag))
                .unwrap();
        }

        drop(releases);
        pool.shutdown();
        assert_eq!(
            *order.lock().unwrap(),
            vec!["high-1", "normal-1", "normal-2", "low-1", "low-2"]
        );
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported_and_pool_survives() {
        let pool = WorkerPool::new(1, 4).unwrap();

        let result = pool
            .run(TaskPriority::Normal, || -> u32 { panic!("engine exploded") })
            .await;
        match result {
            Err(PoolError::Panicked(msg)) => assert!(msg.contains("engine exploded")),
            other => panic!("expected Panicked, got {:?}", other),
        }

        assert_eq!(pool.run(TaskPriority::Normal, || 5).await, Ok(5));
    }

    #[test]
    fn test_submit_applies_backpressure() {
        let pool = WorkerPool::new(1, 2).unwrap();
        let releases = block_workers(&pool, 1);

        pool.submit(TaskPriority::Normal, || {}).unwrap();
        pool.submit(TaskPriority::Normal, || {}).unwrap();
        assert_eq!(
            pool.submit(TaskPriority::Normal, || {}),
            Err(BackpressureError)
        );

        drop(releases);
        wait_until_idle(&pool);
        pool.submit(TaskPriority::Normal, || {}).unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_runs_queued_work_and_rejects_new_work() {
        let pool = Arc::new(WorkerPool::new(2, 16).unwrap());
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(TaskPriority::Low, move || {
                std::thread::sleep(Duration::from_millis(1));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        let shutting = Arc::clone(&pool);
        tokio::task::spawn_blocking(move || shutting.shutdown())
            .await
            .unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert!(pool.is_shut_down());
        assert_eq!(pool.run(TaskPriority::High, || 1).await, Err(PoolError::ShutDown));
        assert_eq!(pool.submit(TaskPriority::High, || {}), Err(BackpressureError));
    }
}
