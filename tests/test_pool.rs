use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration, PoolState, Produce};

fn counting_producer() -> impl Fn() -> Result<usize, String> + Send + Sync + 'static {
    let counter = AtomicUsize::new(0);
    move || Ok(counter.fetch_add(1, Ordering::SeqCst))
}

fn settled<P: Produce>(pool: &ExpensiveObjectPool<P>, expected: usize) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if pool.available_count() == expected && pool.in_flight_count() == 0 {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn warm_up_reaches_capacity() {
    for capacity in [0, 1, 5, 32] {
        let config = PoolConfiguration::new()
            .with_capacity(capacity)
            .with_worker_count(3);
        let pool = ExpensiveObjectPool::new(config, counting_producer()).unwrap();
        assert!(settled(&pool, capacity), "capacity {} never reached", capacity);
        pool.shutdown();
    }
}

#[test]
fn three_requests_after_warm_up_are_distinct() {
    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_worker_count(2)
        .with_acquire_timeout(Duration::from_millis(100));
    let pool = ExpensiveObjectPool::new(config, counting_producer()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let mut seen = HashSet::new();
    for _ in 0..3 {
        let item = pool.request_object().expect("warm-up item");
        assert!(seen.insert(item));
    }

    let start = Instant::now();
    if let Some(item) = pool.request_object() {
        assert!(seen.insert(item));
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn zero_capacity_is_always_unavailable() {
    let config = PoolConfiguration::new()
        .with_capacity(0)
        .with_worker_count(4)
        .with_acquire_timeout(Duration::from_millis(30));
    let pool = ExpensiveObjectPool::new(config, counting_producer()).unwrap();

    for _ in 0..3 {
        let start = Instant::now();
        assert_eq!(pool.request_object(), None);
        assert!(start.elapsed() < Duration::from_millis(500));
    }
    assert_eq!(pool.state(), PoolState::SteadyState);
    assert_eq!(pool.get_metrics().misses, 3);
}

#[test]
fn failing_producer_never_blocks_past_timeout() {
    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_worker_count(2)
        .with_acquire_timeout(Duration::from_millis(40));
    let pool = ExpensiveObjectPool::new(config, || Err::<u8, _>("always fails")).unwrap();

    for _ in 0..5 {
        let start = Instant::now();
        assert_eq!(pool.request_object(), None);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    assert!(settled(&pool, 0));
    let metrics = pool.get_metrics();
    assert!(metrics.production_failures >= 3);
    assert_eq!(metrics.items_produced, 0);
    assert!(!pool.get_health_status().is_healthy());
    assert_eq!(pool.state(), PoolState::WarmingUp);
}

#[test]
fn panicking_producer_keeps_workers_alive() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = PoolConfiguration::new()
        .with_capacity(2)
        .with_worker_count(1)
        .with_acquire_timeout(Duration::from_secs(2));
    let pool = ExpensiveObjectPool::new(config, move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first production panics");
        }
        Ok::<_, String>("ok")
    })
    .unwrap();

    assert_eq!(pool.request_object(), Some("ok"));
    assert_eq!(pool.get_metrics().production_panics, 1);
}

#[test]
fn slow_single_worker_drains_pool() {
    let config = PoolConfiguration::new()
        .with_capacity(5)
        .with_worker_count(1)
        .with_acquire_timeout(Duration::from_millis(10));
    let pool = ExpensiveObjectPool::new(config, || {
        thread::sleep(Duration::from_millis(60));
        Ok::<_, String>(())
    })
    .unwrap();

    // One worker completes at most one item per 60ms, so back-to-back
    // requests outrun it.
    let hits = (0..5).filter(|_| pool.request_object().is_some()).count();
    assert!(hits < 5);
    assert!(pool.get_metrics().misses > 0);
    pool.shutdown();
}

#[test]
fn concurrent_consumers_get_each_item_once() {
    let config = PoolConfiguration::new()
        .with_capacity(16)
        .with_worker_count(4)
        .with_acquire_timeout(Duration::from_millis(200));
    let pool = Arc::new(ExpensiveObjectPool::new(config, counting_producer()).unwrap());
    let received = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let received = Arc::clone(&received);
            thread::spawn(move || {
                for _ in 0..50 {
                    if let Some(item) = pool.request_object() {
                        received.lock().unwrap().push(item);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let received = received.lock().unwrap();
    let unique: HashSet<_> = received.iter().collect();
    assert_eq!(unique.len(), received.len());
    assert!(!received.is_empty());
    pool.shutdown();
}

#[test]
fn supply_converges_after_each_request() {
    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_worker_count(2)
        .with_acquire_timeout(Duration::from_secs(1));
    let pool = ExpensiveObjectPool::new(config, counting_producer()).unwrap();

    for _ in 0..10 {
        assert!(pool.request_object().is_some());
        assert!(settled(&pool, 4));
    }
    let metrics = pool.get_metrics();
    assert_eq!(metrics.items_produced, 14);
    assert_eq!(metrics.hits, 10);
}

#[tokio::test]
async fn async_requests_from_many_tasks() {
    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_acquire_timeout(Duration::from_millis(500));
    let pool = Arc::new(ExpensiveObjectPool::new(config, counting_producer()).unwrap());

    let mut handles = vec![];
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move { pool.request_object_async().await }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        if let Some(item) = handle.await.unwrap() {
            assert!(seen.insert(item));
        }
    }
    assert!(!seen.is_empty());
    pool.shutdown();
}
