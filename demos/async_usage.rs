//! Async usage examples

use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== refill_objectpool - Async Examples ===\n");

    // Example 1: Async request
    async_request().await;

    // Example 2: Concurrent consumers
    concurrent_access().await;
}

async fn async_request() {
    println!("1. Async Request:");
    let config = PoolConfiguration::new()
        .with_capacity(2)
        .with_acquire_timeout(Duration::from_millis(200));
    let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(42)).unwrap();

    match pool.request_object_async().await {
        Some(item) => println!("   Got item asynchronously: {}", item),
        None => println!("   Unavailable"),
    }

    println!();
}

async fn concurrent_access() {
    println!("2. Concurrent Access:");

    let counter = AtomicUsize::new(0);
    let config = PoolConfiguration::new()
        .with_capacity(5)
        .with_worker_count(2)
        .with_acquire_timeout(Duration::from_millis(100));
    let pool = Arc::new(
        ExpensiveObjectPool::new(config, move || {
            std::thread::sleep(Duration::from_millis(20));
            Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap(),
    );

    sleep(Duration::from_millis(100)).await;

    let mut handles = vec![];
    for i in 0..10 {
        let pool_clone = Arc::clone(&pool);
        let handle = tokio::spawn(async move {
            match pool_clone.request_object_async().await {
                Some(item) => println!("   Task {} got item: {}", i, item),
                None => println!("   Task {} found nothing ready", i),
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   Final available: {}", pool.available_count());
    pool.shutdown();
}
