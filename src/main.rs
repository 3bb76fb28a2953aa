// Small demo binary; the library lives in lib.rs.
// Run the demos with: cargo run --example basic

use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== refill_objectpool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    let counter = AtomicU64::new(0);
    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_worker_count(2)
        .with_acquire_timeout(Duration::from_millis(100));

    let pool = match ExpensiveObjectPool::new(config, move || {
        thread::sleep(Duration::from_millis(20));
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
    }) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Failed to build pool: {}", e);
            return;
        }
    };

    println!("Quick Demo:");
    for _ in 0..5 {
        match pool.request_object() {
            Some(value) => println!("  Got item: {}", value),
            None => println!("  Unavailable, try again"),
        }
    }

    pool.shutdown();
    println!("  Available after shutdown: {}", pool.available_count());
}
