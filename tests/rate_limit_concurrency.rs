//! The limiter under contention.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gatekeeper::clock::ManualClock;
use gatekeeper::security::{MemoryStore, RateLimitRule, RateLimiter};

#[test]
fn test_racing_threads_never_exceed_limit() {
    let limiter = Arc::new(RateLimiter::new());
    let rule = RateLimitRule::new(25, 60_000).unwrap();
    let successes = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            let successes = successes.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if limiter.check("gate:api:203.0.113.9", &rule).success {
                        successes.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(successes.load(Ordering::Relaxed), 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_tasks_on_many_keys() {
    let limiter = Arc::new(RateLimiter::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
        8,
    ));
    let rule = RateLimitRule::new(3, 1_000).unwrap();

    let mut tasks = Vec::new();
    for client in 0..10 {
        for _ in 0..10 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.check(&format!("client-{client}"), &rule).success
            }));
        }
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 30);
    assert_eq!(limiter.tracked_keys(), 10);
}

#[test]
fn test_expired_windows_are_swept() {
    let clock = ManualClock::default();
    let limiter = RateLimiter::with_parts(Arc::new(MemoryStore::new()), Arc::new(clock.clone()), 1);
    let rule = RateLimitRule::new(1, 1_000).unwrap();

    for i in 0..20 {
        limiter.check(&format!("k{i}"), &rule);
    }
    assert_eq!(limiter.tracked_keys(), 20);

    clock.advance(Duration::from_millis(1_000));
    let outcome = limiter.check("fresh", &rule);
    assert!(outcome.success);
    assert_eq!(limiter.tracked_keys(), 1);
}
