//! Integration tests for the rate limiter admission gate.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use outcome_toolkit::core::RateLimiter;

#[tokio::test]
async fn test_serializes_when_capacity_is_one() {
    let limiter = RateLimiter::new(1).expect("valid config");
    let start = Instant::now();

    // Two 50ms operations under a ceiling of one must take at least 100ms
    // of wall time.
    let (a, b) = tokio::join!(
        limiter.execute(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, io::Error>(1)
        }),
        limiter.execute(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, io::Error>(2)
        }),
    );

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(a.success(), Some(1));
    assert_eq!(b.success(), Some(2));
    assert_eq!(limiter.active_count(), 0);
    assert_eq!(limiter.queue_size(), 0);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_ceiling() {
    let limiter = RateLimiter::new(3).expect("valid config");
    let current = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let ops: Vec<_> = (0..10)
        .map(|i| {
            let current = &current;
            let peak = &peak;
            limiter.execute(move || async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, io::Error>(i)
            })
        })
        .collect();
    let outcomes = futures::future::join_all(ops).await;

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(outcomes.iter().all(outcome_toolkit::core::Outcome::is_success));
}

#[tokio::test]
async fn test_queued_operations_start_in_submission_order() {
    let limiter = RateLimiter::new(1).expect("valid config");
    let order = Mutex::new(Vec::new());

    let ops: Vec<_> = (0..6)
        .map(|i| {
            let order = &order;
            limiter.execute(move || async move {
                order.lock().push(i);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, io::Error>(i)
            })
        })
        .collect();
    futures::future::join_all(ops).await;

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_min_delay_spaces_starts() {
    let limiter = RateLimiter::new(2)
        .expect("valid config")
        .with_min_delay(Duration::from_millis(50));
    let base = Instant::now();
    let starts = Mutex::new(Vec::new());

    // Capacity admits both immediately; the spacing window must still keep
    // the second start at least 50ms after the first.
    let ops: Vec<_> = (0..2)
        .map(|i| {
            let starts = &starts;
            limiter.execute(move || async move {
                starts.lock().push(base.elapsed());
                Ok::<_, io::Error>(i)
            })
        })
        .collect();
    futures::future::join_all(ops).await;

    let starts = starts.lock();
    assert_eq!(starts.len(), 2);
    let gap = starts[1].checked_sub(starts[0]).unwrap_or_default();
    assert!(gap >= Duration::from_millis(45), "start gap was {gap:?}");
}

#[tokio::test]
async fn test_operation_failure_does_not_poison_the_limiter() {
    let limiter = RateLimiter::new(1).expect("valid config");

    let failed = limiter
        .execute(|| async { Err::<u32, _>(io::Error::other("boom")) })
        .await;
    assert!(failed.is_failure());

    // Capacity was released; the next call is admitted normally.
    let ok = limiter.execute(|| async { Ok::<_, io::Error>(7) }).await;
    assert_eq!(ok.success(), Some(7));
    assert_eq!(limiter.active_count(), 0);
}

#[tokio::test]
async fn test_counters_while_operations_are_in_flight() {
    let limiter = Arc::new(RateLimiter::new(1).expect("valid config"));

    let slow = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            limiter
                .execute(|| async {
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok::<_, io::Error>(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(limiter.active_count(), 1);

    let queued = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            limiter
                .execute(|| async { Ok::<_, io::Error>(()) })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(limiter.queue_size(), 1);

    assert!(slow.await.expect("task panicked").is_success());
    assert!(queued.await.expect("task panicked").is_success());
    assert_eq!(limiter.active_count(), 0);
    assert_eq!(limiter.queue_size(), 0);
}

#[tokio::test]
async fn test_cancelled_waiter_releases_its_slot() {
    let limiter = Arc::new(RateLimiter::new(1).expect("valid config"));
    let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();

    // Occupy the single slot until the gate opens.
    let running = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            limiter
                .execute(|| async {
                    let _ = gate_rx.await;
                    Ok::<_, io::Error>(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Queue a second caller, then abort it while it waits for admission.
    let waiting = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            limiter.execute(|| async { Ok::<_, io::Error>(()) }).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(limiter.queue_size(), 1);
    waiting.abort();
    let _ = waiting.await;

    gate_tx.send(()).expect("receiver alive");
    assert!(running.await.expect("task panicked").is_success());

    // The dead ticket must not have consumed the slot.
    assert_eq!(limiter.active_count(), 0);
    let ok = limiter.execute(|| async { Ok::<_, io::Error>(7) }).await;
    assert_eq!(ok.success(), Some(7));
}

#[tokio::test]
async fn test_cancelled_running_operation_releases_its_slot() {
    let limiter = Arc::new(RateLimiter::new(1).expect("valid config"));

    let slow = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move {
            limiter
                .execute(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, io::Error>(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(limiter.active_count(), 1);
    slow.abort();
    let _ = slow.await;

    assert_eq!(limiter.active_count(), 0);
    let ok = limiter.execute(|| async { Ok::<_, io::Error>(1) }).await;
    assert!(ok.is_success());
}

#[test]
fn test_rejects_zero_capacity() {
    assert!(RateLimiter::new(0).is_err());
}
