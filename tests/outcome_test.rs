//! Integration tests for the failure-as-value result model.
//!
//! The key property: for any closure that returns, errors, or panics, the
//! capture boundaries return exactly one `Outcome` and never unwind.

use outcome_toolkit::core::{
    run_fallible, run_fallible_async, FailureContext, FailureRecord, Outcome, UNKNOWN_ERROR,
};

#[derive(Debug, thiserror::Error)]
#[error("backend unavailable: {0}")]
struct BackendError(String);

#[test]
fn test_sync_success() {
    let outcome = run_fallible(|| Ok::<_, BackendError>(41 + 1));
    assert_eq!(outcome.success(), Some(42));
}

#[test]
fn test_sync_error_becomes_failure() {
    let outcome: Outcome<()> = run_fallible(|| Err(BackendError("shard 3".into())));
    let record = outcome.failure().expect("failure expected");
    assert_eq!(record.category(), "BackendError");
    assert_eq!(record.message(), "backend unavailable: shard 3");
    assert!(record.cause().is_some());
    assert!(record.origin_site().contains("outcome_test.rs"));
}

#[test]
fn test_sync_panic_becomes_failure() {
    let outcome: Outcome<u32> =
        run_fallible(|| -> Result<u32, BackendError> { panic!("kaboom") });
    let record = outcome.failure().expect("failure expected");
    assert_eq!(record.category(), UNKNOWN_ERROR);
    assert_eq!(record.message(), "kaboom");
    assert!(record.cause().is_some());
}

#[test]
fn test_failure_record_error_passes_through_unchanged() {
    let original = FailureRecord::new("QuotaError", "limit reached");
    let created = original.created_at_ms();
    let outcome: Outcome<()> = run_fallible(|| Err(original));
    let record = outcome.failure().expect("failure expected");
    assert_eq!(record.category(), "QuotaError");
    assert_eq!(record.message(), "limit reached");
    assert_eq!(record.created_at_ms(), created);
}

#[test]
fn test_from_error_merges_context() {
    let mut extra = FailureContext::new();
    extra.insert("attempt".into(), serde_json::json!(2));
    let record = FailureRecord::from_error(
        FailureRecord::new("QuotaError", "limit reached"),
        Some(extra),
    );
    assert_eq!(record.category(), "QuotaError");
    assert_eq!(
        record.context().and_then(|c| c.get("attempt")),
        Some(&serde_json::json!(2))
    );
}

#[tokio::test]
async fn test_async_success() {
    let outcome = run_fallible_async(|| async { Ok::<_, BackendError>("done") }).await;
    assert_eq!(outcome.success(), Some("done"));
}

#[tokio::test]
async fn test_async_error_becomes_failure() {
    let outcome: Outcome<()> =
        run_fallible_async(|| async { Err(BackendError("replica".into())) }).await;
    let record = outcome.failure().expect("failure expected");
    assert_eq!(record.category(), "BackendError");
}

#[tokio::test]
async fn test_async_panic_becomes_failure() {
    let outcome: Outcome<u32> = run_fallible_async(|| async {
        if true {
            panic!("async kaboom");
        }
        Ok::<_, BackendError>(0)
    })
    .await;
    let record = outcome.failure().expect("failure expected");
    assert_eq!(record.category(), UNKNOWN_ERROR);
    assert_eq!(record.message(), "async kaboom");
}

#[tokio::test]
async fn test_async_panic_in_closure_body_becomes_failure() {
    // The closure itself panics before producing a future.
    let outcome: Outcome<u32> = run_fallible_async(|| -> futures::future::Ready<Result<u32, BackendError>> {
        panic!("no future for you")
    })
    .await;
    assert!(outcome.is_failure());
}
