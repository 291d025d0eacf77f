use std::cell::RefCell;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use datapoints::error::DatapointsError;
use datapoints::retry::RetryPolicy;

fn transient() -> DatapointsError {
    DatapointsError::Transport("connection reset by peer".to_string())
}

#[tokio::test(start_paused = true)]
async fn transient_errors_back_off_linearly() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let attempts = RefCell::new(Vec::new());
    let start = Instant::now();

    let value = policy
        .run("Adur", &cancel, |attempt| {
            attempts.borrow_mut().push(attempt);
            async move {
                if attempt < 3 {
                    Err(transient())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 3);
    assert_eq!(attempts.into_inner(), vec![1, 2, 3]);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_reports_download_failed() {
    let policy = RetryPolicy::new(3, Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let calls = RefCell::new(0u32);

    let err = policy
        .run("Adur", &cancel, |_| {
            *calls.borrow_mut() += 1;
            async { Err::<(), _>(transient()) }
        })
        .await
        .unwrap_err();

    assert_eq!(*calls.borrow(), 3);
    assert_matches!(
        err,
        DatapointsError::DownloadFailed { ref name, attempts: 3, ref reason }
            if name == "Adur" && reason.contains("connection reset")
    );
}

#[tokio::test(start_paused = true)]
async fn permanent_error_is_returned_at_once() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let calls = RefCell::new(0u32);
    let start = Instant::now();

    let err = policy
        .run("Adur", &cancel, |_| {
            *calls.borrow_mut() += 1;
            async {
                Err::<(), _>(DatapointsError::HttpStatus {
                    status: 404,
                    url: "https://example.test/Adur.zip".to_string(),
                })
            }
        })
        .await
        .unwrap_err();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_matches!(err, DatapointsError::HttpStatus { status: 404, .. });
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff() {
    let policy = RetryPolicy::new(5, Duration::from_secs(60));
    let cancel = CancellationToken::new();
    let calls = RefCell::new(0u32);

    let err = policy
        .run("Adur", &cancel, |_| {
            *calls.borrow_mut() += 1;
            cancel.cancel();
            async { Err::<(), _>(transient()) }
        })
        .await
        .unwrap_err();

    assert_eq!(*calls.borrow(), 1);
    assert_matches!(err, DatapointsError::Cancelled(ref name) if name == "Adur");
}

#[tokio::test]
async fn single_attempt_policy_does_not_sleep() {
    let policy = RetryPolicy::new(1, Duration::from_secs(60));
    let err = policy
        .run("Adur", &CancellationToken::new(), |_| async {
            Err::<(), _>(transient())
        })
        .await
        .unwrap_err();

    assert_matches!(err, DatapointsError::DownloadFailed { attempts: 1, .. });
}
