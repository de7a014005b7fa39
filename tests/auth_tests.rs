mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use common::MockBackend;
use major_cli::api::LoginPollResponse;
use major_cli::auth::poll_for_token;
use major_cli::errors::{ApiError, CliError};

fn pending() -> Result<LoginPollResponse, ApiError> {
    Ok(LoginPollResponse {
        error: Some("authorization_pending".to_string()),
        ..Default::default()
    })
}

fn pending_code() -> Result<LoginPollResponse, ApiError> {
    Err(ApiError::Backend {
        status_code: 400,
        internal_code: Some(2005),
        message: "authorization pending".to_string(),
    })
}

fn token(value: &str) -> Result<LoginPollResponse, ApiError> {
    Ok(LoginPollResponse {
        access_token: Some(value.to_string()),
        token_type: Some("Bearer".to_string()),
        ..Default::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_token_issued_after_pending_polls() {
    let api = MockBackend::default();
    api.login_polls
        .lock()
        .unwrap()
        .extend([pending(), pending_code(), token("tok_abc")]);
    let dots = AtomicUsize::new(0);

    let start = Instant::now();
    let issued = poll_for_token(
        &api,
        "dev_1",
        Duration::from_secs(5),
        Duration::from_secs(900),
        &|| {
            dots.fetch_add(1, Ordering::SeqCst);
        },
    )
    .await
    .unwrap();

    assert_eq!(issued, "tok_abc");
    assert_eq!(dots.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(15));

    let times = api.login_poll_times.lock().unwrap().clone();
    assert_eq!(times.len(), 3);
    assert_eq!(times[0] - start, Duration::from_secs(5));
    assert_eq!(times[2] - times[1], Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_device_code_aborts() {
    let api = MockBackend::default();
    api.login_polls.lock().unwrap().push_back(Err(ApiError::Backend {
        status_code: 400,
        internal_code: Some(2004),
        message: "invalid device code".to_string(),
    }));

    let err = poll_for_token(&api, "dev_1", Duration::from_secs(1), Duration::from_secs(60), &|| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::InvalidDeviceCode));
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_field_aborts() {
    let api = MockBackend::default();
    api.login_polls.lock().unwrap().push_back(Ok(LoginPollResponse {
        error: Some("expired_token".to_string()),
        ..Default::default()
    }));

    let err = poll_for_token(&api, "dev_1", Duration::from_secs(1), Duration::from_secs(60), &|| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::InvalidDeviceCode));
}

#[tokio::test(start_paused = true)]
async fn test_login_times_out_at_expiry() {
    let api = MockBackend::default();
    api.login_polls
        .lock()
        .unwrap()
        .extend([pending(), pending(), pending()]);

    let start = Instant::now();
    let err = poll_for_token(&api, "dev_1", Duration::from_secs(5), Duration::from_secs(12), &|| {})
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::LoginTimeout));
    assert_eq!(start.elapsed(), Duration::from_secs(12));
    assert_eq!(api.login_poll_times.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_uses_fallback() {
    let api = MockBackend::default();
    api.login_polls.lock().unwrap().push_back(token("tok"));

    let start = Instant::now();
    poll_for_token(&api, "dev_1", Duration::ZERO, Duration::ZERO, &|| {})
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_titled() {
    let api = MockBackend::default();
    api.login_polls
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Http("connection reset".to_string())));

    let err = poll_for_token(&api, "dev_1", Duration::from_secs(1), Duration::from_secs(60), &|| {})
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "failed to poll");
}
