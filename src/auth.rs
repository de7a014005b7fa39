//! Device-code login flow.

use std::time::Duration;

use anyhow::anyhow;
use tokio::time::MissedTickBehavior;

use crate::app_deps::BackendApi;
use crate::errors::{CliError, WrapErr};

/// Used when the backend sends a zero polling interval.
const FALLBACK_INTERVAL: Duration = Duration::from_secs(5);

/// Used when the backend sends a zero expiry.
const FALLBACK_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Poll `/login/poll` every `interval` until a token is issued.
///
/// A pending authorization keeps polling and calls `on_pending`. An invalid
/// or expired device code aborts, as does reaching `expires_in`.
pub async fn poll_for_token(
    api: &dyn BackendApi,
    device_code: &str,
    interval: Duration,
    expires_in: Duration,
    on_pending: &(dyn Fn() + Send + Sync),
) -> Result<String, CliError> {
    let period = if interval.is_zero() {
        FALLBACK_INTERVAL
    } else {
        interval
    };

    let window = if expires_in.is_zero() {
        FALLBACK_EXPIRY
    } else {
        expires_in
    };

    let poll = async {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match api.poll_login(device_code).await {
                Ok(resp) => {
                    if let Some(token) = resp.access_token.filter(|t| !t.is_empty()) {
                        return Ok(token);
                    }
                    match resp.error.as_deref() {
                        Some("authorization_pending") | Some("slow_down") => on_pending(),
                        Some("expired_token") | Some("invalid_grant") => {
                            return Err(CliError::InvalidDeviceCode);
                        }
                        _ => {
                            return Err(CliError::Unexpected(anyhow!(
                                "unexpected response - no access token received"
                            )));
                        }
                    }
                }
                Err(e) if e.is_authorization_pending() => on_pending(),
                Err(e) if e.is_invalid_device_code() => return Err(CliError::InvalidDeviceCode),
                Err(e) => return Err(e).wrap_err("failed to poll"),
            }
        }
    };

    tokio::time::timeout(window, poll)
        .await
        .map_err(|_| CliError::LoginTimeout)?
}
