//! Retry combinator for git operations that race GitHub access propagation.
//!
//! A freshly accepted collaborator invitation can take a moment before
//! `git clone`/`git pull` stop reporting "repository not found". Access-shaped
//! failures are retried with backoff; anything else is returned immediately.

use std::error::Error as StdError;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::app_deps::GitShell;
use crate::constants::{git::ACCESS_ERROR_PATTERNS, retry as defaults};
use crate::errors::{CliError, WrapErr};
use crate::git::RepositoryRef;

/// Attempt budget and backoff. The delay before attempt `n` (n >= 2) is
/// `base_delay * 2^(n-2)`: 200 ms, 400 ms, 800 ms ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait before the given 1-based attempt. Zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let shift = (attempt - 2).min(16);
        self.base_delay.saturating_mul(1u32 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(defaults::BASE_DELAY_MS),
        }
    }
}

/// Why [`retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; holds the last one.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with a non-retryable error.
    Aborted(E),
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made. `op` receives the 1-based
/// attempt number.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            log::debug!("retry attempt {} after {:?}", attempt, delay);
            tokio::time::sleep(delay).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(RetryError::Aborted(e)),
            Err(e) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(_) => attempt += 1,
        }
    }
}

/// True if any message in the cause chain looks like a git access failure.
pub fn is_access_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_lowercase();
        if ACCESS_ERROR_PATTERNS.iter().any(|p| message.contains(p)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Clone `repo` into `target`, over SSH when a handshake succeeds and an SSH
/// URL is known, otherwise over HTTPS.
pub async fn clone_repository(
    git: &dyn GitShell,
    repo: &RepositoryRef,
    target: &Path,
) -> Result<(), CliError> {
    let use_ssh = repo.ssh_url.is_some() && git.can_use_ssh().await;
    let (url, method) = match (&repo.ssh_url, &repo.https_url) {
        (Some(ssh), _) if use_ssh => (ssh, "SSH"),
        (_, Some(https)) => (https, "HTTPS"),
        _ => return Err(CliError::NoValidCloneMethod),
    };
    git.clone_repo(url, target)
        .await
        .wrap_err(format!("failed to clone repository using {}", method))
}

/// Pull `dir` if it exists, otherwise clone into it, retrying access errors.
///
/// Each attempt re-checks whether the directory exists and picks pull or
/// clone from scratch.
pub async fn pull_or_clone_with_retries(
    git: &dyn GitShell,
    policy: &RetryPolicy,
    dir: &Path,
    repo: &RepositoryRef,
) -> Result<(), CliError> {
    let result = retry(
        policy,
        |e: &CliError| is_access_error(e),
        |attempt| async move {
            if dir.exists() {
                log::debug!("attempt {}: pulling {}", attempt, dir.display());
                git.pull(dir).await.wrap_err("failed to pull repository")
            } else {
                log::debug!("attempt {}: cloning into {}", attempt, dir.display());
                clone_repository(git, repo, dir).await
            }
        },
    )
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(RetryError::Exhausted { last, attempts }) => {
            log::debug!("giving up after {} attempts: {}", attempts, last);
            Err(CliError::GitRepositoryAccessFailed)
        }
        Err(RetryError::Aborted(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
        assert_eq!(policy.delay_before(4), Duration::from_millis(800));
    }

    #[test]
    fn test_classifier_walks_wrapped_chain() {
        let err = anyhow!("exit status 128")
            .context("fatal: could not read from remote repository.")
            .context("git clone failed")
            .context("failed to clone repository using SSH");
        assert!(is_access_error(err.as_ref()));

        let err = anyhow!("disk full").context("git clone failed");
        assert!(!is_access_error(err.as_ref()));
    }

    #[test]
    fn test_classifier_is_case_insensitive() {
        let err = anyhow!("ERROR: Repository not found.");
        assert!(is_access_error(err.as_ref()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_timing_and_exhaustion() {
        let started = Instant::now();
        let stamps = Mutex::new(Vec::new());
        let result: Result<(), _> = retry(
            &RetryPolicy::default(),
            |_: &anyhow::Error| true,
            |_| {
                stamps.lock().unwrap().push(started.elapsed());
                async { Err(anyhow!("permission denied")) }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        let stamps = stamps.into_inner().unwrap();
        assert_eq!(stamps.len(), 3);
        let first_gap = stamps[1] - stamps[0];
        let second_gap = stamps[2] - stamps[1];
        assert!(first_gap >= Duration::from_millis(150) && first_gap <= Duration::from_millis(250));
        assert!(second_gap >= Duration::from_millis(350) && second_gap <= Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_short_circuits() {
        let calls = Mutex::new(0);
        let result: Result<(), _> = retry(
            &RetryPolicy::default(),
            |_: &anyhow::Error| false,
            |_| {
                *calls.lock().unwrap() += 1;
                async { Err(anyhow!("disk full")) }
            },
        )
        .await;

        assert!(matches!(result, Err(RetryError::Aborted(_))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_second_attempt() {
        let result = retry(
            &RetryPolicy::default(),
            |_: &anyhow::Error| true,
            |attempt| async move {
                if attempt < 2 {
                    Err(anyhow!("403"))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}
