//! Repository access reconciliation.
//!
//! Probe whether the user can already reach the repository; if not, work out
//! their GitHub username, ask the backend to invite them as a collaborator,
//! and wait for the invitation to be accepted.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::app::AppContext;
use crate::app_deps::GitShell;
use crate::errors::{CliError, WrapErr};
use crate::git::RepositoryRef;
use crate::validation::validate_github_username;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    AlreadyHasAccess,
    Granted,
    /// Invitation sent but not awaited (non-interactive runs).
    InvitationPending { url: String },
}

#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub repo: &'a RepositoryRef,
    pub application_id: &'a str,
    /// Username supplied up front, e.g. from a flag.
    pub github_username: Option<&'a str>,
    /// Wait for the invitation even when not interactive. Set by callers
    /// that cannot finish without access.
    pub always_wait: bool,
}

/// Progress hooks for the reconciler. All methods default to no-ops.
pub trait AccessObserver: Send + Sync {
    fn already_has_access(&self) {}
    fn requesting_access(&self, _username: &str) {}
    fn invitation_sent(&self, _url: &str) {}
    fn still_waiting(&self) {}
    fn granted(&self) {}
}

pub struct SilentObserver;

impl AccessObserver for SilentObserver {}

/// `git ls-remote` against the SSH URL when SSH authenticates, otherwise the
/// HTTPS URL. Never cached.
pub async fn probe_access(git: &dyn GitShell, repo: &RepositoryRef) -> bool {
    if let Some(ssh) = &repo.ssh_url
        && git.can_use_ssh().await
    {
        return git.ls_remote(ssh).await;
    }
    match &repo.https_url {
        Some(https) => git.ls_remote(https).await,
        None => false,
    }
}

/// Make sure the current user can read `request.repo`.
pub async fn ensure_repository_access(
    ctx: &AppContext,
    observer: &dyn AccessObserver,
    request: AccessRequest<'_>,
) -> Result<AccessOutcome, CliError> {
    if probe_access(ctx.git.as_ref(), request.repo).await {
        observer.already_has_access();
        return Ok(AccessOutcome::AlreadyHasAccess);
    }

    let username = resolve_github_username(ctx, request.github_username).await?;

    observer.requesting_access(&username);
    ctx.api
        .add_github_collaborator(request.application_id, &username)
        .await
        .wrap_err("failed to add GitHub collaborator")?;

    let url = request.repo.invitation_url();
    observer.invitation_sent(&url);

    if !ctx.interactive && !request.always_wait {
        return Ok(AccessOutcome::InvitationPending { url });
    }

    wait_for_access(
        ctx.git.as_ref(),
        request.repo,
        observer,
        ctx.timing.access_poll_interval,
        ctx.timing.access_timeout,
    )
    .await?;
    observer.granted();
    Ok(AccessOutcome::Granted)
}

/// Poll the probe every `interval` until it succeeds or `window` elapses.
/// The first poll happens one interval after the call.
pub async fn wait_for_access(
    git: &dyn GitShell,
    repo: &RepositoryRef,
    observer: &dyn AccessObserver,
    interval: Duration,
    window: Duration,
) -> Result<(), CliError> {
    let poll = async {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if probe_access(git, repo).await {
                return;
            }
            observer.still_waiting();
        }
    };

    tokio::time::timeout(window, poll)
        .await
        .map_err(|_| CliError::RepositoryAccessTimeout)
}

/// Resolve the GitHub username to invite.
///
/// Order: explicit value, stored value, SSH greeting, git config, prompt.
/// Auto-detected names are confirmed interactively. Newly resolved names are
/// stored for next time.
pub async fn resolve_github_username(
    ctx: &AppContext,
    explicit: Option<&str>,
) -> Result<String, CliError> {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        validate_github_username(name).map_err(|e| CliError::invalid_input(e.to_string()))?;
        remember_username(ctx, name)?;
        return Ok(name.to_string());
    }

    if let Some(stored) = ctx
        .credentials
        .github_username()
        .wrap_err("failed to check stored GitHub username")?
    {
        return Ok(stored);
    }

    let detected = match ctx.git.ssh_username().await {
        Some(name) => Some(name),
        None => ctx.git.config_username().await,
    };

    if !ctx.interactive {
        return match detected {
            Some(name) => {
                log::debug!("using auto-detected GitHub username {}", name);
                remember_username(ctx, &name)?;
                Ok(name)
            }
            None => Err(CliError::GitHubUsernameRequired),
        };
    }

    if let Some(name) = detected {
        let answer = ctx
            .prompt
            .confirm(
                &format!("Use GitHub username: {}?", name),
                "We found this GitHub username. Would you like to use it?",
            )
            .wrap_err("failed to confirm GitHub username")?;
        match answer {
            Some(true) => {
                remember_username(ctx, &name)?;
                return Ok(name);
            }
            Some(false) => {}
            None => return Err(CliError::OperationCancelled),
        }
    }

    let validate = |s: &str| validate_github_username(s).map_err(|e| e.to_string());
    let name = ctx
        .prompt
        .input("What is your GitHub username?", "", "", &validate)
        .wrap_err("failed to get GitHub username")?
        .ok_or(CliError::OperationCancelled)?;
    let name = name.trim().to_string();
    remember_username(ctx, &name)?;
    Ok(name)
}

fn remember_username(ctx: &AppContext, name: &str) -> Result<(), CliError> {
    ctx.credentials
        .store_github_username(name)
        .wrap_err("failed to save GitHub username")
}
