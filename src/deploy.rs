//! Deployment status polling.
//!
//! The poll loop fetches the version status until it reaches a terminal
//! value. A separate render task draws the spinner line from status updates
//! received over a channel, so rendering never delays a fetch.

use std::future::Future;
use std::time::Duration;

use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app_deps::BackendApi;
use crate::constants::deploy::{DOTS_TICK_DIVISOR, MAX_DOTS, SPINNER_TICK_MS};
use crate::errors::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStatus {
    Bundling,
    BundleFailed,
    Building,
    BuildFailed,
    Deploying,
    DeployFailed,
    Deployed,
    /// Any value the CLI does not know; treated as still in progress.
    Other(String),
}

impl From<&str> for DeploymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "BUNDLING" => DeploymentStatus::Bundling,
            "BUNDLE_FAILED" => DeploymentStatus::BundleFailed,
            "BUILDING" => DeploymentStatus::Building,
            "BUILD_FAILED" => DeploymentStatus::BuildFailed,
            "DEPLOYING" => DeploymentStatus::Deploying,
            "DEPLOY_FAILED" => DeploymentStatus::DeployFailed,
            "DEPLOYED" => DeploymentStatus::Deployed,
            other => DeploymentStatus::Other(other.to_string()),
        }
    }
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStatus::Bundling => "BUNDLING",
            DeploymentStatus::BundleFailed => "BUNDLE_FAILED",
            DeploymentStatus::Building => "BUILDING",
            DeploymentStatus::BuildFailed => "BUILD_FAILED",
            DeploymentStatus::Deploying => "DEPLOYING",
            DeploymentStatus::DeployFailed => "DEPLOY_FAILED",
            DeploymentStatus::Deployed => "DEPLOYED",
            DeploymentStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == DeploymentStatus::Deployed
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::BundleFailed
                | DeploymentStatus::BuildFailed
                | DeploymentStatus::DeployFailed
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            DeploymentStatus::Bundling => "Bundling application",
            DeploymentStatus::BundleFailed => "Bundle failed ✗",
            DeploymentStatus::Building => "Building application",
            DeploymentStatus::BuildFailed => "Build failed ✗",
            DeploymentStatus::Deploying => "Deploying application",
            DeploymentStatus::DeployFailed => "Deployment failed ✗",
            DeploymentStatus::Deployed => "Deployed successfully ✓",
            DeploymentStatus::Other(_) => "Processing",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            DeploymentStatus::Bundling => Color::TrueColor { r: 255, g: 175, b: 0 },
            DeploymentStatus::Building => Color::Yellow,
            DeploymentStatus::Deploying => Color::BrightCyan,
            DeploymentStatus::Deployed => Color::Green,
            DeploymentStatus::BundleFailed
            | DeploymentStatus::BuildFailed
            | DeploymentStatus::DeployFailed => Color::Red,
            DeploymentStatus::Other(_) => Color::BrightBlack,
        }
    }
}

/// Identifies the version being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    pub application_id: String,
    pub organization_id: String,
    pub version_id: String,
}

/// Final state of a deployment as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub status: DeploymentStatus,
    /// Passed through from the backend unmodified.
    pub deployment_error: Option<String>,
    pub app_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Finished(DeploymentReport),
    /// The user stopped watching. The deployment itself keeps going.
    Cancelled,
}

/// Poll the version status until it is terminal, an API call fails, or
/// `cancel` resolves.
///
/// The first fetch is immediate; later fetches wait `interval` after the
/// previous non-terminal status. Every observed status is sent on `updates`.
pub async fn poll_deployment<C>(
    api: &dyn BackendApi,
    version: &VersionRef,
    interval: Duration,
    updates: Option<mpsc::UnboundedSender<DeploymentStatus>>,
    cancel: C,
) -> Result<PollOutcome, CliError>
where
    C: Future<Output = ()>,
{
    let poll = async {
        loop {
            let resp = api
                .version_status(
                    &version.application_id,
                    &version.organization_id,
                    &version.version_id,
                )
                .await?;
            let status = DeploymentStatus::from(resp.status.as_str());
            log::debug!("deployment {} status {}", version.version_id, status.as_str());

            if let Some(tx) = &updates {
                // The renderer may already be gone; polling does not depend on it.
                let _ = tx.send(status.clone());
            }

            if status.is_terminal() {
                return Ok::<_, CliError>(DeploymentReport {
                    status,
                    deployment_error: resp.deployment_error.filter(|e| !e.is_empty()),
                    app_url: resp.app_url.filter(|u| !u.is_empty()),
                });
            }

            tokio::time::sleep(interval).await;
        }
    };

    tokio::pin!(cancel);
    tokio::select! {
        biased;
        _ = &mut cancel => {
            log::debug!("deployment polling cancelled");
            Ok(PollOutcome::Cancelled)
        }
        report = poll => report.map(PollOutcome::Finished),
    }
}

/// Ellipsis that grows from 0 to 4 dots and back, one step per
/// [`DOTS_TICK_DIVISOR`] spinner ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotsAnimation {
    dots: u8,
    increasing: bool,
    ticks: u32,
}

impl Default for DotsAnimation {
    fn default() -> Self {
        Self {
            dots: 1,
            increasing: true,
            ticks: 0,
        }
    }
}

impl DotsAnimation {
    pub fn dots(&self) -> u8 {
        self.dots
    }

    /// Advance by one spinner tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks < DOTS_TICK_DIVISOR {
            return;
        }
        self.ticks = 0;
        if self.increasing {
            self.dots += 1;
            if self.dots >= MAX_DOTS {
                self.increasing = false;
            }
        } else {
            self.dots = self.dots.saturating_sub(1);
            if self.dots == 0 {
                self.increasing = true;
            }
        }
    }

    pub fn render(&self) -> String {
        ".".repeat(self.dots as usize)
    }
}

/// The text shown next to the spinner.
pub fn status_line(status: Option<&DeploymentStatus>, dots: &DotsAnimation) -> String {
    let (text, color) = match status {
        Some(s) => (s.display_text(), s.color()),
        None => ("Processing", Color::BrightBlack),
    };
    format!(
        "{} {}",
        "Status:".bold(),
        format!("{}{}", text, dots.render()).color(color).bold()
    )
}

/// Spawn the spinner task. It exits and clears the line once every sender
/// has been dropped.
pub fn spawn_renderer(mut updates: mpsc::UnboundedReceiver<DeploymentStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);

        let mut dots = DotsAnimation::default();
        let mut current: Option<DeploymentStatus> = None;
        let mut ticker = tokio::time::interval(Duration::from_millis(SPINNER_TICK_MS));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    dots.tick();
                    bar.set_message(status_line(current.as_ref(), &dots));
                    bar.tick();
                }
                update = updates.recv() => match update {
                    Some(status) => {
                        current = Some(status);
                        bar.set_message(status_line(current.as_ref(), &dots));
                    }
                    None => break,
                }
            }
        }

        bar.finish_and_clear();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        for s in ["BUNDLE_FAILED", "BUILD_FAILED", "DEPLOY_FAILED"] {
            let status = DeploymentStatus::from(s);
            assert!(status.is_terminal());
            assert!(status.is_failure());
            assert!(!status.is_success());
        }
        assert!(DeploymentStatus::from("DEPLOYED").is_success());
        for s in ["BUNDLING", "BUILDING", "DEPLOYING", "QUEUED", "deployed", ""] {
            assert!(!DeploymentStatus::from(s).is_terminal(), "{s} is not terminal");
        }
    }

    #[test]
    fn test_unknown_status_is_processing() {
        let status = DeploymentStatus::from("QUEUED");
        assert_eq!(status.display_text(), "Processing");
        assert_eq!(status.as_str(), "QUEUED");
    }

    #[test]
    fn test_dots_bounce_between_zero_and_four() {
        let mut dots = DotsAnimation::default();
        let mut seen = vec![dots.dots()];
        for _ in 0..(DOTS_TICK_DIVISOR * 10) {
            dots.tick();
            if seen.last() != Some(&dots.dots()) {
                seen.push(dots.dots());
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 3, 2, 1, 0, 1, 2, 3]);
    }

    #[test]
    fn test_dots_advance_every_fifth_tick() {
        let mut dots = DotsAnimation::default();
        for _ in 0..(DOTS_TICK_DIVISOR - 1) {
            dots.tick();
        }
        assert_eq!(dots.dots(), 1);
        dots.tick();
        assert_eq!(dots.dots(), 2);
    }

    #[test]
    fn test_status_line_includes_text_and_dots() {
        colored::control::set_override(false);
        let mut dots = DotsAnimation::default();
        for _ in 0..DOTS_TICK_DIVISOR {
            dots.tick();
        }
        let line = status_line(Some(&DeploymentStatus::Building), &dots);
        assert_eq!(line, "Status: Building application..");
    }
}
