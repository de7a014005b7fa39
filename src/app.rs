//! Explicit application context handed to every command.
//!
//! Holds the resolved configuration and every external collaborator behind
//! its trait seam, so tests can swap any of them for a mock.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiClient;
use crate::app_deps::{
    BackendApi, BrowserOpener, GitShell, PromptInterface, RealBrowser, RealGitShell, RealPrompt,
};
use crate::config::Config;
use crate::constants::{access, deploy};
use crate::credentials::{CredentialStore, KeyringCredentialStore};
use crate::retry::RetryPolicy;

/// Polling and retry timing. Injectable so tests can shrink or pause it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub access_poll_interval: Duration,
    pub access_timeout: Duration,
    pub deploy_poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            access_poll_interval: Duration::from_secs(access::POLL_INTERVAL_SECS),
            access_timeout: Duration::from_secs(access::POLL_TIMEOUT_SECS),
            deploy_poll_interval: Duration::from_millis(deploy::POLL_INTERVAL_MS),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct AppContext {
    pub config: Config,
    pub api: Arc<dyn BackendApi>,
    pub git: Arc<dyn GitShell>,
    pub credentials: Arc<dyn CredentialStore>,
    pub prompt: Arc<dyn PromptInterface>,
    pub browser: Arc<dyn BrowserOpener>,
    /// False when prompts must not be shown (flag or non-TTY stdin).
    pub interactive: bool,
    pub timing: Timing,
    /// Directory commands treat as "here".
    pub cwd: PathBuf,
}

impl AppContext {
    /// Production wiring: keyring credential store, HTTP client, real subprocesses.
    pub fn production(config: Config, interactive: bool) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(KeyringCredentialStore::default_location());
        let api = ApiClient::new(&config.api_url, credentials.clone())?;
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;

        Ok(Self {
            config,
            api: Arc::new(api),
            git: Arc::new(RealGitShell::default()),
            credentials,
            prompt: Arc::new(RealPrompt),
            browser: Arc::new(RealBrowser),
            interactive,
            timing: Timing::default(),
            cwd,
        })
    }

    /// Open `url` in a browser, logging instead of failing.
    pub fn open_browser(&self, url: &str) -> bool {
        match self.browser.open(url) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("could not open browser for {}: {}", url, e);
                false
            }
        }
    }
}
