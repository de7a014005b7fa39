//! Command implementations. Each command takes the [`AppContext`] and returns
//! a [`CliError`]; rendering happens once in `main`.

pub mod application;
pub mod org;
pub mod user;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::access::AccessObserver;
use crate::app::AppContext;
use crate::errors::{CliError, WrapErr};

/// Fail with `NotLoggedIn` / `TokenNotActive` unless the stored token is live.
pub async fn ensure_logged_in(ctx: &AppContext) -> Result<(), CliError> {
    let token = ctx
        .credentials
        .token()
        .wrap_err("failed to read stored token")?;
    if token.is_none_or(|t| t.is_empty()) {
        return Err(CliError::NotLoggedIn);
    }

    let verified = ctx.api.verify_token().await?;
    if !verified.active {
        return Err(CliError::TokenNotActive);
    }
    Ok(())
}

/// The stored default organization as `(id, name)`.
pub fn require_default_org(ctx: &AppContext) -> Result<(String, String), CliError> {
    ctx.credentials
        .default_org()
        .wrap_err("failed to read default organization")?
        .ok_or(CliError::NoOrganizationSelected)
}

/// Let the user pick from `labels`. A single entry is picked without asking.
///
/// `flag` names the option that replaces the prompt in non-interactive runs.
pub fn choose(
    ctx: &AppContext,
    title: &str,
    labels: &[String],
    flag: &str,
) -> Result<usize, CliError> {
    match labels.len() {
        0 => Err(CliError::invalid_input("nothing to choose from")),
        1 => Ok(0),
        _ if !ctx.interactive => Err(CliError::invalid_input(format!(
            "{} is required when running non-interactively",
            flag
        ))),
        _ => ctx
            .prompt
            .select(title, labels)
            .wrap_err("failed to show selection")?
            .ok_or(CliError::OperationCancelled),
    }
}

/// Prompt for a line of text, or fail when prompting is not allowed.
pub fn ask(
    ctx: &AppContext,
    title: &str,
    description: &str,
    flag: &str,
    validate: &dyn Fn(&str) -> Result<(), String>,
) -> Result<String, CliError> {
    if !ctx.interactive {
        return Err(CliError::invalid_input(format!(
            "{} is required when running non-interactively",
            flag
        )));
    }
    ctx.prompt
        .input(title, description, "", validate)
        .wrap_err("failed to read input")?
        .map(|s| s.trim().to_string())
        .ok_or(CliError::OperationCancelled)
}

/// Render environment variables as `KEY=VALUE` lines.
pub fn render_env(vars: &BTreeMap<String, String>) -> String {
    vars.iter()
        .map(|(k, v)| format!("{}={}\n", k, v))
        .collect()
}

/// Fetch the application's environment and write `<dir>/.env`.
pub async fn generate_env_file(
    ctx: &AppContext,
    dir: &Path,
    organization_id: &str,
    application_id: &str,
) -> Result<(PathBuf, usize), CliError> {
    let vars = ctx
        .api
        .application_env(organization_id, application_id)
        .await
        .wrap_err("failed to get environment variables")?;

    let path = dir.join(".env");
    fs::write(&path, render_env(&vars))
        .map_err(anyhow::Error::from)
        .wrap_err(format!("failed to write {}", path.display()))?;
    Ok((path, vars.len()))
}

/// Prints reconciler progress to stdout and opens the invitation page.
pub struct ConsoleObserver<'a> {
    ctx: &'a AppContext,
}

impl<'a> ConsoleObserver<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }
}

impl AccessObserver for ConsoleObserver<'_> {
    fn already_has_access(&self) {
        log::debug!("repository access confirmed");
    }

    fn requesting_access(&self, username: &str) {
        println!(
            "{} {}",
            "Adding GitHub collaborator:".cyan(),
            username.bright_cyan()
        );
    }

    fn invitation_sent(&self, url: &str) {
        println!(
            "\n{}\n{}",
            "An invitation has been sent to your GitHub account.".yellow(),
            format!("Accept it at: {}", url).yellow()
        );
        if self.ctx.interactive {
            self.ctx.open_browser(url);
            print!("{}", "Waiting for access".dimmed());
            let _ = io::stdout().flush();
        }
    }

    fn still_waiting(&self) {
        if self.ctx.interactive {
            print!("{}", ".".dimmed());
            let _ = io::stdout().flush();
        }
    }

    fn granted(&self) {
        println!("\n{}", "✓ Repository access granted!".green());
    }
}
