//! `git`/`ssh` subprocess adapter and GitHub remote URL parsing.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;

use crate::constants::git::{
    DEFAULT_BRANCH, DEFAULT_REMOTE, GITHUB_WEB_BASE, HTTPS_REMOTE_PATTERN, NOREPLY_EMAIL_PATTERN,
    SSH_GREETING_PATTERN, SSH_HOST, SSH_IDENTIFY_TIMEOUT_SECS, SSH_PROBE_TIMEOUT_SECS,
    SSH_REMOTE_PATTERN, SSH_SUCCESS_MARKER,
};
use crate::errors::{CliError, GitError};

/// Owner and repository name parsed from a GitHub remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub owner: String,
    pub repo: String,
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}")))
}

fn ssh_remote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, SSH_REMOTE_PATTERN)
}

fn https_remote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, HTTPS_REMOTE_PATTERN)
}

fn ssh_greeting_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, SSH_GREETING_PATTERN)
}

fn noreply_email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, NOREPLY_EMAIL_PATTERN)
}

/// Parse `git@github.com:<owner>/<repo>[.git]` or
/// `https://github.com/<owner>/<repo>[.git]`.
///
/// Surrounding whitespace is ignored. Anything else is rejected with the
/// original input echoed back.
pub fn parse_remote_url(remote_url: &str) -> Result<RemoteInfo, CliError> {
    let trimmed = remote_url.trim();

    let captures = ssh_remote_regex()
        .captures(trimmed)
        .or_else(|| https_remote_regex().captures(trimmed));

    match captures {
        Some(caps) => Ok(RemoteInfo {
            owner: caps[1].to_string(),
            repo: caps[2]
                .strip_suffix(".git")
                .unwrap_or(&caps[2])
                .to_string(),
        }),
        None => Err(CliError::UnsupportedRemoteUrl {
            url: remote_url.to_string(),
        }),
    }
}

/// A GitHub repository known by its clone URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub ssh_url: Option<String>,
    pub https_url: Option<String>,
    pub owner: String,
    pub repo_name: String,
}

impl RepositoryRef {
    /// Build from backend clone URLs. Empty strings count as absent; the
    /// HTTPS URL is preferred for owner/name extraction.
    pub fn from_clone_urls(ssh_url: &str, https_url: &str) -> Result<Self, CliError> {
        let ssh_url = non_empty(ssh_url);
        let https_url = non_empty(https_url);

        let source = https_url
            .as_deref()
            .or(ssh_url.as_deref())
            .ok_or(CliError::NoValidCloneMethod)?;
        let info = parse_remote_url(source)?;

        Ok(Self {
            ssh_url,
            https_url,
            owner: info.owner,
            repo_name: info.repo,
        })
    }

    /// Build from a single remote URL (e.g. the local `origin`).
    pub fn from_remote(url: &str) -> Result<Self, CliError> {
        let info = parse_remote_url(url)?;
        let trimmed = url.trim().to_string();
        let is_ssh = ssh_remote_regex().is_match(&trimmed);
        Ok(Self {
            ssh_url: is_ssh.then(|| trimmed.clone()),
            https_url: (!is_ssh).then_some(trimmed),
            owner: info.owner,
            repo_name: info.repo,
        })
    }

    /// Browser URL where a pending collaborator invitation can be accepted.
    pub fn invitation_url(&self) -> String {
        format!("{}/{}/{}", GITHUB_WEB_BASE, self.owner, self.repo_name)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// Extract the username from an SSH greeting banner.
pub fn parse_ssh_username(output: &str) -> Option<String> {
    ssh_greeting_regex()
        .captures(output)
        .map(|caps| caps[1].to_string())
}

/// Extract the username from a GitHub no-reply commit email.
pub fn parse_noreply_email(email: &str) -> Option<String> {
    noreply_email_regex()
        .captures(email.trim())
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Directory name derived from an application name: lowercase, runs of
/// non-alphanumerics collapsed to `-`, trimmed, `app` when nothing is left.
pub fn sanitize_dir_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "app".to_string()
    } else {
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub status: Option<i32>,
}

impl GitOutput {
    fn combined(&self) -> String {
        let mut s = self.stderr.trim().to_string();
        let out = self.stdout.trim();
        if !out.is_empty() {
            if !s.is_empty() {
                s.push('\n');
            }
            s.push_str(out);
        }
        s
    }
}

/// Thin async wrapper over the `git` and `ssh` binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCli {
    pub git_binary: PathBuf,
    pub ssh_binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            ssh_binary: PathBuf::from("ssh"),
        }
    }
}

impl GitCli {
    pub fn new(git_binary: impl Into<PathBuf>, ssh_binary: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
            ssh_binary: ssh_binary.into(),
        }
    }

    async fn exec<I, S>(&self, binary: &Path, cwd: Option<&Path>, args: I) -> Result<GitOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();

        let mut command = Command::new(binary);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command
            .args(&owned_args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let rendered = render_command(binary, &owned_args);
        log::debug!("running `{}`", rendered);
        let output = command.output().await.map_err(|source| GitError::Io {
            command: rendered.clone(),
            source,
        })?;

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            status: output.status.code(),
        })
    }

    /// Run `git` and fail on a non-zero exit, carrying the command output.
    pub async fn run<I, S>(&self, cwd: Option<&Path>, args: I) -> Result<GitOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let output = self.exec(&self.git_binary, cwd, &owned_args).await?;
        if !output.success {
            let combined = output.combined();
            if combined.contains("not a git repository") {
                return Err(GitError::NotARepository);
            }
            return Err(GitError::CommandFailed {
                command: render_command(&self.git_binary, &owned_args),
                status: output.status,
                output: combined,
            });
        }
        Ok(output)
    }

    async fn ssh_handshake(&self, connect_timeout: u32) -> Result<String, GitError> {
        let timeout = format!("ConnectTimeout={}", connect_timeout);
        let output = self
            .exec(
                &self.ssh_binary,
                None,
                ["-T", "-o", "BatchMode=yes", "-o", timeout.as_str(), SSH_HOST],
            )
            .await?;
        // GitHub closes the session with exit status 1 even on success.
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    /// True when a batch-mode SSH handshake with GitHub authenticates.
    pub async fn can_use_ssh(&self) -> bool {
        match self.ssh_handshake(SSH_PROBE_TIMEOUT_SECS).await {
            Ok(out) => out.contains(SSH_SUCCESS_MARKER),
            Err(e) => {
                log::debug!("ssh probe failed: {}", e);
                false
            }
        }
    }

    /// `git ls-remote --heads <url>`; true iff it exits with status 0.
    pub async fn ls_remote(&self, url: &str) -> bool {
        self.run(None, ["ls-remote", "--heads", url]).await.is_ok()
    }

    /// Username from the SSH greeting banner, if any.
    pub async fn ssh_username(&self) -> Option<String> {
        let out = self.ssh_handshake(SSH_IDENTIFY_TIMEOUT_SECS).await.ok()?;
        parse_ssh_username(&out)
    }

    /// Username from `github.user`, falling back to a no-reply `user.email`.
    pub async fn config_username(&self) -> Option<String> {
        if let Ok(out) = self.run(None, ["config", "--get", "github.user"]).await {
            let user = out.stdout.trim();
            if !user.is_empty() {
                return Some(user.to_string());
            }
        }
        let out = self.run(None, ["config", "--get", "user.email"]).await.ok()?;
        parse_noreply_email(&out.stdout)
    }

    pub async fn clone_repo(&self, url: &str, target: &Path) -> Result<(), GitError> {
        self.run(None, [OsStr::new("clone"), OsStr::new(url), target.as_os_str()])
            .await
            .map(|_| ())
    }

    pub async fn pull(&self, dir: &Path) -> Result<(), GitError> {
        self.run(Some(dir), ["pull"]).await.map(|_| ())
    }

    /// URL of `origin`, or `None` when the repository has no such remote.
    pub async fn remote_url(&self, dir: Option<&Path>) -> Result<Option<String>, GitError> {
        match self.run(dir, ["remote", "get-url", DEFAULT_REMOTE]).await {
            Ok(out) => {
                let url = out.stdout.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn remove_remote(&self, dir: &Path, name: &str) -> Result<(), GitError> {
        self.run(Some(dir), ["remote", "remove", name]).await.map(|_| ())
    }

    pub async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError> {
        self.run(Some(dir), ["remote", "add", name, url]).await.map(|_| ())
    }

    /// `remote set-url`, falling back to `remote add` when the remote is missing.
    pub async fn set_remote_url(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError> {
        if self
            .run(Some(dir), ["remote", "set-url", name, url])
            .await
            .is_ok()
        {
            return Ok(());
        }
        self.add_remote(dir, name, url).await
    }

    /// Force-push `main` to `origin` and set upstream.
    pub async fn push_force_main(&self, dir: &Path) -> Result<(), GitError> {
        self.run(
            Some(dir),
            ["push", "--force", "-u", DEFAULT_REMOTE, DEFAULT_BRANCH],
        )
        .await
        .map(|_| ())
    }

    pub async fn push(&self, dir: Option<&Path>) -> Result<(), GitError> {
        self.run(dir, ["push"]).await.map(|_| ())
    }

    pub async fn has_uncommitted_changes(&self, dir: Option<&Path>) -> Result<bool, GitError> {
        let out = self.run(dir, ["status", "--porcelain"]).await?;
        Ok(!out.stdout.trim().is_empty())
    }

    pub async fn add_all(&self, dir: Option<&Path>) -> Result<(), GitError> {
        self.run(dir, ["add", "."]).await.map(|_| ())
    }

    pub async fn commit(&self, dir: Option<&Path>, message: &str) -> Result<(), GitError> {
        self.run(dir, ["commit", "-m", message]).await.map(|_| ())
    }

    pub async fn repo_root(&self, dir: Option<&Path>) -> Result<PathBuf, GitError> {
        let out = self.run(dir, ["rev-parse", "--show-toplevel"]).await?;
        Ok(PathBuf::from(out.stdout.trim()))
    }

    pub async fn is_git_repository(&self, dir: Option<&Path>) -> bool {
        self.run(dir, ["rev-parse", "--git-dir"]).await.is_ok()
    }
}

fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
