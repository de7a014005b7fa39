use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::api::{
    ApplicationByRepoResponse, ApplicationItem, CreateApplicationResponse, CreateVersionResponse,
    LoginPollResponse, LoginStartResponse, Organization, TemplateItem, VerifyTokenResponse,
    VersionStatusResponse,
};
use crate::errors::ApiError;
use crate::git::GitCli;

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn start_login(&self) -> Result<LoginStartResponse, ApiError>;
    async fn poll_login(&self, device_code: &str) -> Result<LoginPollResponse, ApiError>;
    async fn verify_token(&self) -> Result<VerifyTokenResponse, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn organizations(&self) -> Result<Vec<Organization>, ApiError>;
    async fn create_application(
        &self,
        name: &str,
        description: &str,
        organization_id: &str,
    ) -> Result<CreateApplicationResponse, ApiError>;
    async fn application_by_repo(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApplicationByRepoResponse, ApiError>;
    async fn application_env(
        &self,
        organization_id: &str,
        application_id: &str,
    ) -> Result<BTreeMap<String, String>, ApiError>;
    async fn organization_applications(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApplicationItem>, ApiError>;
    async fn templates(&self) -> Result<Vec<TemplateItem>, ApiError>;
    async fn set_application_template(
        &self,
        application_id: &str,
        template_id: &str,
    ) -> Result<(), ApiError>;
    async fn add_github_collaborator(
        &self,
        application_id: &str,
        github_username: &str,
    ) -> Result<(), ApiError>;
    async fn create_version(
        &self,
        application_id: &str,
        app_url: Option<&str>,
    ) -> Result<CreateVersionResponse, ApiError>;
    async fn version_status(
        &self,
        application_id: &str,
        organization_id: &str,
        version_id: &str,
    ) -> Result<VersionStatusResponse, ApiError>;
}

/// Subprocess seam over `git` and `ssh`.
#[async_trait]
pub trait GitShell: Send + Sync {
    async fn can_use_ssh(&self) -> bool;
    async fn ls_remote(&self, url: &str) -> bool;
    async fn ssh_username(&self) -> Option<String>;
    async fn config_username(&self) -> Option<String>;
    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()>;
    async fn pull(&self, dir: &Path) -> Result<()>;
    async fn remote_url(&self, dir: Option<&Path>) -> Result<Option<String>>;
    async fn replace_remote(&self, dir: &Path, name: &str, url: &str) -> Result<()>;
    async fn push_force_main(&self, dir: &Path) -> Result<()>;
    async fn push(&self, dir: Option<&Path>) -> Result<()>;
    async fn has_uncommitted_changes(&self, dir: Option<&Path>) -> Result<bool>;
    async fn add_all(&self, dir: Option<&Path>) -> Result<()>;
    async fn commit(&self, dir: Option<&Path>, message: &str) -> Result<()>;
    async fn repo_root(&self, dir: Option<&Path>) -> Result<PathBuf>;
    async fn is_git_repository(&self, dir: Option<&Path>) -> bool;
}

#[derive(Default)]
pub struct RealGitShell {
    inner: GitCli,
}

impl RealGitShell {
    pub fn new(inner: GitCli) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl GitShell for RealGitShell {
    async fn can_use_ssh(&self) -> bool {
        self.inner.can_use_ssh().await
    }

    async fn ls_remote(&self, url: &str) -> bool {
        self.inner.ls_remote(url).await
    }

    async fn ssh_username(&self) -> Option<String> {
        self.inner.ssh_username().await
    }

    async fn config_username(&self) -> Option<String> {
        self.inner.config_username().await
    }

    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        self.inner
            .clone_repo(url, target)
            .await
            .context("git clone failed")
    }

    async fn pull(&self, dir: &Path) -> Result<()> {
        self.inner.pull(dir).await.context("git pull failed")
    }

    async fn remote_url(&self, dir: Option<&Path>) -> Result<Option<String>> {
        Ok(self.inner.remote_url(dir).await?)
    }

    async fn replace_remote(&self, dir: &Path, name: &str, url: &str) -> Result<()> {
        // A template clone may or may not carry the remote already.
        if let Err(e) = self.inner.remove_remote(dir, name).await {
            log::debug!("remote {} not removed: {}", name, e);
        }
        self.inner
            .set_remote_url(dir, name, url)
            .await
            .with_context(|| format!("failed to add remote {}", name))
    }

    async fn push_force_main(&self, dir: &Path) -> Result<()> {
        self.inner
            .push_force_main(dir)
            .await
            .context("git push failed")
    }

    async fn push(&self, dir: Option<&Path>) -> Result<()> {
        self.inner.push(dir).await.context("git push failed")
    }

    async fn has_uncommitted_changes(&self, dir: Option<&Path>) -> Result<bool> {
        Ok(self.inner.has_uncommitted_changes(dir).await?)
    }

    async fn add_all(&self, dir: Option<&Path>) -> Result<()> {
        Ok(self.inner.add_all(dir).await?)
    }

    async fn commit(&self, dir: Option<&Path>, message: &str) -> Result<()> {
        Ok(self.inner.commit(dir, message).await?)
    }

    async fn repo_root(&self, dir: Option<&Path>) -> Result<PathBuf> {
        Ok(self.inner.repo_root(dir).await?)
    }

    async fn is_git_repository(&self, dir: Option<&Path>) -> bool {
        self.inner.is_git_repository(dir).await
    }
}

/// Interactive prompts. `Ok(None)` means the user cancelled.
pub trait PromptInterface: Send + Sync {
    fn select(&self, title: &str, options: &[String]) -> Result<Option<usize>>;
    fn input(
        &self,
        title: &str,
        description: &str,
        placeholder: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>>;
    fn confirm(&self, title: &str, description: &str) -> Result<Option<bool>>;
}

pub struct RealPrompt;

impl PromptInterface for RealPrompt {
    fn select(&self, title: &str, options: &[String]) -> Result<Option<usize>> {
        crate::prompt::select(title, options)
    }

    fn input(
        &self,
        title: &str,
        description: &str,
        placeholder: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>> {
        crate::prompt::input(title, description, placeholder, validate)
    }

    fn confirm(&self, title: &str, description: &str) -> Result<Option<bool>> {
        crate::prompt::confirm(title, description)
    }
}

/// Browser launcher seam; failures are never fatal to callers.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

pub struct RealBrowser;

impl BrowserOpener for RealBrowser {
    fn open(&self, url: &str) -> Result<()> {
        crate::browser::open_browser(url)
    }
}
