#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::time::Instant;

use major_cli::api::{
    ApplicationByRepoResponse, ApplicationItem, CreateApplicationResponse, CreateVersionResponse,
    LoginPollResponse, LoginStartResponse, Organization, TemplateItem, VerifyTokenResponse,
    VersionStatusResponse,
};
use major_cli::app::{AppContext, Timing};
use major_cli::app_deps::{BackendApi, BrowserOpener, GitShell, PromptInterface};
use major_cli::config::Config;
use major_cli::credentials::MemoryCredentialStore;
use major_cli::errors::ApiError;

fn not_scripted(what: &str) -> ApiError {
    ApiError::Http(format!("{} not scripted", what))
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap()
}

#[derive(Default)]
pub struct MockBackend {
    pub login_start: Mutex<Option<LoginStartResponse>>,
    pub login_polls: Mutex<VecDeque<Result<LoginPollResponse, ApiError>>>,
    pub login_poll_times: Mutex<Vec<Instant>>,
    pub verify: Mutex<Option<Result<VerifyTokenResponse, ApiError>>>,
    pub logout_fails: AtomicBool,
    pub logout_calls: AtomicUsize,
    pub organizations: Mutex<Vec<Organization>>,
    pub applications: Mutex<Vec<ApplicationItem>>,
    pub templates: Mutex<Vec<TemplateItem>>,
    pub created_app: Mutex<Option<CreateApplicationResponse>>,
    pub create_calls: Mutex<Vec<(String, String, String)>>,
    pub app_by_repo: Mutex<Option<ApplicationByRepoResponse>>,
    pub app_by_repo_calls: Mutex<Vec<(String, String)>>,
    pub env: Mutex<BTreeMap<String, String>>,
    pub collaborator_error: Mutex<Option<ApiError>>,
    pub collaborator_calls: Mutex<Vec<(String, String)>>,
    pub created_versions: Mutex<Vec<(String, Option<String>)>>,
    pub statuses: Mutex<VecDeque<Result<VersionStatusResponse, ApiError>>>,
    pub status_times: Mutex<Vec<Instant>>,
}

impl MockBackend {
    pub fn active_user() -> Self {
        let api = Self::default();
        *lock(&api.verify) = Some(Ok(VerifyTokenResponse {
            active: true,
            user_id: "user_1".to_string(),
            email: "dev@example.com".to_string(),
            exp: 1_900_000_000,
        }));
        api
    }

    pub fn script_statuses(&self, statuses: &[&str]) {
        let mut q = lock(&self.statuses);
        for s in statuses {
            q.push_back(Ok(status(s)));
        }
    }

    pub fn collaborator_calls(&self) -> usize {
        lock(&self.collaborator_calls).len()
    }

    pub fn status_calls(&self) -> usize {
        lock(&self.status_times).len()
    }
}

pub fn status(s: &str) -> VersionStatusResponse {
    VersionStatusResponse {
        status: s.to_string(),
        deployment_error: None,
        app_url: None,
    }
}

pub fn app_item(id: &str, name: &str, repo: &str) -> ApplicationItem {
    ApplicationItem {
        id: id.to_string(),
        name: name.to_string(),
        github_repository_name: repo.to_string(),
        clone_url_ssh: format!("git@github.com:acme/{}.git", repo),
        clone_url_https: format!("https://github.com/acme/{}.git", repo),
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn start_login(&self) -> Result<LoginStartResponse, ApiError> {
        lock(&self.login_start)
            .clone()
            .ok_or_else(|| not_scripted("start_login"))
    }

    async fn poll_login(&self, _device_code: &str) -> Result<LoginPollResponse, ApiError> {
        lock(&self.login_poll_times).push(Instant::now());
        lock(&self.login_polls)
            .pop_front()
            .unwrap_or_else(|| Err(not_scripted("poll_login")))
    }

    async fn verify_token(&self) -> Result<VerifyTokenResponse, ApiError> {
        lock(&self.verify)
            .clone()
            .unwrap_or_else(|| Err(not_scripted("verify_token")))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Http("connection refused".to_string()));
        }
        Ok(())
    }

    async fn organizations(&self) -> Result<Vec<Organization>, ApiError> {
        Ok(lock(&self.organizations).clone())
    }

    async fn create_application(
        &self,
        name: &str,
        description: &str,
        organization_id: &str,
    ) -> Result<CreateApplicationResponse, ApiError> {
        lock(&self.create_calls).push((
            name.to_string(),
            description.to_string(),
            organization_id.to_string(),
        ));
        lock(&self.created_app)
            .clone()
            .ok_or_else(|| not_scripted("create_application"))
    }

    async fn application_by_repo(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApplicationByRepoResponse, ApiError> {
        lock(&self.app_by_repo_calls).push((owner.to_string(), repo.to_string()));
        lock(&self.app_by_repo)
            .clone()
            .ok_or_else(|| not_scripted("application_by_repo"))
    }

    async fn application_env(
        &self,
        _organization_id: &str,
        _application_id: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        Ok(lock(&self.env).clone())
    }

    async fn organization_applications(
        &self,
        _organization_id: &str,
    ) -> Result<Vec<ApplicationItem>, ApiError> {
        Ok(lock(&self.applications).clone())
    }

    async fn templates(&self) -> Result<Vec<TemplateItem>, ApiError> {
        Ok(lock(&self.templates).clone())
    }

    async fn set_application_template(
        &self,
        _application_id: &str,
        _template_id: &str,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn add_github_collaborator(
        &self,
        application_id: &str,
        github_username: &str,
    ) -> Result<(), ApiError> {
        lock(&self.collaborator_calls)
            .push((application_id.to_string(), github_username.to_string()));
        match lock(&self.collaborator_error).clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn create_version(
        &self,
        application_id: &str,
        app_url: Option<&str>,
    ) -> Result<CreateVersionResponse, ApiError> {
        lock(&self.created_versions)
            .push((application_id.to_string(), app_url.map(str::to_string)));
        Ok(CreateVersionResponse {
            version_id: "ver_1".to_string(),
        })
    }

    async fn version_status(
        &self,
        _application_id: &str,
        _organization_id: &str,
        _version_id: &str,
    ) -> Result<VersionStatusResponse, ApiError> {
        lock(&self.status_times).push(Instant::now());
        lock(&self.statuses)
            .pop_front()
            .unwrap_or_else(|| Err(not_scripted("version_status")))
    }
}

/// Scripted git. Successful clones create the target directory.
#[derive(Default)]
pub struct MockGitShell {
    pub ssh_ok: bool,
    pub ls_remote_script: Mutex<VecDeque<bool>>,
    pub ls_remote_default: bool,
    pub ls_remote_urls: Mutex<Vec<(String, Instant)>>,
    pub ssh_user: Option<String>,
    pub config_user: Option<String>,
    pub clone_results: Mutex<VecDeque<Result<()>>>,
    pub clone_calls: Mutex<Vec<(String, PathBuf, Instant)>>,
    pub pull_results: Mutex<VecDeque<Result<()>>>,
    pub pull_calls: Mutex<Vec<(PathBuf, Instant)>>,
    pub is_repo: bool,
    pub root: Option<PathBuf>,
    pub remote: Option<String>,
    pub uncommitted: bool,
    pub commits: Mutex<Vec<String>>,
    pub pushes: AtomicUsize,
    pub push_results: Mutex<VecDeque<Result<()>>>,
    pub push_times: Mutex<Vec<(PathBuf, Instant)>>,
    pub remotes_set: Mutex<Vec<(PathBuf, String, String)>>,
}

impl MockGitShell {
    pub fn script_ls_remote(&self, results: &[bool]) {
        lock(&self.ls_remote_script).extend(results.iter().copied());
    }

    pub fn ls_remote_calls(&self) -> usize {
        lock(&self.ls_remote_urls).len()
    }

    pub fn clone_calls(&self) -> usize {
        lock(&self.clone_calls).len()
    }

    pub fn pull_calls(&self) -> usize {
        lock(&self.pull_calls).len()
    }

    pub fn fail_clones(&self, messages: &[&str]) {
        let mut q = lock(&self.clone_results);
        for m in messages {
            q.push_back(Err(anyhow!(m.to_string()).context("git clone failed")));
        }
    }

    pub fn fail_pushes(&self, messages: &[&str]) {
        let mut q = lock(&self.push_results);
        for m in messages {
            q.push_back(Err(anyhow!(m.to_string()).context("git push failed")));
        }
    }

    pub fn push_calls(&self) -> usize {
        lock(&self.push_times).len()
    }
}

#[async_trait]
impl GitShell for MockGitShell {
    async fn can_use_ssh(&self) -> bool {
        self.ssh_ok
    }

    async fn ls_remote(&self, url: &str) -> bool {
        lock(&self.ls_remote_urls).push((url.to_string(), Instant::now()));
        lock(&self.ls_remote_script)
            .pop_front()
            .unwrap_or(self.ls_remote_default)
    }

    async fn ssh_username(&self) -> Option<String> {
        self.ssh_user.clone()
    }

    async fn config_username(&self) -> Option<String> {
        self.config_user.clone()
    }

    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        lock(&self.clone_calls).push((url.to_string(), target.to_path_buf(), Instant::now()));
        let result = lock(&self.clone_results).pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            std::fs::create_dir_all(target)?;
        }
        result
    }

    async fn pull(&self, dir: &Path) -> Result<()> {
        lock(&self.pull_calls).push((dir.to_path_buf(), Instant::now()));
        lock(&self.pull_results).pop_front().unwrap_or(Ok(()))
    }

    async fn remote_url(&self, _dir: Option<&Path>) -> Result<Option<String>> {
        Ok(self.remote.clone())
    }

    async fn replace_remote(&self, dir: &Path, name: &str, url: &str) -> Result<()> {
        lock(&self.remotes_set).push((dir.to_path_buf(), name.to_string(), url.to_string()));
        Ok(())
    }

    async fn push_force_main(&self, dir: &Path) -> Result<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        lock(&self.push_times).push((dir.to_path_buf(), Instant::now()));
        lock(&self.push_results).pop_front().unwrap_or(Ok(()))
    }

    async fn push(&self, _dir: Option<&Path>) -> Result<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn has_uncommitted_changes(&self, _dir: Option<&Path>) -> Result<bool> {
        Ok(self.uncommitted)
    }

    async fn add_all(&self, _dir: Option<&Path>) -> Result<()> {
        Ok(())
    }

    async fn commit(&self, _dir: Option<&Path>, message: &str) -> Result<()> {
        lock(&self.commits).push(message.to_string());
        Ok(())
    }

    async fn repo_root(&self, dir: Option<&Path>) -> Result<PathBuf> {
        self.root
            .clone()
            .or_else(|| dir.map(Path::to_path_buf))
            .ok_or_else(|| anyhow!("no repository root"))
    }

    async fn is_git_repository(&self, _dir: Option<&Path>) -> bool {
        self.is_repo
    }
}

/// Scripted prompt answers. An unscripted prompt is an error.
#[derive(Default)]
pub struct MockPrompt {
    pub selects: Mutex<VecDeque<Option<usize>>>,
    pub inputs: Mutex<VecDeque<Option<String>>>,
    pub confirms: Mutex<VecDeque<Option<bool>>>,
    pub titles: Mutex<Vec<String>>,
}

impl PromptInterface for MockPrompt {
    fn select(&self, title: &str, _options: &[String]) -> Result<Option<usize>> {
        lock(&self.titles).push(title.to_string());
        lock(&self.selects)
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected select: {}", title))
    }

    fn input(
        &self,
        title: &str,
        _description: &str,
        _placeholder: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>> {
        lock(&self.titles).push(title.to_string());
        let answer = lock(&self.inputs)
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected input: {}", title))?;
        if let Some(value) = &answer {
            validate(value).map_err(|e| anyhow!("scripted answer rejected: {}", e))?;
        }
        Ok(answer)
    }

    fn confirm(&self, title: &str, _description: &str) -> Result<Option<bool>> {
        lock(&self.titles).push(title.to_string());
        lock(&self.confirms)
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected confirm: {}", title))
    }
}

#[derive(Default)]
pub struct MockBrowser {
    pub opened: Mutex<Vec<String>>,
}

impl BrowserOpener for MockBrowser {
    fn open(&self, url: &str) -> Result<()> {
        lock(&self.opened).push(url.to_string());
        Ok(())
    }
}

/// Mocks plus the context built from them.
pub struct Harness {
    pub api: Arc<MockBackend>,
    pub git: Arc<MockGitShell>,
    pub prompt: Arc<MockPrompt>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub browser: Arc<MockBrowser>,
}

impl Harness {
    pub fn new(api: MockBackend, git: MockGitShell) -> Self {
        Self {
            api: Arc::new(api),
            git: Arc::new(git),
            prompt: Arc::new(MockPrompt::default()),
            credentials: Arc::new(MemoryCredentialStore::new()),
            browser: Arc::new(MockBrowser::default()),
        }
    }

    pub fn with_credentials(mut self, entries: &[(&str, &str)]) -> Self {
        self.credentials = Arc::new(MemoryCredentialStore::with_entries(
            entries.iter().copied(),
        ));
        self
    }

    pub fn logged_in(self) -> Self {
        self.with_credentials(&[
            ("token", "tok_123"),
            ("default-org", "org_1"),
            ("default-org-name", "Acme"),
        ])
    }

    pub fn context(&self, interactive: bool, cwd: &Path) -> AppContext {
        AppContext {
            config: Config::default(),
            api: self.api.clone(),
            git: self.git.clone(),
            credentials: self.credentials.clone(),
            prompt: self.prompt.clone(),
            browser: self.browser.clone(),
            interactive,
            timing: Timing::default(),
            cwd: cwd.to_path_buf(),
        }
    }
}

pub fn https_repo() -> major_cli::git::RepositoryRef {
    major_cli::git::RepositoryRef::from_clone_urls(
        "git@github.com:acme/shop.git",
        "https://github.com/acme/shop.git",
    )
    .unwrap()
}
