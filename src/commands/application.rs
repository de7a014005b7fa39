//! `major app ...`

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use tokio::sync::mpsc;

use crate::access::{AccessOutcome, AccessRequest, ensure_repository_access};
use crate::api::{ApplicationItem, TemplateItem};
use crate::app::AppContext;
use crate::commands::{
    ConsoleObserver, ask, choose, ensure_logged_in, generate_env_file, require_default_org,
};
use crate::constants::git::DEFAULT_REMOTE;
use crate::deploy::{PollOutcome, VersionRef, poll_deployment, spawn_renderer};
use crate::error::format_error_chain;
use crate::errors::{CliError, WrapErr};
use crate::git::{RepositoryRef, sanitize_dir_name};
use crate::retry::{
    RetryError, clone_repository, is_access_error, pull_or_clone_with_retries, retry,
};
use crate::validation::{
    validate_app_description, validate_app_name, validate_commit_message, validate_slug,
};

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Template id or name.
    pub template: Option<String>,
    pub github_username: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub message: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Application id or name.
    pub app: Option<String>,
    pub github_username: Option<String>,
}

/// Application linked to the repository in the working directory.
#[derive(Debug, Clone)]
pub struct CurrentApplication {
    pub root: PathBuf,
    pub application_id: String,
    pub organization_id: String,
    pub url_slug: Option<String>,
}

fn to_validator(f: fn(&str) -> anyhow::Result<()>) -> impl Fn(&str) -> Result<(), String> {
    move |s: &str| f(s).map_err(|e| e.to_string())
}

/// Resolve the application from the `origin` remote of the current repository.
pub async fn current_application(ctx: &AppContext) -> Result<CurrentApplication, CliError> {
    if !ctx.git.is_git_repository(Some(&ctx.cwd)).await {
        return Err(CliError::NotInGitRepository);
    }
    let root = ctx
        .git
        .repo_root(Some(&ctx.cwd))
        .await
        .wrap_err("failed to find repository root")?;
    let remote = ctx
        .git
        .remote_url(Some(&root))
        .await
        .wrap_err("failed to read git remote")?
        .ok_or(CliError::NoGitRemote)?;
    let repo = RepositoryRef::from_remote(&remote)?;

    let app = ctx
        .api
        .application_by_repo(&repo.owner, &repo.repo_name)
        .await
        .wrap_err("failed to get application")?;

    let organization_id = match app.organization_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => require_default_org(ctx)?.0,
    };

    Ok(CurrentApplication {
        root,
        application_id: app.application_id,
        organization_id,
        url_slug: app.url_slug.filter(|s| !s.is_empty()),
    })
}

/// Run the reconciler, turning a pending invitation into an error.
async fn reconcile_access(
    ctx: &AppContext,
    repo: &RepositoryRef,
    application_id: &str,
    github_username: Option<&str>,
    always_wait: bool,
) -> Result<(), CliError> {
    let observer = ConsoleObserver::new(ctx);
    let outcome = ensure_repository_access(
        ctx,
        &observer,
        AccessRequest {
            repo,
            application_id,
            github_username,
            always_wait,
        },
    )
    .await
    .wrap_err("failed to ensure repository access")?;

    match outcome {
        AccessOutcome::AlreadyHasAccess | AccessOutcome::Granted => Ok(()),
        AccessOutcome::InvitationPending { url } => Err(CliError::InvitationPending { url }),
    }
}

fn pick_template<'t>(
    ctx: &AppContext,
    templates: &'t [TemplateItem],
    wanted: Option<&str>,
) -> Result<&'t TemplateItem, CliError> {
    if templates.is_empty() {
        return Err(CliError::NoTemplatesAvailable);
    }
    if let Some(wanted) = wanted {
        return templates
            .iter()
            .find(|t| t.id == wanted || t.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CliError::invalid_input(format!("unknown template: {}", wanted)));
    }
    let labels: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();
    let idx = choose(ctx, "Select a template for your application", &labels, "--template")?;
    Ok(&templates[idx])
}

/// `app create`: new application seeded from a template.
pub async fn create(ctx: &AppContext, opts: CreateOptions) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let (org_id, org_name) = require_default_org(ctx)?;
    println!(
        "{} {}\n",
        "Creating application in organization:".cyan(),
        org_name.bright_cyan()
    );

    let name = match opts.name {
        Some(name) => {
            validate_app_name(&name).map_err(|e| CliError::invalid_input(e.to_string()))?;
            name.trim().to_string()
        }
        None => ask(
            ctx,
            "Application Name",
            "Enter a name for your application",
            "--name",
            &to_validator(validate_app_name),
        )?,
    };

    let target = ctx.cwd.join(&name);
    if target.exists() {
        return Err(CliError::invalid_input(format!(
            "directory '{}' already exists",
            target.display()
        )));
    }

    let description = match opts.description {
        Some(d) => {
            validate_app_description(&d).map_err(|e| CliError::invalid_input(e.to_string()))?;
            d
        }
        None => ask(
            ctx,
            "Application Description",
            "Enter a description for your application",
            "--description",
            &to_validator(validate_app_description),
        )?,
    };

    println!("\nFetching available templates...");
    let templates = ctx
        .api
        .templates()
        .await
        .wrap_err("failed to fetch templates")?;
    let template = pick_template(ctx, &templates, opts.template.as_deref())?;
    println!("{} {}", "Using template:".cyan(), template.name.bright_cyan());

    println!("\nCreating application '{}'...", name);
    let created = ctx
        .api
        .create_application(&name, &description, &org_id)
        .await
        .wrap_err("failed to create application")?;
    println!("✓ Application created with ID: {}", created.application_id);
    println!("✓ Repository: {}", created.repository_name);

    if let Err(e) = ctx
        .api
        .set_application_template(&created.application_id, &template.id)
        .await
    {
        log::warn!("failed to record template: {}", e);
        println!("{}", format!("Warning: could not record template: {}", e).yellow());
    }

    let repo = RepositoryRef::from_clone_urls(&created.clone_url_ssh, &created.clone_url_https)?;
    let use_ssh = repo.ssh_url.is_some() && ctx.git.can_use_ssh().await;
    let remote_url = match (&repo.ssh_url, &repo.https_url) {
        (Some(ssh), _) if use_ssh => {
            println!("✓ SSH access detected");
            ssh.clone()
        }
        (_, Some(https)) => {
            println!("✓ Using HTTPS for git operations");
            https.clone()
        }
        _ => return Err(CliError::NoValidCloneMethod),
    };

    // Stage next to the target so the final move stays on one filesystem.
    let staging = tempfile::Builder::new()
        .prefix(".major-template-")
        .tempdir_in(&ctx.cwd)
        .map_err(anyhow::Error::from)
        .wrap_err("failed to create temporary directory")?;
    let work_dir = staging.path().join("repo");

    println!("\nCloning template repository...");
    ctx.git
        .clone_repo(&template.template_url, &work_dir)
        .await
        .wrap_err("failed to clone template repository")?;
    println!("✓ Template cloned");

    ctx.git
        .replace_remote(&work_dir, DEFAULT_REMOTE, &remote_url)
        .await
        .wrap_err("failed to point repository at the new remote")?;
    println!("✓ Added new remote: {}", remote_url);

    reconcile_access(
        ctx,
        &repo,
        &created.application_id,
        opts.github_username.as_deref(),
        true,
    )
    .await?;

    println!("\nPushing to new repository...");
    push_with_retries(ctx, &work_dir).await?;
    println!("✓ Pushed to repository");

    fs::rename(&work_dir, &target)
        .map_err(anyhow::Error::from)
        .wrap_err("failed to move repository")?;
    println!(
        "\n{}",
        format!("✓ Application '{}' successfully created in ./{}", name, name).green()
    );
    println!("  Clone URL: {}", remote_url);

    println!("\nGenerating .env file...");
    match generate_env_file(ctx, &target, &org_id, &created.application_id).await {
        Ok((path, _)) => println!("✓ Generated .env file at: {}", path.display()),
        Err(e) => println!(
            "{}",
            format!("Warning: Failed to generate .env file: {}", format_error_chain(&e)).yellow()
        ),
    }

    print_next_steps(&name);
    Ok(())
}

async fn push_with_retries(ctx: &AppContext, dir: &Path) -> Result<(), CliError> {
    let result = retry(
        &ctx.timing.retry,
        |e: &anyhow::Error| is_access_error(e.as_ref()),
        |_| ctx.git.push_force_main(dir),
    )
    .await;
    match result {
        Ok(()) => Ok(()),
        Err(RetryError::Exhausted { .. }) => Err(CliError::GitRepositoryAccessFailed),
        Err(RetryError::Aborted(e)) => Err(e).wrap_err("failed to push to new repository"),
    }
}

fn print_next_steps(dir: &str) {
    println!("\n{}", "🎉 Congrats on setting up your app!".green().bold());
    println!(
        "\n{}\n  {}",
        "First, navigate to your app directory:".yellow().bold(),
        format!("cd {}", dir).yellow()
    );
    println!("\n{}", "What's next?".blue().bold());
    println!("{}", "major app deploy".cyan().bold());
    println!("{}", "  Deploy your app to production when ready".dimmed());
}

/// `app deploy`: commit pending work, create a version and watch it.
pub async fn deploy(ctx: &AppContext, opts: DeployOptions) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let app = current_application(ctx)
        .await
        .wrap_err("failed to get application ID")?;
    let root = Some(app.root.as_path());

    let has_changes = ctx
        .git
        .has_uncommitted_changes(root)
        .await
        .wrap_err("failed to check for uncommitted changes")?;

    if has_changes {
        println!("📝 Uncommitted changes detected");

        let message = match opts.message {
            Some(m) => {
                validate_commit_message(&m).map_err(|e| CliError::invalid_input(e.to_string()))?;
                m
            }
            None => ask(
                ctx,
                "Commit Message",
                "Enter a commit message for your changes",
                "--message",
                &to_validator(validate_commit_message),
            )?,
        };

        ctx.git
            .add_all(root)
            .await
            .wrap_err("failed to stage changes")?;
        println!("✓ Changes staged");
        ctx.git
            .commit(root, &message)
            .await
            .wrap_err("failed to commit changes")?;
        println!("✓ Changes committed");
        ctx.git
            .push(root)
            .await
            .wrap_err("failed to push changes")?;
        println!("✓ Changes pushed to remote");
    } else {
        println!("✓ No uncommitted changes");
    }

    let slug = match app.url_slug {
        Some(slug) => slug,
        None => choose_slug(ctx, opts.slug)?,
    };

    let version = ctx
        .api
        .create_version(&app.application_id, Some(&slug))
        .await
        .wrap_err("failed to create version")?;
    println!("\n✓ Version created: {}", version.version_id);

    let target = VersionRef {
        application_id: app.application_id,
        organization_id: app.organization_id,
        version_id: version.version_id,
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = spawn_renderer(rx);
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = poll_deployment(
        ctx.api.as_ref(),
        &target,
        ctx.timing.deploy_poll_interval,
        Some(tx),
        cancel,
    )
    .await;
    // The sender was moved into the poller and is dropped by now.
    let _ = renderer.await;

    let report = match outcome.wrap_err("failed to track deployment status")? {
        PollOutcome::Finished(report) => report,
        PollOutcome::Cancelled => {
            println!(
                "\n{}",
                "Stopped watching. The deployment continues in the background.".yellow()
            );
            return Ok(());
        }
    };

    if report.status.is_success() {
        println!("\n{}", "🎉 Deployment successful!".green().bold());
        if let Some(url) = report.app_url {
            println!("\n🌐 Your application is live at:");
            println!("  {}", url.bright_cyan());
        }
        return Ok(());
    }

    println!(
        "\n❌ Deployment failed with status: {}",
        report.status.as_str().red()
    );
    if let Some(details) = report.deployment_error {
        println!("\n{}\n\n{}", "Deployment Error Details:".red().bold(), details);
    }
    Err(CliError::DeploymentFailed {
        status: report.status.as_str().to_string(),
    })
}

fn choose_slug(ctx: &AppContext, flag: Option<String>) -> Result<String, CliError> {
    let suffix = &ctx.config.app_url_suffix;
    let slug = match flag {
        Some(slug) => {
            validate_slug(&slug).map_err(|e| CliError::invalid_input(e.to_string()))?;
            slug
        }
        None => {
            println!("\n🌐 First deploy, choose your application URL");
            println!("  Your app will be available at: https://<slug>.{}\n", suffix);
            ask(
                ctx,
                "Deploy URL",
                "Enter a URL slug for your application (e.g. my-app)",
                "--slug",
                &to_validator(validate_slug),
            )?
        }
    };
    println!("✓ Deploy URL: {}", ctx.config.app_url_for_slug(&slug));
    Ok(slug)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Clone,
    Pull,
}

impl FetchMode {
    fn verb(self) -> &'static str {
        match self {
            FetchMode::Clone => "clone",
            FetchMode::Pull => "pull",
        }
    }
}

fn pick_application<'a>(
    ctx: &AppContext,
    apps: &'a [ApplicationItem],
    wanted: Option<&str>,
    mode: FetchMode,
) -> Result<&'a ApplicationItem, CliError> {
    if apps.is_empty() {
        return Err(CliError::NoApplicationsAvailable);
    }
    if let Some(wanted) = wanted {
        return apps
            .iter()
            .find(|a| a.id == wanted || a.name == wanted)
            .ok_or(CliError::ApplicationNotFound);
    }
    if apps.len() == 1 {
        println!("Only one application available. Automatically selecting it.");
    }
    let labels: Vec<String> = apps.iter().map(|a| a.name.clone()).collect();
    let idx = choose(
        ctx,
        &format!("Select an application to {}", mode.verb()),
        &labels,
        "--app",
    )?;
    Ok(&apps[idx])
}

/// Where to put the checkout: the sanitized name, or an existing directory
/// named after the repository.
pub fn working_directory(cwd: &Path, app: &ApplicationItem) -> (PathBuf, PathBuf) {
    let desired = cwd.join(sanitize_dir_name(&app.name));
    let repo_dir = (!app.github_repository_name.is_empty())
        .then(|| cwd.join(&app.github_repository_name));
    let working = if desired.exists() {
        desired.clone()
    } else {
        match repo_dir {
            Some(dir) if dir.exists() => dir,
            _ => desired.clone(),
        }
    };
    (desired, working)
}

/// Move `working` to `desired` when that name is still free.
fn settle_directory(working: PathBuf, desired: PathBuf) -> PathBuf {
    if working == desired {
        return working;
    }
    if desired.exists() {
        println!(
            "\nNote: Directory '{}' already exists, keeping repository in '{}'",
            desired.display(),
            working.display()
        );
        return working;
    }
    match fs::rename(&working, &desired) {
        Ok(()) => {
            println!(
                "\nRenamed directory from '{}' to '{}'",
                working.display(),
                desired.display()
            );
            desired
        }
        Err(e) => {
            println!(
                "{}",
                format!(
                    "\nWarning: Failed to rename directory to '{}': {}\nContinuing with directory '{}'",
                    desired.display(),
                    e,
                    working.display()
                )
                .yellow()
            );
            working
        }
    }
}

/// `app clone` / `app pull`: fetch an application's repository and write its
/// `.env`.
pub async fn fetch(ctx: &AppContext, opts: FetchOptions, mode: FetchMode) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let (org_id, org_name) = require_default_org(ctx)?;
    println!("Fetching applications for organization: {}", org_name);

    let apps = ctx
        .api
        .organization_applications(&org_id)
        .await
        .wrap_err("failed to get applications")?;
    let app = pick_application(ctx, &apps, opts.app.as_deref(), mode)?;
    println!("Selected application: {}", app.name.bright_cyan());

    let repo = RepositoryRef::from_clone_urls(&app.clone_url_ssh, &app.clone_url_https)?;
    let (desired, working) = working_directory(&ctx.cwd, app);

    let first_try = if working.exists() {
        println!(
            "Directory '{}' already exists. Pulling latest changes...",
            working.display()
        );
        ctx.git
            .pull(&working)
            .await
            .wrap_err("failed to pull repository")
    } else {
        println!("Cloning repository into '{}'...", working.display());
        clone_repository(ctx.git.as_ref(), &repo, &working).await
    };

    if let Err(e) = first_try {
        if !is_access_error(&e) {
            log::debug!("git {} failed: {}", mode.verb(), format_error_chain(&e));
            return Err(e);
        }
        reconcile_access(ctx, &repo, &app.id, opts.github_username.as_deref(), false).await?;
        pull_or_clone_with_retries(ctx.git.as_ref(), &ctx.timing.retry, &working, &repo).await?;
    }

    let final_dir = settle_directory(working, desired);

    println!("\nGenerating .env file...");
    let (path, _) = generate_env_file(ctx, &final_dir, &org_id, &app.id)
        .await
        .wrap_err("failed to generate .env file")?;
    println!("Successfully generated .env file at: {}", path.display());

    println!("\n{}", format!("✓ Application {} complete!", mode.verb()).green());
    let dir_name = final_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| final_dir.display().to_string());
    print_next_steps(&dir_name);
    Ok(())
}

/// `app info`
pub async fn info(ctx: &AppContext) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let app = current_application(ctx).await?;
    println!("{} {}", "Application ID:".cyan(), app.application_id);
    println!("{} {}", "Organization ID:".cyan(), app.organization_id);
    if let Some(slug) = app.url_slug {
        println!("{} {}", "URL:".cyan(), ctx.config.app_url_for_slug(&slug));
    }
    Ok(())
}

/// `app env`: rewrite `.env` at the repository root.
pub async fn env(ctx: &AppContext) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let app = current_application(ctx).await?;
    let (path, count) =
        generate_env_file(ctx, &app.root, &app.organization_id, &app.application_id).await?;
    println!("Successfully generated .env file at: {}", path.display());
    println!("Environment variables written: {}", count);
    Ok(())
}
