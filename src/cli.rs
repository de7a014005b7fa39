//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::application::{CreateOptions, DeployOptions, FetchOptions};

#[derive(Parser, Debug)]
#[command(name = "major")]
#[command(version, about = "Create, clone and deploy Major applications")]
pub struct Cli {
    /// Path to a config.toml overriding the default lookup
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Never prompt; fail or skip where input would be needed
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication and account settings
    #[command(subcommand)]
    User(UserCommand),

    /// Organization selection
    #[command(subcommand)]
    Org(OrgCommand),

    /// Application lifecycle
    #[command(subcommand)]
    App(AppCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Log in through the browser
    Login,
    /// Log out and delete stored credentials
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show or set the GitHub username used for repository invitations
    Gitconfig {
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Choose the default organization
    Select {
        /// Organization id or name
        #[arg(long)]
        org: Option<String>,
    },
    /// List organizations
    List,
    /// Show the default organization
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Create an application from a template
    Create(CreateArgs),
    /// Commit, push and deploy the application in the current directory
    Deploy(DeployArgs),
    /// Clone an application repository
    Clone(FetchArgs),
    /// Pull (or clone) an application repository
    Pull(FetchArgs),
    /// Show the application linked to the current directory
    Info,
    /// Regenerate the .env file for the current application
    Env,
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Template id or name
    #[arg(long)]
    pub template: Option<String>,
    #[arg(long)]
    pub github_username: Option<String>,
}

impl From<CreateArgs> for CreateOptions {
    fn from(args: CreateArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
            template: args.template,
            github_username: args.github_username,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Commit message for uncommitted changes (skips the prompt)
    #[arg(short, long)]
    pub message: Option<String>,
    /// URL slug for the first deploy (skips the prompt)
    #[arg(long)]
    pub slug: Option<String>,
}

impl From<DeployArgs> for DeployOptions {
    fn from(args: DeployArgs) -> Self {
        Self {
            message: args.message,
            slug: args.slug,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    /// Application id or name
    #[arg(long, visible_alias = "app-id")]
    pub app: Option<String>,
    #[arg(long)]
    pub github_username: Option<String>,
}

impl From<FetchArgs> for FetchOptions {
    fn from(args: FetchArgs) -> Self {
        Self {
            app: args.app,
            github_username: args.github_username,
        }
    }
}
