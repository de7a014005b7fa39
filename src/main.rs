use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use major_cli::app::AppContext;
use major_cli::cli::{AppCommand, Cli, Commands, OrgCommand, UserCommand};
use major_cli::commands::application::{self, FetchMode};
use major_cli::commands::{org, user};
use major_cli::config::Config;
use major_cli::error::render_cli_error;
use major_cli::errors::CliError;
use major_cli::paths;

async fn dispatch(ctx: &AppContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::User(cmd) => match cmd {
            UserCommand::Login => user::login(ctx).await,
            UserCommand::Logout => user::logout(ctx).await,
            UserCommand::Whoami => user::whoami(ctx).await,
            UserCommand::Gitconfig { username } => user::gitconfig(ctx, username.as_deref()).await,
        },
        Commands::Org(cmd) => match cmd {
            OrgCommand::Select { org } => org::select(ctx, org.as_deref()).await,
            OrgCommand::List => org::list(ctx).await,
            OrgCommand::Whoami => org::whoami(ctx),
        },
        Commands::App(cmd) => match cmd {
            AppCommand::Create(args) => application::create(ctx, args.into()).await,
            AppCommand::Deploy(args) => application::deploy(ctx, args.into()).await,
            AppCommand::Clone(args) => application::fetch(ctx, args.into(), FetchMode::Clone).await,
            AppCommand::Pull(args) => application::fetch(ctx, args.into(), FetchMode::Pull).await,
            AppCommand::Info => application::info(ctx).await,
            AppCommand::Env => application::env(ctx).await,
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let interactive = !cli.non_interactive && std::io::stdin().is_terminal();
    let config = Config::load(cli.config.as_deref())?;
    log::debug!("using api {}", config.api_url);
    let ctx = AppContext::production(config, interactive)?;
    dispatch(&ctx, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    paths::load_env_file();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::OperationCancelled) => {
            eprintln!("Cancelled.");
            ExitCode::from(CliError::OperationCancelled.kind().exit_code())
        }
        Err(err) => {
            log::debug!("command failed: {:?}", err);
            eprintln!("{}", render_cli_error(&err));
            ExitCode::from(err.kind().exit_code())
        }
    }
}
