//! `major user ...`

use std::io::{self, Write};
use std::time::Duration;

use chrono::DateTime;
use colored::Colorize;

use crate::app::AppContext;
use crate::auth::poll_for_token;
use crate::commands::{ask, org};
use crate::errors::{CliError, WrapErr};
use crate::validation::validate_github_username;

/// Device-code login, then pick a default organization.
pub async fn login(ctx: &AppContext) -> Result<(), CliError> {
    let start = ctx
        .api
        .start_login()
        .await
        .wrap_err("failed to start login")?;

    println!(
        "{} {}",
        "Your verification code:".cyan(),
        start.user_code.bright_cyan().bold()
    );
    println!(
        "{} {}",
        "Open this URL to authorize the CLI:".cyan(),
        start.verification_uri
    );
    ctx.open_browser(&start.verification_uri);

    print!("{}", "Waiting for authorization".dimmed());
    let _ = io::stdout().flush();
    let on_pending = || {
        print!("{}", ".".dimmed());
        let _ = io::stdout().flush();
    };
    let token = poll_for_token(
        ctx.api.as_ref(),
        &start.device_code,
        Duration::from_secs(start.interval),
        Duration::from_secs(start.expires_in),
        &on_pending,
    )
    .await;
    println!();
    let token = token?;

    ctx.credentials
        .store_token(&token)
        .wrap_err("failed to store token")?;
    println!("{}", "✓ Successfully authenticated!".green());

    org::select_after_login(ctx).await
}

/// Revoke the token (best effort) and forget every stored credential.
pub async fn logout(ctx: &AppContext) -> Result<(), CliError> {
    let has_token = ctx
        .credentials
        .token()
        .wrap_err("failed to read stored token")?
        .is_some();
    if has_token && let Err(e) = ctx.api.logout().await {
        log::debug!("token revocation failed: {}", e);
    }

    ctx.credentials
        .clear()
        .wrap_err("failed to delete credentials")?;
    println!("{}", "Successfully logged out!".green());
    Ok(())
}

/// Human-readable token expiry.
pub fn format_expiry(exp: i64) -> String {
    match DateTime::from_timestamp(exp, 0) {
        Some(at) if exp > 0 => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => "unknown".to_string(),
    }
}

pub async fn whoami(ctx: &AppContext) -> Result<(), CliError> {
    let token = ctx
        .credentials
        .token()
        .wrap_err("failed to read stored token")?;
    if token.is_none_or(|t| t.is_empty()) {
        return Err(CliError::NotLoggedIn);
    }

    let info = ctx.api.verify_token().await?;
    if !info.active {
        return Err(CliError::TokenNotActive);
    }

    println!("{} {}", "Email:".cyan(), info.email.bright_cyan());
    println!("{} {}", "User ID:".cyan(), info.user_id);
    println!("{} {}", "Token expires:".cyan(), format_expiry(info.exp));

    match ctx
        .credentials
        .default_org()
        .wrap_err("failed to read default organization")?
    {
        Some((_, name)) => println!("{} {}", "Default organization:".cyan(), name),
        None => println!(
            "{}",
            "No default organization selected. Run 'major org select'.".yellow()
        ),
    }
    Ok(())
}

/// Show the stored GitHub username; set it from `username` or a prompt.
pub async fn gitconfig(ctx: &AppContext, username: Option<&str>) -> Result<(), CliError> {
    let current = ctx
        .credentials
        .github_username()
        .wrap_err("failed to read GitHub username")?;

    let new_name = match username {
        Some(name) => {
            validate_github_username(name).map_err(|e| CliError::invalid_input(e.to_string()))?;
            name.trim().to_string()
        }
        None => {
            match &current {
                Some(name) => println!("{} {}", "GitHub username:".cyan(), name.bright_cyan()),
                None => println!("{}", "No GitHub username stored.".yellow()),
            }
            if !ctx.interactive {
                return Ok(());
            }
            let validate = |s: &str| validate_github_username(s).map_err(|e| e.to_string());
            ask(
                ctx,
                "GitHub username",
                "Used when inviting you to application repositories",
                "--username",
                &validate,
            )?
        }
    };

    ctx.credentials
        .store_github_username(&new_name)
        .wrap_err("failed to save GitHub username")?;
    println!(
        "{} {}",
        "✓ GitHub username set to".green(),
        new_name.bright_cyan()
    );
    Ok(())
}
