//! `major org ...`

use colored::Colorize;

use crate::api::Organization;
use crate::app::AppContext;
use crate::commands::{choose, ensure_logged_in, require_default_org};
use crate::errors::{CliError, WrapErr};

async fn fetch_organizations(ctx: &AppContext) -> Result<Vec<Organization>, CliError> {
    let orgs = ctx
        .api
        .organizations()
        .await
        .wrap_err("failed to fetch organizations")?;
    if orgs.is_empty() {
        return Err(CliError::NoOrganizationsAvailable);
    }
    Ok(orgs)
}

/// Pick an organization by id or name, or interactively.
pub fn pick_organization<'o>(
    ctx: &AppContext,
    orgs: &'o [Organization],
    wanted: Option<&str>,
) -> Result<&'o Organization, CliError> {
    if let Some(wanted) = wanted {
        return orgs
            .iter()
            .find(|o| o.id == wanted || o.name == wanted)
            .ok_or(CliError::OrganizationNotFound);
    }

    if orgs.len() == 1 {
        println!("Only one organization available. Automatically selecting it.");
    }
    let labels: Vec<String> = orgs.iter().map(|o| o.name.clone()).collect();
    let idx = choose(ctx, "Select an organization", &labels, "--org")?;
    Ok(&orgs[idx])
}

pub fn store_default(ctx: &AppContext, org: &Organization) -> Result<(), CliError> {
    ctx.credentials
        .store_default_org(&org.id, &org.name)
        .wrap_err("failed to store default organization")?;
    println!(
        "{} {}",
        "✓ Default organization:".green(),
        org.name.bright_cyan()
    );
    Ok(())
}

/// `org select [--org <id|name>]`
pub async fn select(ctx: &AppContext, wanted: Option<&str>) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let orgs = fetch_organizations(ctx).await?;
    let org = pick_organization(ctx, &orgs, wanted)?;
    store_default(ctx, org)
}

/// Store a default organization right after login. Several organizations in
/// a non-interactive run leave the choice to `org select`.
pub async fn select_after_login(ctx: &AppContext) -> Result<(), CliError> {
    let orgs = fetch_organizations(ctx).await?;
    if orgs.len() > 1 && !ctx.interactive {
        println!(
            "{}",
            "Several organizations are available. Run 'major org select' to choose one.".yellow()
        );
        return Ok(());
    }
    let org = pick_organization(ctx, &orgs, None)?;
    store_default(ctx, org)
}

/// `org list`
pub async fn list(ctx: &AppContext) -> Result<(), CliError> {
    ensure_logged_in(ctx).await?;
    let orgs = fetch_organizations(ctx).await?;
    let default_id = ctx
        .credentials
        .default_org()
        .wrap_err("failed to read default organization")?
        .map(|(id, _)| id);

    println!("{}", "Organizations:".bold());
    for org in &orgs {
        if default_id.as_deref() == Some(org.id.as_str()) {
            println!(
                "  {} {} {}",
                "*".green(),
                org.name.bright_cyan(),
                "(default)".dimmed()
            );
        } else {
            println!("    {}", org.name);
        }
        println!("    {}", org.id.dimmed());
    }
    Ok(())
}

/// `org whoami`
pub fn whoami(ctx: &AppContext) -> Result<(), CliError> {
    let (id, name) = require_default_org(ctx)?;
    println!("{} {}", "Default organization:".cyan(), name.bright_cyan());
    println!("{} {}", "Organization ID:".cyan(), id);
    Ok(())
}
