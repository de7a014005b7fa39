//! Input validation utilities.
//!
//! This module validates deploy URL slugs, GitHub usernames, application
//! names and commit messages before they are sent anywhere.

use anyhow::{Context, Result};
use regex::Regex;

use crate::constants;

/// Validate a deploy URL slug.
///
/// # Errors
///
/// Returns an error if:
/// - The slug is shorter than 3 or longer than 63 characters
/// - The slug is not lowercase alphanumeric with inner hyphens
/// - The slug is reserved or uses a reserved prefix
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.len() < constants::slug::MIN_LENGTH {
        anyhow::bail!(
            "slug must be at least {} characters",
            constants::slug::MIN_LENGTH
        );
    }

    if slug.len() > constants::slug::MAX_LENGTH {
        anyhow::bail!(
            "slug must be at most {} characters",
            constants::slug::MAX_LENGTH
        );
    }

    let re = Regex::new(constants::slug::PATTERN).context("Failed to compile validation regex")?;
    if !re.is_match(slug) {
        anyhow::bail!(
            "slug must be lowercase alphanumeric with hyphens, no leading/trailing hyphens"
        );
    }

    if constants::slug::RESERVED.contains(&slug) {
        anyhow::bail!("this slug is reserved");
    }

    if constants::slug::RESERVED_PREFIXES
        .iter()
        .any(|p| slug.starts_with(p))
    {
        anyhow::bail!("slugs starting with 's-' or 'vs-' are reserved");
    }

    Ok(())
}

/// Validate a GitHub username.
///
/// GitHub allows alphanumerics and single hyphens, not at either end, up to
/// 39 characters.
pub fn validate_github_username(username: &str) -> Result<()> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        anyhow::bail!("GitHub username is required");
    }

    if trimmed.len() > constants::github::MAX_USERNAME_LENGTH {
        anyhow::bail!(
            "GitHub username cannot exceed {} characters (got {})",
            constants::github::MAX_USERNAME_LENGTH,
            trimmed.len()
        );
    }

    if trimmed.starts_with('-') || trimmed.ends_with('-') || trimmed.contains("--") {
        anyhow::bail!("GitHub username cannot start or end with a hyphen or contain '--'");
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        anyhow::bail!(
            "GitHub username can only contain letters, numbers and hyphens. Got: '{}'",
            trimmed
        );
    }

    Ok(())
}

/// Application names must be non-blank.
/// The name doubles as the directory created under the current directory,
/// so it must be a single path component.
pub fn validate_app_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("application name is required");
    }
    if name.contains(['/', '\\']) {
        anyhow::bail!("application name cannot contain path separators");
    }
    if name == "." || name == ".." {
        anyhow::bail!("application name cannot be '{}'", name);
    }
    Ok(())
}

pub fn validate_app_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        anyhow::bail!("application description is required");
    }
    Ok(())
}

/// Commit messages must contain something other than whitespace.
pub fn validate_commit_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("commit message cannot be empty or whitespace only");
    }
    Ok(())
}
