//! Error formatting utilities.
//!
//! This module turns error chains and [`CliError`] values into the text shown
//! at the command boundary.

use colored::Colorize;
use std::error::Error as StdError;

use crate::errors::CliError;

/// Format an error and its source chain into a detailed error message.
///
/// All messages in the chain are joined with " → ".
///
/// # Example
///
/// ```
/// use major_cli::error::format_error_chain;
///
/// let err = anyhow::anyhow!("exit status 128")
///     .context("git clone failed")
///     .context("failed to clone repository");
/// let formatted = format_error_chain(err.as_ref());
/// assert_eq!(formatted, "failed to clone repository → git clone failed → exit status 128");
/// ```
pub fn format_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut error_chain = vec![format!("{}", error)];
    let mut current = error.source();
    while let Some(err) = current {
        error_chain.push(format!("{}", err));
        current = err.source();
    }
    error_chain.join(" → ")
}

/// Render a [`CliError`] as the boxed block printed before exiting.
///
/// The first line is the error title, followed by the underlying cause chain
/// (when there is one) and the suggestion.
pub fn render_cli_error(error: &CliError) -> String {
    let title = error.to_string();
    let mut lines = vec![format!("{} {}", "✗".red().bold(), title.red().bold())];

    let mut details = Vec::new();
    let mut current = error.source();
    while let Some(err) = current {
        let text = err.to_string();
        if text != title && !details.contains(&text) {
            details.push(text);
        }
        current = err.source();
    }
    if !details.is_empty() {
        lines.push(format!("  {}", details.join(" → ").dimmed()));
    }

    if let Some(suggestion) = error.suggestion() {
        lines.push(String::new());
        for line in suggestion.lines() {
            lines.push(format!("  {}", line.yellow()));
        }
    }

    let width = lines
        .iter()
        .map(|l| strip_ansi_len(l))
        .max()
        .unwrap_or(0)
        .min(100);
    let border = "─".repeat(width + 2);
    let mut out = format!("┌{}┐\n", border);
    for line in &lines {
        out.push_str(&format!("  {}\n", line));
    }
    out.push_str(&format!("└{}┘", border));
    out
}

fn strip_ansi_len(s: &str) -> usize {
    let mut len = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\u{1b}' {
            in_escape = true;
        } else {
            len += 1;
        }
    }
    len
}
