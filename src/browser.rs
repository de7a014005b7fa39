//! Best-effort browser launching.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// The launcher command and leading arguments for this platform.
fn launcher() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("rundll32", &["url.dll,FileProtocolHandler"])
    } else {
        ("xdg-open", &[])
    }
}

/// Open `url` in the default browser without waiting for it to exit.
pub fn open_browser(url: &str) -> Result<()> {
    let (program, args) = launcher();
    log::debug!("opening {} with {}", url, program);
    Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch {}", program))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_launcher_on_linux() {
        let (program, args) = launcher();
        assert_eq!(program, "xdg-open");
        assert!(args.is_empty());
    }
}
