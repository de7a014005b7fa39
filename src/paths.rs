//! XDG-compliant path resolution for configuration and credential files.
//!
//! Config files are looked up in the XDG config directory, never in the
//! current directory. Credentials live under the XDG data directory.

use std::env;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "major";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = "major-cli";

/// Find the config.toml file.
/// Priority:
/// 1. Explicit path (the `--config` flag)
/// 2. MAJOR_CONFIG from environment (if set)
/// 3. XDG_CONFIG_HOME/major/config.toml (if XDG_CONFIG_HOME is set)
/// 4. ~/.config/major/config.toml
///
/// Returns `None` when no file exists; callers fall back to built-in defaults.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(config_path) = env::var("MAJOR_CONFIG") {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Some(path);
        }
    }

    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        let xdg_config_path = PathBuf::from(xdg_config_home)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        if xdg_config_path.exists() {
            return Some(xdg_config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let default_xdg_config = home
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        if default_xdg_config.exists() {
            return Some(default_xdg_config);
        }
    }

    None
}

/// Directory holding the credentials file.
/// Priority:
/// 1. XDG_DATA_HOME/major-cli (if XDG_DATA_HOME is set)
/// 2. Platform data dir (`~/.local/share/major-cli` on Linux)
/// 3. Current directory/.major-cli (fallback)
pub fn credentials_dir() -> PathBuf {
    if let Ok(xdg_data_home) = env::var("XDG_DATA_HOME")
        && !xdg_data_home.is_empty()
    {
        return PathBuf::from(xdg_data_home).join(DATA_DIR_NAME);
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join(DATA_DIR_NAME);
    }

    PathBuf::from(".major-cli")
}

/// Load `.env` from the XDG config dir. A `.env` in the current directory
/// belongs to the application being worked on and is never read.
///
/// Missing files are ignored.
pub fn load_env_file() {
    let xdg_env = match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => Some(PathBuf::from(xdg).join(CONFIG_DIR_NAME).join(".env")),
        Err(_) => dirs::home_dir().map(|h| h.join(".config").join(CONFIG_DIR_NAME).join(".env")),
    };
    if let Some(path) = xdg_env
        && path.exists()
        && let Err(e) = dotenv::from_path(&path)
    {
        log::debug!("ignoring unreadable {}: {}", path.display(), e);
    }
}
