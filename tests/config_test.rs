use std::env;
use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use major_cli::config::{Config, DEFAULT_APP_URL_SUFFIX, DEFAULT_FRONTEND_URI};
use major_cli::paths::load_env_file;

const VARS: [&str; 4] = [
    "MAJOR_CONFIG",
    "MAJOR_API_URL",
    "MAJOR_FRONTEND_URI",
    "MAJOR_APP_URL_SUFFIX",
];

/// Runs `f` with the `MAJOR_*` variables cleared, restoring them afterwards.
fn with_clean_env<T>(set: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<(&str, Option<String>)> = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
    unsafe {
        for k in VARS {
            env::remove_var(k);
        }
        for (k, v) in set {
            env::set_var(k, v);
        }
    }
    let out = f();
    unsafe {
        for (k, v) in saved {
            match v {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
    }
    out
}

#[test]
#[serial]
fn test_load_explicit_file_then_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "api_url = \"http://localhost:8080\"\napp_url_suffix = \"dev.local\"\n",
    )
    .unwrap();

    let config = with_clean_env(&[("MAJOR_APP_URL_SUFFIX", "staging.major.build")], || {
        Config::load(Some(&path)).unwrap()
    });

    assert_eq!(config.api_url, "http://localhost:8080");
    assert_eq!(config.frontend_uri, DEFAULT_FRONTEND_URI);
    assert_eq!(config.app_url_suffix, "staging.major.build");
}

#[test]
#[serial]
fn test_load_from_major_config_variable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "frontend_uri = \"http://localhost:3000\"\n").unwrap();
    let path_str = path.to_string_lossy().into_owned();

    let config = with_clean_env(&[("MAJOR_CONFIG", path_str.as_str())], || {
        Config::load(None).unwrap()
    });

    assert_eq!(config.frontend_uri, "http://localhost:3000");
    assert_eq!(config.app_url_suffix, DEFAULT_APP_URL_SUFFIX);
}

#[test]
#[serial]
fn test_empty_override_is_ignored() {
    let config = with_clean_env(&[("MAJOR_API_URL", "")], || {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    });
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_invalid_explicit_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "api_url = [").unwrap();

    let err = with_clean_env(&[], || Config::load(Some(&path)).unwrap_err());
    assert!(err.to_string().contains("Failed to parse config file"));
}

/// Runs `f` from inside `dir` with XDG_CONFIG_HOME pointing at an empty dir.
fn in_directory<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let xdg = TempDir::new().unwrap();
    let saved_cwd = env::current_dir().unwrap();
    let saved_xdg = env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        env::set_var("XDG_CONFIG_HOME", xdg.path());
    }
    env::set_current_dir(dir).unwrap();
    let out = f();
    env::set_current_dir(saved_cwd).unwrap();
    unsafe {
        match saved_xdg {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
    }
    out
}

#[test]
#[serial]
fn test_config_in_working_directory_is_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "api_url = \"http://attacker.example\"\n",
    )
    .unwrap();

    let config = with_clean_env(&[], || in_directory(dir.path(), || Config::load(None).unwrap()));

    assert_ne!(config.api_url, "http://attacker.example");
}

#[test]
#[serial]
fn test_env_file_in_working_directory_is_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "MAJOR_API_URL=http://attacker.example\n",
    )
    .unwrap();

    let leaked = with_clean_env(&[], || {
        in_directory(dir.path(), || {
            load_env_file();
            env::var("MAJOR_API_URL").ok()
        })
    });

    assert_eq!(leaked, None);
}

#[test]
#[serial]
fn test_env_file_in_config_directory_is_loaded() {
    let xdg = TempDir::new().unwrap();
    fs::create_dir_all(xdg.path().join("major")).unwrap();
    fs::write(
        xdg.path().join("major").join(".env"),
        "MAJOR_APP_URL_SUFFIX=dev.local\n",
    )
    .unwrap();
    let saved_xdg = env::var("XDG_CONFIG_HOME").ok();

    let suffix = with_clean_env(&[], || {
        unsafe {
            env::set_var("XDG_CONFIG_HOME", xdg.path());
        }
        load_env_file();
        env::var("MAJOR_APP_URL_SUFFIX").ok()
    });

    unsafe {
        match saved_xdg {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
    }
    assert_eq!(suffix.as_deref(), Some("dev.local"));
}
