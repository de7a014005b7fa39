//! Persistent storage for the session token, default organization and GitHub
//! username.
//!
//! The production store is the OS keyring (Keychain, Credential Manager or
//! the Linux kernel keyring) under the [`SERVICE`] name. When no keyring is
//! reachable it falls back to a TOML file readable only by the current user.
//! Commands never cache values: every read goes back to the store.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::constants::credentials::{
    FILE_NAME, GITHUB_USERNAME_KEY, ORG_ID_KEY, ORG_NAME_KEY, SERVICE, TOKEN_KEY,
};

/// Key/value secret storage scoped to the CLI.
///
/// Missing keys are `Ok(None)`, never an error.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;

    fn token(&self) -> Result<Option<String>> {
        self.get(TOKEN_KEY)
    }

    fn store_token(&self, token: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)
    }

    /// Default organization as `(id, name)`; both must be present.
    fn default_org(&self) -> Result<Option<(String, String)>> {
        let id = self.get(ORG_ID_KEY)?;
        let name = self.get(ORG_NAME_KEY)?;
        Ok(match (id, name) {
            (Some(id), Some(name)) if !id.is_empty() => Some((id, name)),
            _ => None,
        })
    }

    fn store_default_org(&self, id: &str, name: &str) -> Result<()> {
        self.set(ORG_ID_KEY, id)?;
        self.set(ORG_NAME_KEY, name)
    }

    fn github_username(&self) -> Result<Option<String>> {
        Ok(self.get(GITHUB_USERNAME_KEY)?.filter(|u| !u.is_empty()))
    }

    fn store_github_username(&self, username: &str) -> Result<()> {
        self.set(GITHUB_USERNAME_KEY, username)
    }

    /// Remove every credential. Used by logout.
    fn clear(&self) -> Result<()> {
        for key in [TOKEN_KEY, ORG_ID_KEY, ORG_NAME_KEY, GITHUB_USERNAME_KEY] {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// OS keyring store, one entry per key under a fixed service name.
pub struct KeyringCredentialStore {
    service: String,
    fallback: FileCredentialStore,
}

impl KeyringCredentialStore {
    pub fn new(service: &str, fallback: FileCredentialStore) -> Self {
        Self {
            service: service.to_string(),
            fallback,
        }
    }

    /// Keyring under [`SERVICE`], falling back to the XDG data dir.
    pub fn default_location() -> Self {
        Self::new(SERVICE, FileCredentialStore::default_location())
    }

    fn entry(&self, key: &str) -> keyring::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
    }
}

/// The platform has no usable keyring (no daemon, locked, unsupported).
fn keyring_unavailable(err: &keyring::Error) -> bool {
    matches!(
        err,
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)
    )
}

fn read_entry(
    result: keyring::Result<String>,
    key: &str,
    fallback: &FileCredentialStore,
) -> Result<Option<String>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => fallback.get(key),
        Err(e) if keyring_unavailable(&e) => {
            log::debug!("keyring unavailable, reading {} from file: {}", key, e);
            fallback.get(key)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {} from keyring", key)),
    }
}

fn write_entry(
    result: keyring::Result<()>,
    key: &str,
    value: &str,
    fallback: &FileCredentialStore,
) -> Result<()> {
    match result {
        // Drop any copy written while the keyring was unreachable.
        Ok(()) => fallback.delete(key),
        Err(e) if keyring_unavailable(&e) => {
            log::debug!("keyring unavailable, writing {} to file: {}", key, e);
            fallback.set(key, value)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to store {} in keyring", key)),
    }
}

fn delete_entry(
    result: keyring::Result<()>,
    key: &str,
    fallback: &FileCredentialStore,
) -> Result<()> {
    match result {
        Ok(()) | Err(keyring::Error::NoEntry) => {}
        Err(e) if keyring_unavailable(&e) => {
            log::debug!("keyring unavailable, deleting {} from file only: {}", key, e);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to delete {} from keyring", key));
        }
    }
    fallback.delete(key)
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.entry(key).and_then(|e| e.get_password());
        read_entry(result, key, &self.fallback)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        log::debug!("{}: storing {}", self.service, key);
        let result = self.entry(key).and_then(|e| e.set_password(value));
        write_entry(result, key, value, &self.fallback)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let result = self.entry(key).and_then(|e| e.delete_credential());
        delete_entry(result, key, &self.fallback)
    }
}

/// TOML-file backed store, one `key = "value"` line per credential. Used
/// when the keyring is unreachable.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    /// Store at the default XDG data location.
    pub fn default_location() -> Self {
        Self::new(crate::paths::credentials_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials: {}", self.path.display()))?;
        let entries: BTreeMap<String, String> =
            toml::from_str(&content).context("Failed to parse credentials file")?;
        Ok(entries)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .context("Credentials path has no parent directory")?;
        create_private_dir(dir)?;

        let content = toml::to_string(entries).context("Failed to serialize credentials")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary credentials file")?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write credentials")?;

        #[cfg(unix)]
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
            .context("Failed to restrict credentials file permissions")?;

        tmp.persist(&self.path)
            .with_context(|| format!("Failed to save credentials: {}", self.path.display()))?;
        Ok(())
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
        .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;

    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Process-local store used by tests and dry runs.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.entries.lock().unwrap_or_else(|e| e.into_inner());
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
        Ok(())
    }
}
