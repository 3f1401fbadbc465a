use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::store::{MasterSecret, SecretStore};

struct VersionEntry {
    secret: MasterSecret,
    enabled: bool,
}

#[derive(Default)]
struct NamedVersions {
    // Oldest first; the last entry is the latest.
    entries: Vec<VersionEntry>,
    next_version: u64,
}

/// In-process secret store.
///
/// Backs tests and embedded deployments. `rotate_to` adds a version and
/// makes it current; older versions stay verifiable until `set_enabled`
/// retires them, mirroring the enable/disable switch a managed store
/// exposes. `set_offline` makes every fetch fail, for exercising fallback
/// paths.
pub struct InMemorySecretStore {
    inner: Mutex<HashMap<String, NamedVersions>>,
    offline: Mutex<bool>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            offline: Mutex::new(false),
        }
    }

    /// A store holding `secret` as the first version of `name`.
    pub fn with_secret(name: &str, secret: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.rotate_to(name, secret);
        store
    }

    /// Add a new version of `name` and make it current.
    /// Returns the new version token.
    pub fn rotate_to(&self, name: &str, secret: impl Into<Vec<u8>>) -> String {
        let mut map = self.inner.lock().expect("secret store lock poisoned");
        let versions = map.entry(name.to_string()).or_default();
        versions.next_version += 1;
        let version = format!("v{}", versions.next_version);
        versions.entries.push(VersionEntry {
            secret: MasterSecret::new(version.clone(), secret),
            enabled: true,
        });
        version
    }

    /// Flip the enabled switch on one version of `name`.
    pub fn set_enabled(&self, name: &str, version: &str, enabled: bool) {
        let mut map = self.inner.lock().expect("secret store lock poisoned");
        if let Some(versions) = map.get_mut(name) {
            for entry in &mut versions.entries {
                if entry.secret.version() == version {
                    entry.enabled = enabled;
                }
            }
        }
    }

    /// Make every fetch fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().expect("secret store lock poisoned") = offline;
    }

    fn check_online(&self) -> Result<()> {
        if *self.offline.lock().expect("secret store lock poisoned") {
            bail!("secret store is offline");
        }
        Ok(())
    }
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn latest(&self, name: &str) -> Result<MasterSecret> {
        self.check_online()?;
        let map = self.inner.lock().expect("secret store lock poisoned");
        match map.get(name).and_then(|versions| versions.entries.last()) {
            Some(entry) => Ok(entry.secret.clone()),
            None => bail!("no versions exist for secret {name}"),
        }
    }

    async fn enabled_previous(&self, name: &str) -> Result<Vec<MasterSecret>> {
        self.check_online()?;
        let map = self.inner.lock().expect("secret store lock poisoned");
        let Some(versions) = map.get(name) else {
            return Ok(Vec::new());
        };
        let previous = versions
            .entries
            .iter()
            .rev()
            .skip(1)
            .filter(|entry| entry.enabled)
            .map(|entry| entry.secret.clone())
            .collect();
        Ok(previous)
    }
}
