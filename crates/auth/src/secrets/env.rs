use anyhow::{Context, Result};
use async_trait::async_trait;

use super::store::{MasterSecret, SecretStore};

/// Secret store backed by process environment variables.
///
/// Development stand-in for a managed secret store: the secret named `NAME`
/// is read from `$NAME`, and `$NAME_PREVIOUS` may hold a comma-separated
/// list of still-accepted older secrets during a rotation. The environment
/// carries no version counter, so version tokens are fingerprint-derived.
#[derive(Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn parse_previous(value: &str) -> Vec<MasterSecret> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| MasterSecret::from_unversioned(entry.as_bytes().to_vec()))
            .collect()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn latest(&self, name: &str) -> Result<MasterSecret> {
        let value = std::env::var(name)
            .with_context(|| format!("environment variable {name} is not set"))?;
        Ok(MasterSecret::from_unversioned(value.into_bytes()))
    }

    async fn enabled_previous(&self, name: &str) -> Result<Vec<MasterSecret>> {
        match std::env::var(format!("{name}_PREVIOUS")) {
            Ok(value) => Ok(Self::parse_previous(&value)),
            Err(_) => Ok(Vec::new()),
        }
    }
}
