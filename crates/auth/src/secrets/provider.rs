use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, info, warn};

use crate::error::AuthError;

use super::store::{MasterSecret, SecretStore};

/// Tuning for the key-material cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Secret name looked up in the backing store.
    pub secret_name: String,
    /// How long a fetched keyring is served before a refresh is attempted.
    pub refresh_interval: Duration,
    /// Upper bound on one store fetch. A fetch that exceeds it counts as a
    /// refresh failure, not a stall on the request path.
    pub fetch_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            secret_name: "ANCHOR_KEY".to_string(),
            refresh_interval: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

/// Immutable snapshot of the active master secrets.
///
/// Ordering: current version first, then still-enabled older versions,
/// newest first. A snapshot is never mutated — a refresh builds a complete
/// replacement and swaps it in whole.
pub struct Keyring {
    current_version: String,
    secrets: Vec<MasterSecret>,
    fetched_at: Instant,
}

impl Keyring {
    /// Version token new signatures should be made with.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Active secrets, current first.
    pub fn secrets(&self) -> &[MasterSecret] {
        &self.secrets
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Resolves and caches the master secrets that are valid for verification.
///
/// Holds one `Keyring` snapshot behind a read-mostly lock. Readers clone the
/// `Arc` out and drop the guard immediately; a refresh builds the next
/// snapshot off-lock and swaps it in one write, so no partial update is ever
/// visible and no lock is held across an await.
pub struct KeyMaterialProvider {
    store: Arc<dyn SecretStore>,
    config: ProviderConfig,
    cache: RwLock<Arc<Keyring>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl KeyMaterialProvider {
    /// Fetch the initial keyring. A failure here is fatal for the caller —
    /// a boundary that cannot tell authentic requests apart must not start.
    pub async fn bootstrap(
        store: Arc<dyn SecretStore>,
        config: ProviderConfig,
    ) -> Result<Self, AuthError> {
        let keyring = fetch_keyring(store.as_ref(), &config).await?;
        info!(
            current = %keyring.current_version,
            active = keyring.secrets.len(),
            "loaded initial keyring"
        );
        Ok(Self {
            store,
            config,
            cache: RwLock::new(Arc::new(keyring)),
            refresh_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Current keyring snapshot, refreshing first if the cache has expired.
    ///
    /// A failed or timed-out refresh falls back to the stale snapshot:
    /// stale key material still verifies traffic, an unavailable store
    /// must not take the boundary down with it.
    pub async fn keyring(&self) -> Result<Arc<Keyring>, AuthError> {
        let cached = self.snapshot();
        if cached.is_fresh(self.config.refresh_interval) {
            return Ok(cached);
        }

        let _guard = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited on the gate.
        let cached = self.snapshot();
        if cached.is_fresh(self.config.refresh_interval) {
            return Ok(cached);
        }

        match fetch_keyring(self.store.as_ref(), &self.config).await {
            Ok(keyring) => {
                let keyring = Arc::new(keyring);
                self.swap(Arc::clone(&keyring));
                debug!(current = %keyring.current_version(), "keyring refreshed");
                Ok(keyring)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    age = ?cached.age(),
                    "keyring refresh failed, serving stale snapshot"
                );
                Ok(cached)
            }
        }
    }

    /// Refresh now, regardless of cache age. Unlike `keyring`, a failure is
    /// reported instead of masked by the stale fallback.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_gate.lock().await;
        let keyring = fetch_keyring(self.store.as_ref(), &self.config).await?;
        debug!(
            current = %keyring.current_version,
            active = keyring.secrets.len(),
            "keyring refreshed"
        );
        self.swap(Arc::new(keyring));
        Ok(())
    }

    /// Spawn a background task refreshing the keyring every `interval`.
    ///
    /// Failures are logged and the task keeps ticking; the last good
    /// snapshot stays in service either way.
    pub fn spawn_periodic_refresh(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; bootstrap already fetched.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = provider.refresh().await {
                    warn!(error = %err, "periodic keyring refresh failed");
                }
            }
        })
    }

    /// Version token of the current signing key, from the cached snapshot.
    pub fn current_version(&self) -> String {
        self.snapshot().current_version.clone()
    }

    fn snapshot(&self) -> Arc<Keyring> {
        Arc::clone(&self.cache.read().expect("keyring lock poisoned"))
    }

    fn swap(&self, keyring: Arc<Keyring>) {
        *self.cache.write().expect("keyring lock poisoned") = keyring;
    }
}

async fn fetch_keyring(
    store: &dyn SecretStore,
    config: &ProviderConfig,
) -> Result<Keyring, AuthError> {
    let latest = timeout(config.fetch_timeout, store.latest(&config.secret_name))
        .await
        .map_err(|_| AuthError::FetchTimeout(config.fetch_timeout))?
        .map_err(|err| AuthError::SecretStore(err.to_string()))?;
    if latest.is_empty() {
        return Err(AuthError::EmptySecret(latest.version().to_string()));
    }

    let previous = timeout(
        config.fetch_timeout,
        store.enabled_previous(&config.secret_name),
    )
    .await
    .map_err(|_| AuthError::FetchTimeout(config.fetch_timeout))?
    .map_err(|err| AuthError::SecretStore(err.to_string()))?;

    let mut secrets = Vec::with_capacity(1 + previous.len());
    secrets.push(latest);
    for secret in previous {
        if secrets.iter().any(|known| known.version() == secret.version()) {
            continue;
        }
        if secret.is_empty() {
            // A malformed old version must not sink a whole rotation window.
            warn!(version = secret.version(), "skipping empty master secret version");
            continue;
        }
        secrets.push(secret);
    }

    let current_version = secrets[0].version().to_string();
    Ok(Keyring {
        current_version,
        secrets,
        fetched_at: Instant::now(),
    })
}
