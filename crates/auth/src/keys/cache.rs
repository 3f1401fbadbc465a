use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::secrets::MasterSecret;

use super::derive::{DerivedKey, KeyPurpose, derive_key};

/// Process-lifetime cache of derived keys.
///
/// Entries are keyed by (master-secret version, purpose). Versions are
/// immutable once issued, so an entry can never go stale; entries for
/// retired versions linger but are unreachable, since only candidates
/// supplied by the material provider are ever looked up.
#[derive(Default)]
pub struct KeyCache {
    inner: RwLock<HashMap<(String, KeyPurpose), Arc<DerivedKey>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the derived key for a secret version, deriving on first use.
    pub fn get_or_derive(&self, secret: &MasterSecret, purpose: KeyPurpose) -> Arc<DerivedKey> {
        let cache_key = (secret.version().to_string(), purpose);
        if let Some(key) = self
            .inner
            .read()
            .expect("key cache lock poisoned")
            .get(&cache_key)
        {
            return Arc::clone(key);
        }

        let derived = Arc::new(derive_key(secret.expose_bytes(), purpose.context()));
        let mut map = self.inner.write().expect("key cache lock poisoned");
        Arc::clone(map.entry(cache_key).or_insert(derived))
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("key cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
