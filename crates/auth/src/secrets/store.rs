use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// A master secret as issued by the secret store.
///
/// The version token is opaque and immutable once issued. The secret bytes
/// zeroize on drop and never appear in `Debug` output; the fingerprint is
/// the only derived identity safe to log next to the version token.
#[derive(Clone)]
pub struct MasterSecret {
    version: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl MasterSecret {
    pub fn new(version: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            version: version.into(),
            bytes: Zeroizing::new(bytes.into()),
        }
    }

    /// Build a secret whose version token is its own fingerprint — for
    /// sources with no native versioning, such as environment variables.
    pub fn from_unversioned(bytes: impl Into<Vec<u8>>) -> Self {
        let mut secret = Self::new(String::new(), bytes);
        secret.version = format!("fp-{}", secret.fingerprint());
        secret
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Raw secret bytes. Callers must not persist or log these.
    pub fn expose_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Short hash of the secret bytes, safe to share for identification.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.bytes.as_slice());
        hex::encode(&hash[..8])
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MasterSecret(version: {}, fingerprint: {})",
            self.version,
            self.fingerprint()
        )
    }
}

/// Boundary to the external secret store.
///
/// Implementations are async — fetches cross a network in production. The
/// store's "latest version" pointer is authoritative for which secret is
/// current; older versions stay usable only while the store reports them
/// enabled, which is an operator action at the store, not a timer here.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the latest (current) master secret version.
    async fn latest(&self, name: &str) -> Result<MasterSecret>;

    /// Non-latest versions still enabled for verification, newest first.
    /// Empty outside a rotation window.
    async fn enabled_previous(&self, name: &str) -> Result<Vec<MasterSecret>>;
}
