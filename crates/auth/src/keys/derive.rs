use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Length in bytes of every derived key.
pub const DERIVED_KEY_LEN: usize = 32;

/// Purposes a key can be derived for.
///
/// Each purpose carries a fixed ASCII context string agreed upon by every
/// implementation of the protocol. Distinct contexts yield independent keys
/// from the same master secret, so a key issued for one purpose can never
/// stand in for another. Changing a context string invalidates every
/// signature made under it and must be rolled out like a master-secret
/// rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// HMAC key authenticating request bodies.
    RequestAuth,
    /// Key encrypting payloads at the ingest boundary.
    PayloadEncryption,
}

impl KeyPurpose {
    /// The domain-separation context mixed into the derivation.
    pub fn context(self) -> &'static [u8] {
        match self {
            KeyPurpose::RequestAuth => b"envoy-api-hmac-authentication-key",
            KeyPurpose::PayloadEncryption => b"envoy-api-fernet-encryption-key",
        }
    }
}

/// A derived signing key.
///
/// Zeroed on drop. `Debug` never prints the key bytes.
pub struct DerivedKey([u8; DERIVED_KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_LEN] {
        &self.0
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Derive a fixed-length key from a master secret and a context string.
///
/// HKDF-SHA256 with no salt — the same inputs always yield the same output,
/// which is what lets independently-deployed peers agree on a key without
/// exchanging anything beyond the master secret.
pub fn derive_key(master: &[u8], context: &[u8]) -> DerivedKey {
    let hk = Hkdf::<Sha256>::new(None, master);
    let mut output = [0u8; DERIVED_KEY_LEN];
    hk.expand(context, &mut output)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    DerivedKey(output)
}
