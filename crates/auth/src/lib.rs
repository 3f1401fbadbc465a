pub mod error;
pub mod gate;
pub mod keys;
pub mod secrets;
pub mod verify;

pub use error::AuthError;
pub use gate::{AuthDecision, AuthGate, RejectReason, SIGNATURE_HEADER};
pub use keys::{DERIVED_KEY_LEN, DerivedKey, KeyCache, KeyPurpose, derive_key};
pub use secrets::{
    EnvSecretStore, InMemorySecretStore, KeyMaterialProvider, Keyring, MasterSecret,
    ProviderConfig, SecretStore,
};
pub use verify::{sign, signature_hex, verify_signature};
