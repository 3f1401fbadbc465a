mod cache;
mod derive;

pub use cache::KeyCache;
pub use derive::{DERIVED_KEY_LEN, DerivedKey, KeyPurpose, derive_key};
