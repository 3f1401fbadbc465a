use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::keys::DerivedKey;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `message` under `key`.
///
/// `message` must be the raw request body bytes as received — re-serializing
/// a parsed body produces different bytes and voids the signature.
pub fn sign(key: &DerivedKey, message: &[u8]) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message);

    let bytes = mac.finalize().into_bytes();
    let mut signature = [0u8; 32];
    signature.copy_from_slice(&bytes);
    signature
}

/// Hex-encoded signature, as carried in the request header.
pub fn signature_hex(key: &DerivedKey, message: &[u8]) -> String {
    hex::encode(sign(key, message))
}

/// Compare `supplied` to the expected signature for `message`.
///
/// `ct_eq` inspects every byte regardless of where the first difference is,
/// and compares unequal lengths unequal without an early exit, so timing
/// reveals nothing about how close a forgery came.
pub fn verify_signature(key: &DerivedKey, message: &[u8], supplied: &[u8]) -> bool {
    let expected = sign(key, message);
    expected.as_slice().ct_eq(supplied).into()
}
