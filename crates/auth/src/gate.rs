use std::sync::Arc;

use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};
use serde::Serialize;
use tracing::debug;

use crate::error::AuthError;
use crate::keys::{KeyCache, KeyPurpose};
use crate::secrets::KeyMaterialProvider;
use crate::verify::verify_signature;

/// Request header carrying the hex-encoded body signature.
pub const SIGNATURE_HEADER: &str = "X-Anchor-Signature";

/// Why a request was rejected. Categories only — which key versions were
/// tried never leaves the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No signature header was supplied.
    MissingSignature,
    /// The supplied signature is not valid hex.
    MalformedSignature,
    /// The signature matched none of the active keys.
    SignatureMismatch,
}

impl RejectReason {
    /// Status the boundary layer should answer with.
    pub fn status_code(self) -> StatusCode {
        match self {
            RejectReason::MissingSignature => StatusCode::UNAUTHORIZED,
            RejectReason::MalformedSignature => StatusCode::BAD_REQUEST,
            RejectReason::SignatureMismatch => StatusCode::FORBIDDEN,
        }
    }
}

impl AxumCoreIntoResponse for RejectReason {
    fn into_response(self) -> Response {
        let body = match self {
            RejectReason::MissingSignature => "Signature header missing.",
            RejectReason::MalformedSignature => "Signature is not valid hex.",
            RejectReason::SignatureMismatch => "Invalid signature.",
        };
        (self.status_code(), body).into_response()
    }
}

/// Outcome of one authentication check.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AuthDecision {
    /// The signature was made with an active key.
    Accepted { key_version: String },
    /// The request is not provably authentic.
    Rejected { reason: RejectReason },
}

impl AuthDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthDecision::Accepted { .. })
    }
}

/// Verifies request signatures against every active signing key.
///
/// One gate is shared across all request handlers; checks are independent
/// and no lock is held while a signature is being verified.
pub struct AuthGate {
    provider: Arc<KeyMaterialProvider>,
    keys: KeyCache,
}

impl AuthGate {
    pub fn new(provider: Arc<KeyMaterialProvider>) -> Self {
        Self {
            provider,
            keys: KeyCache::new(),
        }
    }

    /// Version token of the key new signatures should be made with.
    pub fn current_key_version(&self) -> String {
        self.provider.current_version()
    }

    /// Check one request.
    ///
    /// `body` must be the exact raw bytes as received — re-serializing a
    /// parsed body changes them and voids the signature. Candidate keys are
    /// tried in provider order, current first, and the first match wins.
    pub async fn authenticate(
        &self,
        body: &[u8],
        signature_hex: Option<&str>,
    ) -> Result<AuthDecision, AuthError> {
        let Some(signature_hex) = signature_hex else {
            debug!(reason = "missing_signature", "request rejected");
            return Ok(AuthDecision::Rejected {
                reason: RejectReason::MissingSignature,
            });
        };

        let supplied = match hex::decode(signature_hex) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(reason = "malformed_signature", "request rejected");
                return Ok(AuthDecision::Rejected {
                    reason: RejectReason::MalformedSignature,
                });
            }
        };

        let keyring = self.provider.keyring().await?;
        if keyring.secrets().is_empty() {
            return Err(AuthError::NoActiveKey);
        }

        for secret in keyring.secrets() {
            let key = self.keys.get_or_derive(secret, KeyPurpose::RequestAuth);
            if verify_signature(&key, body, &supplied) {
                debug!(key_version = secret.version(), "request authenticated");
                return Ok(AuthDecision::Accepted {
                    key_version: secret.version().to_string(),
                });
            }
        }

        debug!(reason = "signature_mismatch", "request rejected");
        Ok(AuthDecision::Rejected {
            reason: RejectReason::SignatureMismatch,
        })
    }
}
