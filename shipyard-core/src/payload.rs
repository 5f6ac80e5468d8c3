//! Workflow payload codec
//!
//! The payload travels through the chat provider and comes back on the next
//! button click, so it is signed. Wire format:
//!
//! ```text
//! v1.<base64url(json)>.<base64url(hmac_sha256("v1." + base64url(json)))>
//! ```
//!
//! Decoding either returns the exact payload that was encoded or an error.
//! Partially valid payloads are never returned.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::WorkflowPayload;

type HmacSha256 = Hmac<Sha256>;

/// Current schema version
pub const PAYLOAD_VERSION: &str = "v1";

/// Errors produced while encoding or decoding a payload
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Not made of three segments, or a segment is not base64
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Encoded by an incompatible version of the orchestrator
    #[error("unsupported payload version '{0}'")]
    UnsupportedVersion(String),

    /// The signature does not match the content
    #[error("payload signature mismatch")]
    SignatureMismatch,

    /// Signed correctly but not a valid workflow payload
    #[error("payload schema error: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Signs and verifies workflow payloads
#[derive(Clone)]
pub struct PayloadCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec").finish_non_exhaustive()
    }
}

impl PayloadCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Serializes and signs a payload
    pub fn encode(&self, payload: &WorkflowPayload) -> Result<String, PayloadError> {
        let json = serde_json::to_vec(payload).map_err(PayloadError::Encode)?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let signed = format!("{}.{}", PAYLOAD_VERSION, body);

        let signature = URL_SAFE_NO_PAD.encode(self.mac(signed.as_bytes()).finalize().into_bytes());

        Ok(format!("{}.{}", signed, signature))
    }

    /// Verifies and deserializes a payload
    pub fn decode(&self, value: &str) -> Result<WorkflowPayload, PayloadError> {
        let mut segments = value.split('.');
        let (Some(version), Some(body), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(PayloadError::Malformed(
                "expected three '.' separated segments".to_string(),
            ));
        };

        if version != PAYLOAD_VERSION {
            return Err(PayloadError::UnsupportedVersion(version.to_string()));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| PayloadError::Malformed(format!("signature: {}", e)))?;

        let signed_len = version.len() + 1 + body.len();
        self.mac(value[..signed_len].as_bytes())
            .verify_slice(&signature)
            .map_err(|_| PayloadError::SignatureMismatch)?;

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| PayloadError::Malformed(format!("body: {}", e)))?;

        serde_json::from_slice(&json).map_err(PayloadError::Schema)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length, so this cannot fail
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(data);
        mac
    }
}
