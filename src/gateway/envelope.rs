//! Encrypted payload envelope
//!
//! JSON bodies travel as `{"encryptedKey": <nonce>, "encryptedData": <ciphertext>}`
//! (both base64) when a payload secret is configured. Responses without the
//! `encryptedKey` marker are passed through unchanged, so plain endpoints and
//! older servers keep working.

use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::fmt;

use super::GatewayError;
use crate::crypto::{decrypt_aes_gcm, derive_payload_key, encrypt_aes_gcm, random_bytes, NONCE_LEN};

/// Marker field identifying a sealed payload
pub const MARKER_FIELD: &str = "encryptedKey";
pub const DATA_FIELD: &str = "encryptedData";

/// Returns true when the JSON value carries the envelope marker
pub fn is_sealed(value: &Value) -> bool {
    value.get(MARKER_FIELD).is_some()
}

#[derive(Clone, Default)]
pub struct Envelope {
    key: Option<[u8; 32]>,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("sealing", &self.key.is_some())
            .finish()
    }
}

impl Envelope {
    pub fn new(secret: Option<&SecretString>) -> Self {
        Self {
            key: secret
                .map(|s| s.expose_secret().as_bytes())
                .filter(|s| !s.is_empty())
                .map(derive_payload_key),
        }
    }

    /// Envelope that never seals; sealed responses cannot be opened
    pub fn plaintext() -> Self {
        Self { key: None }
    }

    pub fn is_sealing(&self) -> bool {
        self.key.is_some()
    }

    /// Wrap a request body. Without a key the body goes out as-is.
    pub fn seal(&self, body: &Value) -> Result<Value, GatewayError> {
        let Some(key) = self.key.as_ref() else {
            return Ok(body.clone());
        };
        let plaintext = serde_json::to_vec(body)
            .map_err(|e| GatewayError::Envelope(format!("Serialize payload: {}", e)))?;
        let nonce = random_bytes(NONCE_LEN);
        let ciphertext = encrypt_aes_gcm(key, &nonce, &plaintext).map_err(GatewayError::Envelope)?;
        Ok(json!({
            MARKER_FIELD: STANDARD.encode(&nonce),
            DATA_FIELD: STANDARD.encode(&ciphertext),
        }))
    }

    /// Unwrap a response body. Unsealed bodies pass through unchanged.
    pub fn open(&self, body: Value) -> Result<Value, GatewayError> {
        if !is_sealed(&body) {
            return Ok(body);
        }
        let key = self.key.as_ref().ok_or_else(|| {
            GatewayError::Envelope("Sealed response but no payload secret configured".to_string())
        })?;

        let nonce = body
            .get(MARKER_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Envelope(format!("{} is not a string", MARKER_FIELD)))?;
        let data = body
            .get(DATA_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Envelope(format!("Missing {}", DATA_FIELD)))?;

        let nonce = STANDARD
            .decode(nonce)
            .map_err(|e| GatewayError::Envelope(format!("Bad nonce encoding: {}", e)))?;
        let ciphertext = STANDARD
            .decode(data)
            .map_err(|e| GatewayError::Envelope(format!("Bad payload encoding: {}", e)))?;

        let plaintext = decrypt_aes_gcm(key, &nonce, &ciphertext).map_err(GatewayError::Envelope)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| GatewayError::Envelope(format!("Sealed payload is not JSON: {}", e)))
    }
}
