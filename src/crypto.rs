// Nimbus Drive Shared Cryptographic Primitives
// HKDF-SHA256 key derivation + AES-256-GCM authenticated encryption
// Used by the gateway envelope

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};

pub const NONCE_LEN: usize = 12;

const PAYLOAD_KEY_INFO: &[u8] = b"nimbus-drive-payload-v1";

/// Derive the 256-bit payload key from the shared secret using HKDF-SHA256
pub fn derive_payload_key(secret: &[u8]) -> [u8; 32] {
    use hkdf::Hkdf;
    use sha2::Sha256;
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut key = [0u8; 32];
    // 32 bytes is always a valid HKDF-SHA256 output length
    let _ = hk.expand(PAYLOAD_KEY_INFO, &mut key);
    key
}

/// Encrypt plaintext using AES-256-GCM
pub fn encrypt_aes_gcm(key: &[u8; 32], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, String> {
    if nonce.len() != NONCE_LEN {
        return Err(format!("AES-GCM nonce must be {} bytes", NONCE_LEN));
    }
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let nonce = GenericArray::from_slice(nonce);
    cipher.encrypt(nonce, plaintext)
        .map_err(|e| format!("AES-GCM encrypt: {}", e))
}

/// Decrypt ciphertext using AES-256-GCM
pub fn decrypt_aes_gcm(key: &[u8; 32], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, String> {
    if nonce.len() != NONCE_LEN {
        return Err(format!("AES-GCM nonce must be {} bytes", NONCE_LEN));
    }
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let nonce = GenericArray::from_slice(nonce);
    cipher.decrypt(nonce, ciphertext)
        .map_err(|e| format!("AES-GCM decrypt: {}", e))
}

/// Generate cryptographically secure random bytes using OS entropy
pub fn random_bytes(len: usize) -> Vec<u8> {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}
