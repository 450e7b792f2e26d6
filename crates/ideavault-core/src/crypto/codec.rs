//! AES-256-GCM codec for JSON payloads.
//!
//! Blob layout:
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! Each call to [`encrypt_json`] draws a fresh random nonce. The key file's
//! 32-byte IV is bound to every blob as associated data, so a blob only opens
//! under the exact key file that produced it.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::Nonce;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use super::key_material::KeyMaterial;
use crate::error::{Result, VaultError};

/// Size of the AES-GCM nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Encrypt raw bytes under the key material.
pub fn encrypt_bytes(material: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = material.key().cipher()?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| VaultError::Crypto(format!("Random number generator failed: {}", e)))?;

    let payload = Payload {
        msg: plaintext,
        aad: material.iv(),
    };
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), payload)
        .map_err(|e| VaultError::Crypto(format!("Encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt_bytes`].
///
/// # Errors
///
/// Returns `VaultError::Authentication` if the blob is truncated, was
/// tampered with, or was produced under different key material.
pub fn decrypt_bytes(material: &KeyMaterial, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        tracing::debug!(len = blob.len(), "blob too short to authenticate");
        return Err(VaultError::Authentication);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = material.key().cipher()?;

    let payload = Payload {
        msg: ciphertext,
        aad: material.iv(),
    };
    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Authentication)
}

/// Serialize a payload to JSON and encrypt it.
pub fn encrypt_json<T>(material: &KeyMaterial, payload: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
    encrypt_bytes(material, &plaintext)
}

/// Decrypt a blob and parse the plaintext as JSON.
///
/// Decryption is all-or-nothing: either the whole payload authenticates and
/// parses, or an error is returned.
///
/// # Errors
///
/// - `VaultError::Authentication` if the blob does not authenticate
/// - `VaultError::Format` if the plaintext is not valid JSON for `T`
pub fn decrypt_json<T>(material: &KeyMaterial, blob: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let plaintext = decrypt_bytes(material, blob)?;
    serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::Format(format!("Decrypted payload is not valid JSON: {}", e)))
}
