//! Cryptographic operations for IdeaVault.
//!
//! This module provides the key material model and the payload codec using
//! well-audited libraries:
//! - **aes-gcm**: AES-256-GCM authenticated encryption
//! - **bs58**: Base58 encoding for the portable key file
//! - **blake3**: Non-secret key fingerprints
//!
//! ## Security Model
//!
//! - The key *is* the secret: 256 random bits from the OS CSPRNG, no
//!   passphrase derivation
//! - A fresh random nonce for every encryption
//! - Key bytes zeroized from memory on drop
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of encrypted list files without the key file
//! - Tampering with list files (authenticated encryption)
//!
//! We do NOT defend against:
//! - Theft of the key file itself
//! - Compromised OS / access to process memory

pub mod codec;
pub mod key_material;

pub use codec::{decrypt_bytes, decrypt_json, encrypt_bytes, encrypt_json};
pub use key_material::{
    file_name_for_date, suggest_file_name, CipherKey, KeyMaterial, SerializedKeyMaterial,
    FORMAT_VERSION, KEY_FILE_EXTENSION, KEY_FILE_MIME,
};
