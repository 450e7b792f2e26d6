//! Key material: the symmetric key, its IV, and the portable key file format.
//!
//! A key file is a small JSON document:
//!
//! ```json
//! {
//!   "key": "<base58 raw AES-256 key>",
//!   "iv": "<base58 32-byte IV>",
//!   "version": 1
//! }
//! ```
//!
//! Unknown top-level fields are ignored. Unknown versions are rejected, never
//! reinterpreted.

use aes_gcm::{Aes256Gcm, KeyInit};
use chrono::{Datelike, Local, NaiveDate};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, VaultError};

/// Length of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of the key-file IV in bytes.
pub const IV_SIZE: usize = 32;

/// Current key file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Versions this build knows how to read.
const SUPPORTED_VERSIONS: &[u32] = &[FORMAT_VERSION];

/// Random bytes in the suggested file name suffix.
const NAME_SUFFIX_BYTES: usize = 4;

/// Hex characters kept from the BLAKE3 digest for display.
const FINGERPRINT_HEX_LEN: usize = 16;

/// MIME type of key files.
pub const KEY_FILE_MIME: &str = "application/json";

/// Extension of key files (without the dot).
pub const KEY_FILE_EXTENSION: &str = "json";

/// A raw AES-256-GCM key, restricted to encrypt/decrypt use.
///
/// Key bytes are zeroized when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Export the raw key bytes.
    ///
    /// The returned buffer is zeroized on drop. Avoid storing or logging it.
    pub fn export(&self) -> Zeroizing<[u8; KEY_SIZE]> {
        Zeroizing::new(self.bytes)
    }

    pub(crate) fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.bytes)
            .map_err(|e| VaultError::Crypto(format!("Invalid key: {}", e)))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Live key material used for every cipher operation.
///
/// The key and IV always travel together; there is no way to build a
/// `KeyMaterial` missing either of them.
#[derive(Clone)]
pub struct KeyMaterial {
    key: CipherKey,
    iv: [u8; IV_SIZE],
    version: u32,
}

/// Portable, string-encoded form of [`KeyMaterial`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedKeyMaterial {
    /// Base58-encoded raw key bytes
    pub key: String,
    /// Base58-encoded IV
    pub iv: String,
    /// Format version tag
    pub version: u32,
}

impl KeyMaterial {
    /// Generate a fresh key and IV from the operating system CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        fill_random(&mut key[..])?;
        let mut iv = [0u8; IV_SIZE];
        fill_random(&mut iv)?;

        tracing::debug!("generated new key material");
        Ok(Self {
            key: CipherKey::from_bytes(*key),
            iv,
            version: FORMAT_VERSION,
        })
    }

    /// The cipher key.
    pub fn key(&self) -> &CipherKey {
        &self.key
    }

    /// The key-file IV.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// The format version tag.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Export key and IV as base58 strings.
    pub fn serialize(&self) -> SerializedKeyMaterial {
        let key_bytes = self.key.export();
        SerializedKeyMaterial {
            key: bs58::encode(key_bytes.as_ref()).into_string(),
            iv: bs58::encode(&self.iv).into_string(),
            version: self.version,
        }
    }

    /// Import key material from its portable form.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Format` if:
    /// - The version is not one this build supports
    /// - Key or IV is not valid base58
    /// - Key or IV has the wrong length
    pub fn deserialize(serialized: &SerializedKeyMaterial) -> Result<Self> {
        if !SUPPORTED_VERSIONS.contains(&serialized.version) {
            return Err(VaultError::Format(format!(
                "Unsupported key file version {} (expected {})",
                serialized.version, FORMAT_VERSION
            )));
        }

        let key_bytes = decode_base58("key", &serialized.key)?;
        let key: [u8; KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
            VaultError::Format(format!(
                "Key must be {} bytes (got {})",
                KEY_SIZE,
                key_bytes.len()
            ))
        })?;

        let iv_bytes = decode_base58("iv", &serialized.iv)?;
        let iv: [u8; IV_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            VaultError::Format(format!(
                "IV must be {} bytes (got {})",
                IV_SIZE,
                iv_bytes.len()
            ))
        })?;

        Ok(Self {
            key: CipherKey::from_bytes(key),
            iv,
            version: serialized.version,
        })
    }

    /// Encode as a pretty-printed key file.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.serialize())?)
    }

    /// Parse a key file.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let serialized: SerializedKeyMaterial = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::Format(format!("Invalid key file: {}", e)))?;
        Self::deserialize(&serialized)
    }

    /// Short, non-secret identifier for this key (BLAKE3 of key and IV).
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.key.export().as_ref());
        hasher.update(&self.iv);
        let digest = hasher.finalize();
        digest.to_hex().as_str()[..FINGERPRINT_HEX_LEN].to_string()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("version", &self.version)
            .finish()
    }
}

/// Suggest a file name for exporting a key, e.g. `2024-3-14-Keypair-6hT9.json`.
///
/// The 4-byte random suffix makes collisions unlikely for a single user; it is
/// not a uniqueness guarantee.
pub fn suggest_file_name() -> Result<String> {
    file_name_for_date(Local::now().date_naive())
}

/// Build the suggested key file name for a given date.
///
/// The month is 1-based (March is `3`). Older key files named with a
/// 0-based month (March as `2`) are still valid; only the name differs.
pub fn file_name_for_date(date: NaiveDate) -> Result<String> {
    let mut suffix = [0u8; NAME_SUFFIX_BYTES];
    fill_random(&mut suffix)?;
    Ok(format!(
        "{}-{}-{}-Keypair-{}.{}",
        date.year(),
        date.month(),
        date.day(),
        bs58::encode(suffix).into_string(),
        KEY_FILE_EXTENSION
    ))
}

fn fill_random(dest: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(dest)
        .map_err(|e| VaultError::Crypto(format!("Random number generator failed: {}", e)))
}

fn decode_base58(field: &str, value: &str) -> Result<Zeroizing<Vec<u8>>> {
    bs58::decode(value)
        .into_vec()
        .map(Zeroizing::new)
        .map_err(|e| VaultError::Format(format!("Invalid base58 in {}: {}", field, e)))
}
