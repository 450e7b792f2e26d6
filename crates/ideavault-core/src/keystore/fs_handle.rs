//! Filesystem-backed key file handles.
//!
//! A handle is the key file's path plus the BLAKE3 digest of the contents
//! the user last approved. Access is re-validated on every query:
//!
//! | File state | Permission |
//! |---|---|
//! | missing or unreadable | `Denied` |
//! | contents match approved digest | `Granted` |
//! | never approved, or contents changed | `Prompt` |
//!
//! Reading through an approved handle checks the digest again, so a file
//! swapped after the permission query is refused rather than loaded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{KeyFileHandle, Permission};
use crate::error::{Result, VaultError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsKeyFileHandle {
    path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    approved_digest: Option<String>,
}

impl FsKeyFileHandle {
    /// A handle the user has not approved yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            approved_digest: None,
        }
    }

    /// A handle approved for exactly `contents`.
    pub fn approved(path: impl Into<PathBuf>, contents: &[u8]) -> Self {
        Self {
            path: path.into(),
            approved_digest: Some(digest(contents)),
        }
    }

    /// Re-read the file and approve its current contents.
    pub fn approve(&self) -> Result<Self> {
        let contents = self.read_current()?;
        Ok(Self::approved(self.path.clone(), &contents))
    }

    /// Read the file as it is now, without checking the approval.
    ///
    /// Use this to show the user what they are about to approve.
    pub fn read_current(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|err| {
            if is_access_error(&err) {
                VaultError::PermissionDenied(format!("{}: {}", self.path.display(), err))
            } else {
                VaultError::from(err)
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_approved(&self) -> bool {
        self.approved_digest.is_some()
    }
}

impl KeyFileHandle for FsKeyFileHandle {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn query_permission(&self) -> Result<Permission> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if is_access_error(&err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "key file not accessible");
                return Ok(Permission::Denied);
            }
            Err(err) => return Err(err.into()),
        };
        let permission = match self.approved_digest.as_deref() {
            Some(approved) if approved == digest(&contents) => Permission::Granted,
            _ => Permission::Prompt,
        };
        Ok(permission)
    }

    fn read(&self) -> Result<Vec<u8>> {
        let contents = self.read_current()?;
        match self.approved_digest.as_deref() {
            Some(approved) if approved != digest(&contents) => {
                tracing::warn!(path = %self.path.display(), "key file changed since approval");
                Err(VaultError::PermissionDenied(format!(
                    "{} changed since it was approved",
                    self.path.display()
                )))
            }
            _ => Ok(contents),
        }
    }
}

fn is_access_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

fn digest(contents: &[u8]) -> String {
    blake3::hash(contents).to_hex().to_string()
}
