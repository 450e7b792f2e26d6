//! Key store: finding the user's key file again across sessions.
//!
//! The store never holds key bytes itself. It remembers a *handle*, a
//! revocable reference to a key file the user picked or created, in a small
//! [`HandleRepository`] under a logical name (default `"keypair"`). On each
//! load, [`KeyStoreResolver`] re-validates access to that handle before
//! reading it.
//!
//! User interaction (file picker, permission prompt, save dialog) lives
//! behind the [`FileAccess`] trait so the core stays UI-agnostic.

pub mod fs_handle;
pub mod lifecycle;
pub mod repository;
pub mod resolver;

pub use fs_handle::FsKeyFileHandle;
pub use lifecycle::{export_key_material, load_key_material, LoadedKey};
pub use repository::{HandleRepository, JsonHandleRepository, MemoryHandleRepository};
pub use resolver::{
    Effect, KeyStoreResolver, ResolveFailure, ResolveState, ResolvedKeyFile, Step,
    DEFAULT_HANDLE_NAME,
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Access state of a stored handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Not queried yet
    Unknown,
    /// Access requires the user's confirmation
    Prompt,
    /// Readable without asking
    Granted,
    /// Access refused by the platform
    Denied,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Permission::Unknown => "unknown",
            Permission::Prompt => "prompt",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        };
        f.write_str(label)
    }
}

/// A revocable reference to a key file.
pub trait KeyFileHandle: Clone + std::fmt::Debug {
    /// Human-readable description (e.g. the file path).
    fn describe(&self) -> String;

    /// Current access state. Must not prompt the user.
    fn query_permission(&self) -> Result<Permission>;

    /// Read the file's raw bytes.
    fn read(&self) -> Result<Vec<u8>>;
}

/// Parameters for picking (or creating) a file to read.
#[derive(Debug, Clone, Copy)]
pub struct PickRequest<'a> {
    pub mime: &'a str,
    pub extension: &'a str,
    pub suggested_name_prefix: &'a str,
}

/// Parameters for saving a file.
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub mime: &'a str,
    pub extension: &'a str,
    pub file_name: &'a str,
    pub handle_category: &'a str,
}

/// User-facing file capabilities consumed by the core.
///
/// Every method may be declined by the user; declining is reported as
/// `Ok(None)`, never as an error.
pub trait FileAccess {
    type Handle: KeyFileHandle;

    /// Let the user pick an existing file or create one.
    fn pick_or_create(
        &mut self,
        request: &PickRequest<'_>,
    ) -> Result<Option<(Vec<u8>, Self::Handle)>>;

    /// Ask the user to (re-)grant read access to `handle`.
    ///
    /// Returns the possibly refreshed handle on grant.
    fn request_permission(&mut self, handle: &Self::Handle) -> Result<Option<Self::Handle>>;

    /// Save `content` to a user-chosen file and return a handle to it.
    fn write_file(
        &mut self,
        request: &WriteRequest<'_>,
        content: &[u8],
    ) -> Result<Option<Self::Handle>>;
}
