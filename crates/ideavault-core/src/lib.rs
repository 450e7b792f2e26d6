//! # IdeaVault Core
//!
//! Core library for IdeaVault - encrypted idea lists protected by a portable
//! key file.
//!
//! This crate provides the key lifecycle, the payload codec, and the list
//! document model independent of any user interface.
//!
//! ## Architecture
//!
//! - **crypto**: Key material model and AES-256-GCM payload codec
//! - **document**: Idea lists and their encrypted file form
//! - **keystore**: Remembering and re-validating access to the key file
//! - **fs**: Atomic file writes

pub mod crypto;
pub mod document;
pub mod error;
pub mod fs;
pub mod keystore;

pub use crypto::KeyMaterial;
pub use document::{Idea, ListDocument};
pub use error::{Result, VaultError};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
