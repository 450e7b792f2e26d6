//! Application-level utilities for the IdeaVault CLI.
//!
//! This module provides:
//! - Path resolution for config and list files
//! - Terminal prompts for the key store
//! - The per-invocation application context

mod access;
mod context;
mod resolver;

// Re-export public API
pub use context::AppContext;
pub use resolver::{missing_list_message, resolve_config_path};
