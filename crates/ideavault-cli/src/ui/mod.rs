//! UI primitives for the IdeaVault CLI.
//!
//! This module provides:
//! - **Context**: Environment detection (TTY, width, color, unicode)
//! - **Mode**: Output mode resolution (json, plain, pretty)
//! - **Theme**: Badge tokens and text styles
//! - **Render**: Tables, receipts, hints, errors
//!
//! # Usage
//!
//! ```ignore
//! use crate::ui::{receipt, print, UiContext};
//!
//! let ctx = UiContext::from_env(args.json, false);
//! if ctx.mode.is_json() {
//!     // Handle JSON output separately
//!     return Ok(());
//! }
//!
//! print(&ctx, &receipt(&ctx, "Created list", &[("Path", &path)]));
//! ```

mod context;
mod mode;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use mode::OutputMode;
pub use theme::Badge;

pub use render::{badge, hint, print, print_error, receipt, simple_table, Column};
