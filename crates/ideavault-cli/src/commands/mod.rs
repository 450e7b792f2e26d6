//! Command handlers, one module per top-level subcommand.

pub mod init;
pub mod key;
pub mod list;
pub mod misc;

pub use init::handle_init;
pub use key::handle_key;
pub use list::handle_list;
pub use misc::handle_completions;
