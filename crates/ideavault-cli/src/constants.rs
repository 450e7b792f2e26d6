//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// General failure.
    pub const FAILURE: i32 = 1;

    /// Resource not found (list file, key file).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Decryption failed (wrong key or tampered file).
    pub const AUTH_FAILED: i32 = 5;

    /// Malformed key file or list payload.
    pub const FORMAT_ERROR: i32 = 6;

    /// Access to the key file was refused.
    pub const PERMISSION_DENIED: i32 = 7;

    /// The user cancelled a prompt or picker.
    pub const CANCELLED: i32 = 8;
}

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "IDEAVAULT_CONFIG";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "IDEAVAULT_LOG";

/// Application directory name under the XDG base directories.
pub const APP_DIR: &str = "ideavault";
