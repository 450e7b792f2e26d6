//! CLI error types for structured error handling.
//!
//! This module provides typed errors that map to specific exit codes,
//! enabling consistent error handling across the CLI.

use std::fmt;

use ideavault_core::VaultError;

use crate::constants::exit_codes;
use crate::ui::{print_error, UiContext};

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (list file, key file)
    NotFound { message: String, hint: String },

    /// Invalid user input
    InvalidInput {
        message: String,
        hint: Option<String>,
    },

    /// Decryption failed (wrong key or tampered file)
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Malformed key file or list payload
    Format(String),

    /// Access to the key file was refused
    PermissionDenied { message: String, hint: String },

    /// A prompt or picker was dismissed
    Cancelled { message: String, hint: String },

    /// Anything else
    Failure(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Create a NotFound error with message and hint.
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput {
            message: message.into(),
            hint: None,
        }
    }

    /// Create an InvalidInput error with a hint.
    pub fn invalid_input_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::InvalidInput {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Map a core error to what users see, keeping `message` as the text.
    pub fn from_vault(err: &VaultError, message: String) -> Self {
        match err {
            VaultError::NotFound(_) => CliError::NotFound {
                message,
                hint: "Create it with `ideavault list new <NAME>`.".to_string(),
            },
            VaultError::Authentication => CliError::AuthFailed {
                message,
                hint: Some(
                    "Check that the active key is the one this list was written with."
                        .to_string(),
                ),
            },
            VaultError::Format(_) => CliError::Format(message),
            VaultError::PermissionDenied(_) => CliError::PermissionDenied {
                message,
                hint: "Re-run interactively to confirm the key file, or pass --key-file. \
                       If the file was moved or deleted, run `ideavault key forget` first."
                    .to_string(),
            },
            VaultError::UserCancelled => CliError::Cancelled {
                message: "No key file selected".to_string(),
                hint: "Run `ideavault key new`, or pass --key-file <PATH>.".to_string(),
            },
            _ => CliError::Failure(message),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CliError::NotFound { message, .. }
            | CliError::InvalidInput { message, .. }
            | CliError::AuthFailed { message, .. }
            | CliError::PermissionDenied { message, .. }
            | CliError::Cancelled { message, .. } => message,
            CliError::Format(message) | CliError::Failure(message) => message,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            CliError::NotFound { hint, .. }
            | CliError::PermissionDenied { hint, .. }
            | CliError::Cancelled { hint, .. } => Some(hint),
            CliError::InvalidInput { hint, .. } | CliError::AuthFailed { hint, .. } => {
                hint.as_deref()
            }
            CliError::Format(_) | CliError::Failure(_) => None,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput { .. } => exit_codes::INVALID_INPUT,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::Format(_) => exit_codes::FORMAT_ERROR,
            CliError::PermissionDenied { .. } => exit_codes::PERMISSION_DENIED,
            CliError::Cancelled { .. } => exit_codes::CANCELLED,
            CliError::Failure(_) => exit_codes::FAILURE,
        }
    }

    /// Print error message to stderr and exit with appropriate code.
    pub fn exit(&self) -> ! {
        let ctx = UiContext::from_env(false, false);
        print_error(&ctx, self.message(), self.hint());
        std::process::exit(self.exit_code())
    }
}

/// Turn any command failure into the CLI error to report.
///
/// Looks through `anyhow` context for a `CliError` or `VaultError`; the
/// outermost message is kept so context like the list name survives.
pub fn classify(err: &anyhow::Error) -> CliError {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return clone_error(cli_err);
    }
    if let Some(vault_err) = err.downcast_ref::<VaultError>() {
        let outer = err.to_string();
        let inner = vault_err.to_string();
        let message = if outer == inner {
            inner
        } else {
            format!("{}: {}", outer, inner)
        };
        return CliError::from_vault(vault_err, message);
    }
    CliError::Failure(format!("{:#}", err))
}

fn clone_error(err: &CliError) -> CliError {
    match err {
        CliError::NotFound { message, hint } => CliError::not_found(message.clone(), hint.clone()),
        CliError::InvalidInput { message, hint } => CliError::InvalidInput {
            message: message.clone(),
            hint: hint.clone(),
        },
        CliError::AuthFailed { message, hint } => CliError::AuthFailed {
            message: message.clone(),
            hint: hint.clone(),
        },
        CliError::Format(message) => CliError::Format(message.clone()),
        CliError::PermissionDenied { message, hint } => CliError::PermissionDenied {
            message: message.clone(),
            hint: hint.clone(),
        },
        CliError::Cancelled { message, hint } => CliError::Cancelled {
            message: message.clone(),
            hint: hint.clone(),
        },
        CliError::Failure(message) => CliError::Failure(message.clone()),
    }
}
