//! Error handling for selfup
//!
//! This module provides the error taxonomy of the self-update pipeline and
//! user-friendly error reporting for the CLI. The error system follows the
//! same two principles everywhere:
//! 1. **Strongly-typed errors** returned explicitly from every update stage
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated failure cases of the update pipeline
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Failure Classes
//!
//! - **Precondition**: [`UpdateError::UnsupportedInstallation`] fails fast before anything runs
//! - **Fetch** (no mutation yet): [`UpdateError::Transport`], [`UpdateError::ChecksumMissing`],
//!   [`UpdateError::ArchiveMissing`], [`UpdateError::Integrity`], [`UpdateError::ArchiveCorrupt`]
//! - **Swap** (mutation in progress): [`UpdateError::Swap`] after the previous tree was
//!   restored, [`UpdateError::RestoreFailed`] when restoration itself failed
//! - **Post-install**: [`UpdateError::Launcher`]
//!
//! "No matching release" is not an error; it is a normal update outcome.
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfup_cli::core::{UpdateError, user_friendly_error};
//!
//! let error = UpdateError::ChecksumMissing {
//!     file: "poetry-1.2.0-linux.sha256sum".to_string(),
//!     url: "https://example.com/1.2.0/poetry-1.2.0-linux.sha256sum".to_string(),
//! };
//! user_friendly_error(anyhow::Error::from(error)).display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for every stage of a self-update.
///
/// Variants upstream of the installation swap guarantee that the live
/// installation was not touched. [`Swap`](Self::Swap) guarantees the previous
/// tree is live again; only [`RestoreFailed`](Self::RestoreFailed) leaves the
/// installation in need of manual repair.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The running executable does not live under the installation home.
    ///
    /// Installations made by other means (package managers, pip, manual
    /// copies) cannot be replaced safely, so the update refuses to start.
    #[error(
        "{tool} was not installed with the recommended installer, so it cannot be updated automatically"
    )]
    UnsupportedInstallation {
        /// Name of the managed tool
        tool: String,
        /// Path of the running executable
        executable: PathBuf,
        /// Installation home the executable was expected under
        home: PathBuf,
    },

    /// The version argument could not be parsed as a constraint
    #[error("Invalid version constraint: {constraint}")]
    InvalidVersionConstraint {
        /// The constraint string as given
        constraint: String,
        /// Parser message
        reason: String,
    },

    /// The release catalog could not be queried or returned garbage
    #[error("Failed to query release catalog at {url}: {reason}")]
    Catalog {
        /// Catalog URL that was queried
        url: String,
        /// Reason for the failure
        reason: String,
    },

    /// The checksum file of the selected release does not exist (HTTP 404)
    #[error("Could not find {file} file")]
    ChecksumMissing {
        /// Checksum file name
        file: String,
        /// URL that returned 404
        url: String,
    },

    /// The archive of the selected release does not exist (HTTP 404)
    #[error("Could not find {file} file")]
    ArchiveMissing {
        /// Archive file name
        file: String,
        /// URL that returned 404
        url: String,
    },

    /// Any other network failure: connection, timeout, unexpected status
    #[error("Network error while fetching {url}: {reason}")]
    Transport {
        /// URL of the failed request
        url: String,
        /// Reason reported by the HTTP client or the server status
        reason: String,
    },

    /// The streamed archive digest does not match the published checksum
    #[error("Hashes for {archive} do not match: {expected} != {actual}")]
    Integrity {
        /// Archive file name
        archive: String,
        /// Published checksum
        expected: String,
        /// Digest computed over the downloaded bytes
        actual: String,
    },

    /// The verified archive could not be decompressed or unpacked
    #[error("Archive {archive} could not be extracted: {reason}")]
    ArchiveCorrupt {
        /// Archive file name
        archive: String,
        /// Reason for the extraction failure
        reason: String,
    },

    /// The swap failed; the previous installation is live again
    #[error("Failed to {operation}: {reason}")]
    Swap {
        /// Swap step that failed (e.g. "install new library tree")
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// The swap failed and the previous installation could not be restored
    #[error("Failed to restore the previous installation from {}: {reason}", backup.display())]
    RestoreFailed {
        /// Backup directory still holding the previous tree
        backup: PathBuf,
        /// Why restoration failed
        reason: String,
        /// The swap failure that triggered restoration
        cause: String,
    },

    /// The launcher script could not be written
    #[error("Failed to write launcher {}: {reason}", path.display())]
    Launcher {
        /// Launcher path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The update lock for the installation could not be acquired
    #[error("Failed to lock installation at {}: {reason}", path.display())]
    Lock {
        /// Lock file path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Local I/O failure outside of the swap
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// Operation that failed
        operation: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    /// Wrap an I/O error with the operation it interrupted.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Map an HTTP client failure to a transport error for `url`.
    pub fn transport(url: &str, error: &reqwest::Error) -> Self {
        let reason = if error.is_timeout() {
            "request timed out".to_string()
        } else {
            error.to_string()
        };
        Self::Transport {
            url: url.to_string(),
            reason,
        }
    }

    /// Whether the live installation may have been left without a usable tree.
    #[must_use]
    pub const fn is_data_loss_risk(&self) -> bool {
        matches!(self, Self::RestoreFailed { .. })
    }
}

/// Error context wrapper that provides user-friendly error display.
///
/// Holds the rendered error message plus optional details (displayed in
/// yellow) and a suggestion (displayed in green).
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::core::ErrorContext;
///
/// ErrorContext::new("Could not find poetry-1.2.0-linux.sha256sum file")
///     .with_suggestion("Check that the release was published for this platform")
///     .display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The rendered error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Errors carrying an [`UpdateError`] anywhere in their chain get a
/// variant-specific suggestion; anything else is displayed with its full
/// cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.chain().find_map(|e| e.downcast_ref::<UpdateError>()) {
        return create_error_context(update_error);
    }

    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        message.push_str(&format!("\n  caused by: {cause}"));
    }
    ErrorContext::new(message)
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let context = ErrorContext::new(error.to_string());
    match error {
        UpdateError::UnsupportedInstallation {
            executable,
            home,
            ..
        } => context
            .with_details(format!(
                "{} is not inside the installation home {}",
                executable.display(),
                home.display()
            ))
            .with_suggestion(
                "Update with the tool you installed it with, or reinstall using the recommended installer",
            ),
        UpdateError::InvalidVersionConstraint {
            reason,
            ..
        } => context
            .with_details(reason.clone())
            .with_suggestion("Use an exact version like 1.2.0 or a range like '>=1.2.0'"),
        UpdateError::Catalog {
            ..
        }
        | UpdateError::Transport {
            ..
        } => context.with_suggestion(
            "Check your network connection and retry; nothing was changed on disk",
        ),
        UpdateError::ChecksumMissing {
            url,
            ..
        }
        | UpdateError::ArchiveMissing {
            url,
            ..
        } => context
            .with_details(format!("{url} returned 404"))
            .with_suggestion("The release may not be published for this platform yet"),
        UpdateError::Integrity {
            ..
        } => context
            .with_details("The download was discarded before anything was installed")
            .with_suggestion("Retry the update; if it keeps failing, report the release"),
        UpdateError::ArchiveCorrupt {
            ..
        } => context.with_details("The archive passed its checksum but could not be unpacked"),
        UpdateError::Swap {
            ..
        } => context.with_details("The previous installation was restored and is still usable"),
        UpdateError::RestoreFailed {
            backup,
            cause,
            ..
        } => context
            .with_details(format!(
                "DATA LOSS RISK: the update failed ({cause}) and the previous installation could not be put back"
            ))
            .with_suggestion(format!(
                "Copy {} back to the lib directory manually, or reinstall",
                backup.display()
            )),
        UpdateError::Launcher {
            ..
        } => context.with_details("The new library tree is installed; only the launcher is stale")
            .with_suggestion("Re-run the update to regenerate the launcher"),
        UpdateError::Lock {
            ..
        } => context.with_suggestion("Wait for the other update to finish and retry"),
        UpdateError::Io {
            source,
            ..
        } if source.kind() == std::io::ErrorKind::PermissionDenied => {
            context.with_suggestion("Check ownership and permissions of the installation home")
        }
        UpdateError::Io {
            ..
        } => context,
    }
}
