//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `stackgen` engine. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Failure model
//!
//! Only genuinely fatal conditions become `Error` values:
//!
//! - Invalid run configuration (rejected before any disk mutation).
//! - Filesystem write/copy failures during composition.
//! - An unreadable or malformed project manifest encountered mid-merge.
//! - A rendering failure reported by the external rendering capability.
//! - An operation attempted on a transaction that already reached a
//!   terminal state.
//!
//! Absent layer directories and absent option subtrees are *not* errors:
//! the orchestrator skips them silently. Individual rollback item failures
//! are logged and counted, never escalated.

use thiserror::Error;

/// Main error type for stackgen operations
#[derive(Error, Debug)]
pub enum Error {
    /// The run configuration cannot be materialized.
    ///
    /// Raised before any filesystem mutation, e.g. for an empty project
    /// name or a name containing path separators.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A filesystem write, copy, or directory creation failed.
    ///
    /// Fatal: aborts the whole composition run and triggers rollback.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An existing project manifest could not be read or parsed during a
    /// merge.
    #[error("Manifest parse error for {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// The external rendering capability failed for a template file.
    #[error("Template rendering error: {message}{}", file.as_ref().map(|f| format!(" (file: {})", f)).unwrap_or_default())]
    Render {
        message: String,
        /// The template file being rendered, if known
        file: Option<String>,
    },

    /// An operation was attempted on a transaction that has already been
    /// committed or rolled back.
    #[error("Transaction is {state}; no further operations are permitted")]
    TransactionClosed { state: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
