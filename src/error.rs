//! Crate-level error types for mdref diagnostics.

use std::path::PathBuf;

/// Fatal errors only. Anything recoverable during a check cycle (an unreadable
/// document, a broken ignore file, a permission-denied subtree) becomes a
/// `Warning` on the report instead of one of these.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.mdref.toml` exists but cannot be read or holds bad values.
    #[error("invalid config: {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the offending config file.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A caller-supplied ignore pattern could not be compiled into a glob.
    #[error("invalid ignore pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern text as supplied.
        pattern: String,
        /// Why the glob compiler rejected it.
        reason: String,
    },

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A file could not be read or decoded.
    #[error("cannot read {path}: {reason}")]
    ReadFailed {
        /// Root-relative path of the file.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// The root path exists but is not a directory.
    #[error("not a directory: {}", path.display())]
    RootNotDirectory {
        /// The root path as given.
        path: PathBuf,
    },

    /// The root path does not exist.
    #[error("root not found: {}", path.display())]
    RootNotFound {
        /// The root path as given.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
