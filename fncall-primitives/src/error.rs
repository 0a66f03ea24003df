//! Shared error definitions for fncall primitives.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or decoding primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Declaration failed validation.
    #[error("invalid declaration `{name}`: {reason}")]
    InvalidDeclaration {
        /// Name of the offending declaration.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Parameter failed validation.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Parameter name collided with an existing parameter of the declaration.
    #[error("declaration `{declaration}` already has a parameter named `{parameter}`")]
    DuplicateParameter {
        /// Declaration receiving the parameter.
        declaration: String,
        /// Name of the duplicated parameter.
        parameter: String,
    },

    /// Declaration name collided with an existing entry of the document.
    #[error("schema document already contains `{name}`")]
    DuplicateDeclaration {
        /// Name of the duplicated declaration.
        name: String,
    },

    /// Persisted schema document did not have the expected shape.
    #[error("invalid schema document: {reason}")]
    InvalidDocument {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Agent manifest failed validation.
    #[error("invalid agent manifest: {reason}")]
    InvalidManifest {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {source}")]
    Json {
        /// Source error from `serde_json`.
        #[from]
        source: serde_json::Error,
    },

    /// YAML decoding failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Source error from `serde_yaml`.
        #[from]
        source: serde_yaml::Error,
    },
}

impl Error {
    pub(crate) fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }
}
