use std::path::{Path, PathBuf};

use fncall_parser::ParseError;
use thiserror::Error;

/// Result alias for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while folding tags into one declaration.
#[derive(Debug, Error)]
pub enum DeclarationError {
    /// A tag's arguments could not be split or converted.
    #[error(transparent)]
    MalformedTag(#[from] ParseError),

    /// The block has no `@describe` tag.
    #[error("`{name}` has no `@describe` tag")]
    MissingDescription {
        /// Tool or action name.
        name: String,
    },

    /// The block has more than one `@describe` tag.
    #[error("`{name}` has a second `@describe` tag on line {line}")]
    DuplicateDescription {
        /// Tool or action name.
        name: String,
        /// Line of the second `@describe`.
        line: usize,
    },

    /// Two `@option`/`@flag` tags map to the same schema name.
    #[error("`{name}` declares parameter `{parameter}` twice (line {line})")]
    DuplicateParameter {
        /// Tool or action name.
        name: String,
        /// Schema name of the repeated parameter.
        parameter: String,
        /// Line of the repeated tag.
        line: usize,
    },

    /// The assembled declaration was rejected by the data model.
    #[error(transparent)]
    Invalid(#[from] fncall_primitives::Error),
}

/// Errors attributed to one build artifact (a tool or an agent).
#[derive(Debug, Error)]
pub enum BuildError {
    /// A source file produced an invalid declaration.
    #[error("`{artifact}` ({}): {source}", .path.display())]
    Declaration {
        /// Artifact name.
        artifact: String,
        /// Source file that was parsed.
        path: PathBuf,
        /// Underlying declaration error.
        #[source]
        source: DeclarationError,
    },

    /// A listing, source or document could not be read or written.
    #[error("`{artifact}`: failed to access `{}`: {source}", .path.display())]
    Io {
        /// Artifact name.
        artifact: String,
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The agent manifest is missing required fields or is not valid YAML.
    #[error("`{artifact}` ({}): {source}", .path.display())]
    Manifest {
        /// Agent name.
        artifact: String,
        /// Manifest path.
        path: PathBuf,
        /// Underlying manifest error.
        #[source]
        source: fncall_primitives::Error,
    },

    /// A declaration name is already taken within the same document.
    #[error("`{artifact}` ({}): `{name}` is already declared in this document", .path.display())]
    DuplicateDeclaration {
        /// Artifact name.
        artifact: String,
        /// Source file of the later declaration.
        path: PathBuf,
        /// Repeated declaration name.
        name: String,
    },

    /// A listing entry names a file with an unknown extension.
    #[error("`{artifact}` ({}): unsupported source language", .path.display())]
    UnsupportedLanguage {
        /// Artifact name.
        artifact: String,
        /// Offending path.
        path: PathBuf,
    },

    /// No source file exists for a listing entry.
    #[error("`{artifact}`: no source file found at `{}`", .path.display())]
    MissingSource {
        /// Artifact name.
        artifact: String,
        /// First path probed.
        path: PathBuf,
    },

    /// The schema document could not be encoded.
    #[error("`{artifact}`: failed to encode `{}`: {source}", .path.display())]
    Document {
        /// Artifact name.
        artifact: String,
        /// Document path.
        path: PathBuf,
        /// Underlying encoding error.
        #[source]
        source: fncall_primitives::Error,
    },
}

impl BuildError {
    pub(crate) fn io(artifact: &str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            artifact: artifact.to_owned(),
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn declaration(artifact: &str, path: &Path, source: DeclarationError) -> Self {
        Self::Declaration {
            artifact: artifact.to_owned(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the artifact the error is attributed to.
    #[must_use]
    pub fn artifact(&self) -> &str {
        match self {
            Self::Declaration { artifact, .. }
            | Self::Io { artifact, .. }
            | Self::Manifest { artifact, .. }
            | Self::DuplicateDeclaration { artifact, .. }
            | Self::UnsupportedLanguage { artifact, .. }
            | Self::MissingSource { artifact, .. }
            | Self::Document { artifact, .. } => artifact,
        }
    }

    /// Returns the file the error originated from.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Declaration { path, .. }
            | Self::Io { path, .. }
            | Self::Manifest { path, .. }
            | Self::DuplicateDeclaration { path, .. }
            | Self::UnsupportedLanguage { path, .. }
            | Self::MissingSource { path, .. }
            | Self::Document { path, .. } => path,
        }
    }
}
