use std::path::PathBuf;

use thiserror::Error;

/// Result alias for invocation operations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Exit status for failures detected before a child is spawned.
pub const EXIT_USAGE: i32 = 64;
/// Exit status for configuration, I/O and other internal failures.
pub const EXIT_SOFTWARE: i32 = 70;

/// Argument payload rejected against a declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload is not a JSON object.
    #[error("arguments must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was supplied.
        found: &'static str,
    },

    /// Required parameters are absent, `null`, or empty arrays.
    #[error("missing required {}", parameter_list(.names))]
    MissingRequiredParameter {
        /// Parameter names in declaration order.
        names: Vec<String>,
    },

    /// An array element does not match the declared element kind.
    #[error("parameter `{parameter}` expects {expected} values, found {found}")]
    TypeMismatch {
        /// Parameter name.
        parameter: String,
        /// Declared element kind.
        expected: &'static str,
        /// JSON type that was supplied.
        found: &'static str,
    },
}

/// Errors that terminate one invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The schema document for the target has not been built.
    #[error("schema document `{}` is unavailable; run `fncall build` first", .path.display())]
    SchemaUnavailable {
        /// Expected document path.
        path: PathBuf,
    },

    /// The schema document exists but cannot be decoded.
    #[error("schema document `{}` is invalid: {source}", .path.display())]
    Document {
        /// Document path.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: fncall_primitives::Error,
    },

    /// The named tool, agent, action or source file does not exist.
    #[error("{what} `{name}` not found")]
    NotFound {
        /// What was looked up (`tool`, `action`, `tool source`, ...).
        what: &'static str,
        /// Name that was looked up.
        name: String,
    },

    /// An agent call did not name an action.
    #[error("agent `{agent}` requires an action name")]
    MissingAction {
        /// Agent name.
        agent: String,
    },

    /// The arguments were rejected.
    #[error("invalid arguments for `{name}`: {source}")]
    Validation {
        /// Fully-qualified target name.
        name: String,
        /// Validation failure.
        #[source]
        source: ValidationError,
    },

    /// An agent variable has no caller value, environment value or default.
    #[error(
        "agent `{agent}` variable `{variable}` is not set \
         (pass --var {variable}=VALUE or set {env})"
    )]
    MissingAgentVariable {
        /// Agent name.
        agent: String,
        /// Variable name from the manifest.
        variable: String,
        /// Environment variable consulted.
        env: String,
    },

    /// The agent manifest could not be loaded.
    #[error("agent manifest `{}` is invalid: {source}", .path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: fncall_primitives::Error,
    },

    /// The child exited with a non-zero status.
    #[error("`{name}` exited with status {exit_code}{}", stderr_suffix(.stderr))]
    Execution {
        /// Fully-qualified target name.
        name: String,
        /// Child exit status (1 when terminated by a signal).
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The runtime program could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("failed to access `{}`: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn parameter_list(names: &[String]) -> String {
    let plural = if names.len() == 1 { "" } else { "s" };
    format!("parameter{plural}: {}", names.join(", "))
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

impl InvokeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    /// Maps the error to a process exit status.
    ///
    /// Child failures keep the child's status, failures detected before a
    /// child is spawned map to 64, everything else to 70.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution { exit_code, .. } => *exit_code,
            Self::SchemaUnavailable { .. }
            | Self::NotFound { .. }
            | Self::MissingAction { .. }
            | Self::Validation { .. }
            | Self::MissingAgentVariable { .. } => EXIT_USAGE,
            Self::Document { .. }
            | Self::Manifest { .. }
            | Self::Spawn { .. }
            | Self::Io { .. } => EXIT_SOFTWARE,
        }
    }
}
