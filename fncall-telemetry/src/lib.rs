//! Observability utilities for fncall binaries.
//!
//! Tool results travel on stdout, so every log line goes to stderr.

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support {
    //! Structured tracing helpers.

    use thiserror::Error;
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    /// Environment variable holding an `EnvFilter` directive string.
    pub const LOG_ENV: &str = "FNCALL_LOG";

    /// Errors raised while installing the subscriber.
    #[derive(Debug, Error)]
    pub enum TelemetryError {
        /// `FNCALL_LOG` does not parse as a filter directive.
        #[error("invalid {LOG_ENV} directive: {0}")]
        Filter(#[from] tracing_subscriber::filter::ParseError),

        /// A global subscriber is already installed.
        #[error("tracing subscriber already installed: {0}")]
        Install(String),
    }

    /// Maps a `-v` count to the fallback level: warn, info, debug, trace.
    #[must_use]
    pub fn level_for(verbosity: u8) -> Level {
        match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Builds the filter: `directives` when given and non-empty, otherwise
    /// the level derived from `verbosity`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Filter`] for malformed directives.
    pub fn filter(directives: Option<&str>, verbosity: u8) -> Result<EnvFilter, TelemetryError> {
        match directives.map(str::trim).filter(|d| !d.is_empty()) {
            Some(directives) => Ok(EnvFilter::try_new(directives)?),
            None => Ok(EnvFilter::new(level_for(verbosity).as_str().to_ascii_lowercase())),
        }
    }

    /// Installs the global fmt subscriber writing to stderr.
    ///
    /// `FNCALL_LOG` takes precedence over `verbosity`.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError`] if the filter is malformed or a
    /// subscriber is already installed.
    pub fn init(verbosity: u8) -> Result<(), TelemetryError> {
        let directives = std::env::var(LOG_ENV).ok();
        let filter = filter(directives.as_deref(), verbosity)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|err| TelemetryError::Install(err.to_string()))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn verbosity_raises_level() {
            assert_eq!(level_for(0), Level::WARN);
            assert_eq!(level_for(1), Level::INFO);
            assert_eq!(level_for(2), Level::DEBUG);
            assert_eq!(level_for(9), Level::TRACE);
        }

        #[test]
        fn directives_override_verbosity() {
            let scoped = filter(Some("fncall_runtime=trace"), 0).unwrap();
            assert_eq!(scoped.to_string(), "fncall_runtime=trace");
            let blank = filter(Some("  "), 1).unwrap();
            assert_eq!(blank.to_string(), "info");
        }

        #[test]
        fn malformed_directives_are_rejected() {
            assert!(matches!(
                filter(Some("fncall=loudest"), 0),
                Err(TelemetryError::Filter(_))
            ));
        }
    }
}
