//! Strongly typed configuration schema.

use std::path::{Path, PathBuf};

use fncall_primitives::Language;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Program names used to launch each language runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Runtimes {
    /// Shell interpreter, `bash` by default.
    pub shell: String,
    /// JavaScript runtime, `node` by default.
    pub node: String,
    /// Python interpreter, `python3` by default.
    pub python: String,
}

impl Default for Runtimes {
    fn default() -> Self {
        Self {
            shell: "bash".to_owned(),
            node: "node".to_owned(),
            python: "python3".to_owned(),
        }
    }
}

impl Runtimes {
    /// Returns the program that runs sources of `language`.
    #[must_use]
    pub fn program(&self, language: Language) -> &str {
        match language {
            Language::Shell => &self.shell,
            Language::JavaScript => &self.node,
            Language::Python => &self.python,
        }
    }
}

/// Settings for one function repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionsConfig {
    #[serde(skip)]
    root: PathBuf,
    cache_dir: PathBuf,
    runtimes: Runtimes,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cache_dir: PathBuf::from("cache"),
            runtimes: Runtimes::default(),
        }
    }
}

impl FunctionsConfig {
    /// Creates a default configuration rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parses `fncall.toml` content. The root is left at `.`.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for unknown keys or mistyped values.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache root as configured; relative paths are resolved against the root.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            self.root.join(&self.cache_dir)
        }
    }

    /// Runtime program names.
    #[must_use]
    pub fn runtimes(&self) -> &Runtimes {
        &self.runtimes
    }

    /// Replaces the repository root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Replaces the cache root.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Replaces the runtime program for `language`.
    #[must_use]
    pub fn with_runtime(mut self, language: Language, program: impl Into<String>) -> Self {
        let program = program.into();
        match language {
            Language::Shell => self.runtimes.shell = program,
            Language::JavaScript => self.runtimes.node = program,
            Language::Python => self.runtimes.python = program,
        }
        self
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for blank runtime programs or an
    /// empty cache directory.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("cache_dir", "must not be empty"));
        }
        for language in Language::ALL {
            if self.runtimes.program(language).trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("runtimes.{}", runtime_key(language)),
                    "program name must not be blank",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) const fn runtime_key(language: Language) -> &'static str {
    match language {
        Language::Shell => "shell",
        Language::JavaScript => "node",
        Language::Python => "python",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conventional_programs() {
        let config = FunctionsConfig::new("/srv/functions");
        assert_eq!(config.runtimes().program(Language::Shell), "bash");
        assert_eq!(config.runtimes().program(Language::JavaScript), "node");
        assert_eq!(config.runtimes().program(Language::Python), "python3");
        assert_eq!(config.cache_dir(), PathBuf::from("/srv/functions/cache"));
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml() {
        let config = FunctionsConfig::from_toml_str(
            r#"
cache_dir = "/tmp/fncall-cache"

[runtimes]
python = "python3.12"
"#,
        )
        .unwrap();
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/fncall-cache"));
        assert_eq!(config.runtimes().python, "python3.12");
        assert_eq!(config.runtimes().shell, "bash");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(FunctionsConfig::from_toml_str("cache = \"x\"").is_err());
        assert!(FunctionsConfig::from_toml_str("[runtimes]\nruby = \"ruby\"").is_err());
    }

    #[test]
    fn blank_runtime_is_invalid() {
        let err = FunctionsConfig::default()
            .with_runtime(Language::JavaScript, " ")
            .validate()
            .expect_err("blank");
        assert!(err.to_string().contains("runtimes.node"));
    }
}
