//! Configuration loader: defaults, then `fncall.toml`, then environment.

use std::path::PathBuf;

use fncall_primitives::Language;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::FunctionsConfig;

/// Configuration file looked up at the repository root.
pub const CONFIG_FILE: &str = "fncall.toml";

const ENV_CACHE_DIR: &str = "FNCALL_CACHE_DIR";

fn runtime_env(language: Language) -> &'static str {
    match language {
        Language::Shell => "FNCALL_SHELL",
        Language::JavaScript => "FNCALL_NODE",
        Language::Python => "FNCALL_PYTHON",
    }
}

/// Loads configuration for `root` using the process environment.
///
/// # Errors
///
/// See [`load_with_env`].
pub fn load(root: impl Into<PathBuf>) -> ConfigResult<FunctionsConfig> {
    load_with_env(root, |key| std::env::var(key).ok())
}

/// Loads configuration for `root`, reading overrides through `env`.
///
/// A missing `fncall.toml` is not an error. Empty override values are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file exists but cannot be read,
/// [`ConfigError::Parse`] when it is not valid, and
/// [`ConfigError::InvalidValue`] when the merged result is unusable.
pub fn load_with_env<F>(root: impl Into<PathBuf>, env: F) -> ConfigResult<FunctionsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let root = root.into();
    let path = root.join(CONFIG_FILE);

    let mut config = match std::fs::read_to_string(&path) {
        Ok(content) => {
            debug!(path = %path.display(), "loading configuration file");
            FunctionsConfig::from_toml_str(&content)
                .map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
                .with_root(root)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => FunctionsConfig::new(root),
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    for language in Language::ALL {
        if let Some(program) = lookup(runtime_env(language)) {
            debug!(%language, %program, "runtime overridden from environment");
            config = config.with_runtime(language, program);
        }
    }
    if let Some(cache_dir) = lookup(ENV_CACHE_DIR) {
        config = config.with_cache_dir(cache_dir);
    }

    config.validate()?;
    Ok(config)
}
