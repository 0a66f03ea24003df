//! Configuration management for function repositories.
//!
//! [`FunctionsConfig`] is assembled from built-in defaults, an optional
//! `fncall.toml` at the repository root and `FNCALL_*` environment overrides.
//! [`Layout`] turns the result into the concrete paths every other crate uses.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod layout;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use layout::Layout;
pub use loader::{CONFIG_FILE, load, load_with_env};
pub use schema::{FunctionsConfig, Runtimes};
