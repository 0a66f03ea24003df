//! Function-calling toolkit facade.
//!
//! Depend on this crate via `cargo add fncall`. It bundles the workspace crates
//! behind feature flags so embedders can pull in only the parser, only the
//! builder, or the full dispatch runtime.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use fncall_primitives as primitives;

/// Comment dialects and tag grammar (enabled by `parser` feature).
#[cfg(feature = "parser")]
pub use fncall_parser as parser;

/// Schema document generation (enabled by `builder` feature).
#[cfg(feature = "builder")]
pub use fncall_builder as builder;

/// Argument validation and dispatch (enabled by `runtime` feature).
#[cfg(feature = "runtime")]
pub use fncall_runtime as runtime;

/// Configuration management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use fncall_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use fncall_telemetry as telemetry;
