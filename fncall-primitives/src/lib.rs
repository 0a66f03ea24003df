//! Core shared types for fncall function repositories.

#![warn(missing_docs, clippy::pedantic)]

mod declaration;
mod document;
mod error;
mod language;
mod manifest;

/// Function declarations and their typed parameters.
pub use declaration::{Declaration, ParamKind, ParameterSpec};
/// Ordered collection of declarations persisted as `functions.json`.
pub use document::SchemaDocument;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Script languages a tool or agent may be written in.
pub use language::Language;
/// Agent metadata read from `index.yaml`.
pub use manifest::{AgentManifest, AgentVariable};
