//! Schema builder: turns tool and agent sources into `functions.json`.
//!
//! [`build_declaration`] is the pure core: it folds one block of raw tags into
//! a validated [`fncall_primitives::Declaration`]. [`Builder`] drives it over
//! the `tools.txt` and `agents.txt` listings, isolating failures per artifact
//! and collecting the outcome in a [`BuildReport`].

#![warn(missing_docs, clippy::pedantic)]

mod declaration;
mod error;
pub mod listing;
mod pipeline;
mod report;

pub use declaration::{build_declaration, declarations_from_source};
pub use error::{BuildError, BuildResult, DeclarationError};
pub use listing::{
    ToolSource, entry_name, parse_listing, read_listing, resolve_agent_source, resolve_listed_tool,
    resolve_tool,
};
pub use pipeline::{Builder, write_document};
pub use report::{ArtifactKind, BuildReport, BuiltArtifact, FailedArtifact};
