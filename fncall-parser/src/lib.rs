//! Comment-tag extraction for tool and agent sources.
//!
//! Each supported language contributes one [`CommentDialect`] that turns
//! source text into [`RawTag`] records written in a single canonical grammar:
//!
//! ```text
//! # @describe Get the current weather
//! # @option --location! <STRING> City name
//! # @option --unit[c|f] Temperature unit
//! # @flag --verbose Print details
//! ```
//!
//! JavaScript JSDoc blocks and Python signatures/docstrings are rewritten into
//! the same records, so downstream consumers never see language differences.

#![warn(missing_docs, clippy::pedantic)]

mod dialect;
mod error;
mod javascript;
mod python;
mod shell;
mod tag;

pub use dialect::{CommentDialect, ExtractMode, SourceTags, TagBlock, dialect_for, extract_tags};
pub use error::{ParseError, ParseResult};
pub use javascript::JavaScriptDialect;
pub use python::PythonDialect;
pub use shell::ShellDialect;
pub use tag::{EnvTag, FlagTag, MetaTag, OptionTag, ParsedTag, RawTag, Suffix, TagKind};
