//! Per-language comment dialects.

use fncall_primitives::Language;

use crate::error::ParseResult;
use crate::javascript::JavaScriptDialect;
use crate::python::PythonDialect;
use crate::shell::ShellDialect;
use crate::tag::RawTag;

/// Which entry points a dialect should extract.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtractMode {
    /// A tool file: one block for the language's entry function.
    Tool,
    /// An agent action file: one block per exported function.
    Agent,
}

/// Tags attached to one entry point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagBlock {
    function: String,
    line: usize,
    tags: Vec<RawTag>,
}

impl TagBlock {
    /// Creates a block for the named function.
    #[must_use]
    pub fn new(function: impl Into<String>, line: usize, tags: Vec<RawTag>) -> Self {
        Self {
            function: function.into(),
            line,
            tags,
        }
    }

    /// Returns the function the block documents.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Returns the 1-based line where the block starts.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns the tags in source order.
    #[must_use]
    pub fn tags(&self) -> &[RawTag] {
        &self.tags
    }
}

/// Result of extracting one source file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceTags {
    file_tags: Vec<RawTag>,
    blocks: Vec<TagBlock>,
}

impl SourceTags {
    /// Creates the extraction result.
    #[must_use]
    pub fn new(file_tags: Vec<RawTag>, blocks: Vec<TagBlock>) -> Self {
        Self { file_tags, blocks }
    }

    /// Tags that belong to the file rather than to an entry point.
    #[must_use]
    pub fn file_tags(&self) -> &[RawTag] {
        &self.file_tags
    }

    /// Entry-point blocks in source order.
    #[must_use]
    pub fn blocks(&self) -> &[TagBlock] {
        &self.blocks
    }

    /// Consumes the result, returning the blocks.
    #[must_use]
    pub fn into_blocks(self) -> Vec<TagBlock> {
        self.blocks
    }

    /// Iterates over every tag of the file, file-level tags first.
    pub fn all_tags(&self) -> impl Iterator<Item = &RawTag> {
        self.file_tags
            .iter()
            .chain(self.blocks.iter().flat_map(|block| block.tags.iter()))
    }
}

/// Capability implemented once per source language.
pub trait CommentDialect: Send + Sync {
    /// Language handled by this dialect.
    fn language(&self) -> Language;

    /// Extracts tag records from source text. Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ParseError::MalformedTag`] when a recognized tag or
    /// docstring entry cannot be split into its parts.
    fn extract(&self, source: &str, mode: ExtractMode) -> ParseResult<SourceTags>;
}

static SHELL: ShellDialect = ShellDialect;
static JAVASCRIPT: JavaScriptDialect = JavaScriptDialect;
static PYTHON: PythonDialect = PythonDialect;

/// Returns the dialect for a language.
#[must_use]
pub fn dialect_for(language: Language) -> &'static dyn CommentDialect {
    match language {
        Language::Shell => &SHELL,
        Language::JavaScript => &JAVASCRIPT,
        Language::Python => &PYTHON,
    }
}

/// Extracts tags with the dialect matching `language`.
///
/// # Errors
///
/// Propagates [`crate::ParseError`] from the dialect.
pub fn extract_tags(
    language: Language,
    source: &str,
    mode: ExtractMode,
) -> ParseResult<SourceTags> {
    dialect_for(language).extract(source, mode)
}
