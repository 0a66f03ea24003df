//! `# @tag` comments in bash scripts.

use std::sync::LazyLock;

use fncall_primitives::Language;
use regex::Regex;

use crate::dialect::{CommentDialect, ExtractMode, SourceTags, TagBlock};
use crate::error::{ParseError, ParseResult};
use crate::tag::{RawTag, TagKind};

static TAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#+\s*@([A-Za-z][\w-]*)(.*)$").expect("valid tag regex")
});

static FUNCTION_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:function\s+([A-Za-z_][\w:.-]*)|([A-Za-z_][\w:.-]*)\s*\(\s*\))")
        .expect("valid function regex")
});

/// Dialect for `.sh` sources.
///
/// Tool files contribute every tag line to a single `main` block. Agent files
/// open a block at each `@cmd` and close it at the next function definition.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellDialect;

enum ShellTag {
    Known(TagKind),
    Cmd,
}

fn tag_line(line: &str) -> Option<(ShellTag, String)> {
    let captures = TAG_LINE.captures(line)?;
    let name = captures.get(1)?.as_str();
    let args = captures.get(2).map_or("", |m| m.as_str());
    // `@describe-foo` is not `@describe`; the tag name must end at whitespace.
    if !args.is_empty() && !args.starts_with(char::is_whitespace) {
        return None;
    }
    let tag = match name {
        "cmd" => ShellTag::Cmd,
        other => ShellTag::Known(TagKind::from_name(other)?),
    };
    Some((tag, args.trim().to_owned()))
}

fn function_name(line: &str) -> Option<String> {
    let captures = FUNCTION_DEF.captures(line)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_owned())
}

impl ShellDialect {
    fn extract_tool(source: &str) -> SourceTags {
        let tags = source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| match tag_line(line)? {
                (ShellTag::Known(kind), args) => Some(RawTag::new(kind, args, index + 1)),
                (ShellTag::Cmd, _) => None,
            })
            .collect();
        let entry = Language::Shell.tool_entry_function();
        SourceTags::new(Vec::new(), vec![TagBlock::new(entry, 1, tags)])
    }

    fn extract_agent(source: &str) -> ParseResult<SourceTags> {
        let mut file_tags = Vec::new();
        let mut blocks = Vec::new();
        let mut open: Option<(usize, Vec<RawTag>)> = None;

        for (index, line) in source.lines().enumerate() {
            let number = index + 1;
            if let Some((tag, args)) = tag_line(line) {
                match tag {
                    ShellTag::Cmd => {
                        if let Some((start, _)) = open {
                            return Err(unattached_cmd(start));
                        }
                        open = Some((number, vec![RawTag::new(TagKind::Describe, args, number)]));
                    }
                    ShellTag::Known(kind) => match open.as_mut() {
                        Some((_, tags)) => tags.push(RawTag::new(kind, args, number)),
                        None => file_tags.push(RawTag::new(kind, args, number)),
                    },
                }
                continue;
            }

            if open.is_some() {
                if let Some(name) = function_name(line) {
                    if let Some((start, tags)) = open.take() {
                        blocks.push(TagBlock::new(name, start, tags));
                    }
                }
            }
        }

        if let Some((start, _)) = open {
            return Err(unattached_cmd(start));
        }

        Ok(SourceTags::new(file_tags, blocks))
    }
}

fn unattached_cmd(line: usize) -> ParseError {
    ParseError::malformed(line, "cmd", "not followed by a function definition")
}

impl CommentDialect for ShellDialect {
    fn language(&self) -> Language {
        Language::Shell
    }

    fn extract(&self, source: &str, mode: ExtractMode) -> ParseResult<SourceTags> {
        match mode {
            ExtractMode::Tool => Ok(Self::extract_tool(source)),
            ExtractMode::Agent => Self::extract_agent(source),
        }
    }
}
