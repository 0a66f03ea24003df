//! Signatures and Google-style docstrings in Python sources.
//!
//! Parameters come from the type-annotated signature; descriptions come from
//! the docstring summary and its `Args:` section. Both are rewritten into the
//! canonical tag grammar.

use std::collections::HashMap;
use std::sync::LazyLock;

use fncall_primitives::Language;
use regex::Regex;

use crate::dialect::{CommentDialect, ExtractMode, SourceTags, TagBlock};
use crate::error::{ParseError, ParseResult};
use crate::tag::{FlagTag, OptionTag, RawTag, Suffix, TagKind, quote_text};

static TOP_LEVEL_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)[ \t]*\(").expect("valid def regex")
});

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(Args|Arguments|Parameters|Params|Returns|Return|Yields|Raises|",
        r"Examples?|Notes?|Attributes|Todo):\s*$"
    ))
    .expect("valid section regex")
});

static ARG_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*{0,2}([A-Za-z_]\w*)\s*(?:\([^)]*\))?\s*:\s*(.*)$").expect("valid arg regex")
});

static SPHINX_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:param\s+(?:[^:]*\s)?([A-Za-z_]\w*)\s*:\s*(.*)$").expect("valid param regex")
});

/// Dialect for `.py` sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonDialect;

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Finds the first `target` at bracket depth zero, skipping strings and comments.
fn find_top_level(text: &str, targets: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices();
    while let Some((index, c)) = chars.next() {
        if let Some(open) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                c if c == open => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '#' => {
                for (_, skipped) in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            c if depth == 0 && targets.contains(&c) => return Some(index),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Splits on `separator` at depth zero, returning each piece with its offset.
fn split_top_level(text: &str, separator: char) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(found) = find_top_level(&text[start..], &[separator]) {
        pieces.push((start, &text[start..start + found]));
        start += found + separator.len_utf8();
    }
    pieces.push((start, &text[start..]));
    pieces
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Base {
    Str,
    Int,
    Float,
    Bool,
}

#[derive(Debug, PartialEq, Eq)]
struct PyType {
    base: Base,
    array: bool,
    optional: bool,
    choices: Vec<String>,
}

impl PyType {
    const fn plain(base: Base) -> Self {
        Self {
            base,
            array: false,
            optional: false,
            choices: Vec::new(),
        }
    }
}

fn strip_typing_prefix(name: &str) -> &str {
    name.strip_prefix("typing.")
        .or_else(|| name.strip_prefix("t."))
        .unwrap_or(name)
}

fn union_of<'a>(parts: impl Iterator<Item = &'a str>) -> PyType {
    let parts: Vec<&str> = parts.map(str::trim).collect();
    let rest: Vec<&str> = parts.iter().copied().filter(|p| *p != "None").collect();
    let optional = rest.len() < parts.len();
    let mut ty = match rest.as_slice() {
        [single] => analyze(single),
        _ => PyType::plain(Base::Str),
    };
    ty.optional |= optional;
    ty
}

fn analyze(annotation: &str) -> PyType {
    let annotation = annotation.trim();
    let annotation = unquote_literal(annotation).unwrap_or(annotation);

    let unions = split_top_level(annotation, '|');
    if unions.len() > 1 {
        return union_of(unions.into_iter().map(|(_, part)| part));
    }

    if let Some(open) = annotation.find('[') {
        let head = strip_typing_prefix(annotation[..open].trim());
        let inner = annotation[open + 1..]
            .strip_suffix(']')
            .unwrap_or(&annotation[open + 1..]);
        let args: Vec<&str> = split_top_level(inner, ',')
            .into_iter()
            .map(|(_, part)| part.trim())
            .collect();
        return match head {
            "Optional" => {
                let mut ty = analyze(inner);
                ty.optional = true;
                ty
            }
            "Union" => union_of(args.into_iter()),
            "List" | "list" | "Sequence" | "Iterable" | "Set" | "set" | "Tuple" | "tuple" => {
                let mut ty = args.first().map_or(PyType::plain(Base::Str), |a| analyze(a));
                ty.array = true;
                ty.optional = false;
                ty
            }
            "Literal" => {
                let choices: Vec<String> = args
                    .iter()
                    .filter(|a| !a.is_empty())
                    .map(|&a| unquote_literal(a).unwrap_or(a).to_owned())
                    .collect();
                PyType {
                    choices,
                    ..PyType::plain(Base::Str)
                }
            }
            "Annotated" => args.first().map_or(PyType::plain(Base::Str), |a| analyze(a)),
            _ => PyType::plain(Base::Str),
        };
    }

    match strip_typing_prefix(annotation) {
        "int" => PyType::plain(Base::Int),
        "float" => PyType::plain(Base::Float),
        "bool" => PyType::plain(Base::Bool),
        "list" | "List" => PyType {
            array: true,
            ..PyType::plain(Base::Str)
        },
        _ => PyType::plain(Base::Str),
    }
}

fn unquote_literal(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if (first == '\'' || first == '"') && text.len() >= 2 && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Converts a default expression into the canonical default token.
fn default_literal(text: &str) -> Option<String> {
    let text = text.trim();
    match text {
        "None" => None,
        "True" => Some("true".to_owned()),
        "False" => Some("false".to_owned()),
        _ => unquote_literal(text)
            .map(str::to_owned)
            .or_else(|| text.parse::<f64>().ok().map(|_| text.to_owned())),
    }
}

struct Param<'a> {
    name: &'a str,
    annotation: Option<&'a str>,
    default: Option<&'a str>,
    offset: usize,
}

fn signature_params(params: &str) -> Vec<Param<'_>> {
    split_top_level(params, ',')
        .into_iter()
        .filter_map(|(offset, piece)| {
            let trimmed = piece.trim();
            if trimmed.is_empty() || trimmed == "/" || trimmed.starts_with('*') {
                return None;
            }
            let offset = offset + (piece.len() - piece.trim_start().len());
            let (head, default) = match find_top_level(trimmed, &['=']) {
                Some(eq) => (&trimmed[..eq], Some(trimmed[eq + 1..].trim())),
                None => (trimmed, None),
            };
            let (name, annotation) = match head.split_once(':') {
                Some((name, annotation)) => (name.trim(), Some(annotation.trim())),
                None => (head.trim(), None),
            };
            if name == "self" || name == "cls" {
                return None;
            }
            Some(Param {
                name,
                annotation,
                default,
                offset,
            })
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Docstring {
    summary: String,
    args: HashMap<String, String>,
}

fn dedent(text: &str) -> Vec<String> {
    let mut lines = text.lines();
    let first = lines.next().map(str::trim).unwrap_or_default().to_owned();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    std::iter::once(first)
        .chain(rest.iter().map(|line| {
            let cut = indentation(line).min(indent);
            line[cut..].trim_end().to_owned()
        }))
        .collect()
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn parse_docstring(text: &str) -> Docstring {
    let mut doc = Docstring::default();
    let mut summary: Vec<&str> = Vec::new();
    let mut section: Option<String> = None;
    let mut current: Option<(String, usize)> = None;

    let lines = dedent(text);
    for line in &lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indentation(line);

        if indent == 0 {
            if let Some(header) = SECTION_HEADER.captures(trimmed) {
                section = header.get(1).map(|m| m.as_str().to_owned());
                current = None;
                continue;
            }
            if let Some(param) = SPHINX_PARAM.captures(trimmed) {
                let name = param[1].to_owned();
                doc.args.insert(name.clone(), param[2].trim().to_owned());
                section = Some("Args".to_owned());
                current = Some((name, usize::MAX));
                continue;
            }
        }

        match section.as_deref() {
            None => summary.push(trimmed),
            Some("Args" | "Arguments" | "Parameters" | "Params") => {
                if let Some((name, entry_indent)) = &current {
                    if indent > *entry_indent {
                        if let Some(text) = doc.args.get_mut(name) {
                            if !text.is_empty() {
                                text.push(' ');
                            }
                            text.push_str(trimmed);
                        }
                        continue;
                    }
                }
                if let Some(entry) = ARG_ENTRY.captures(trimmed) {
                    let name = entry[1].to_owned();
                    doc.args.insert(name.clone(), entry[2].trim().to_owned());
                    current = Some((name, indent));
                }
            }
            Some(_) => {}
        }
    }

    doc.summary = summary.join(" ");
    doc
}

/// Locates the docstring literal at the start of a function body.
fn docstring_at(body: &str) -> Option<(usize, &str)> {
    let start = body.len() - body.trim_start().len();
    let rest = &body[start..];
    let prefixed = rest.trim_start_matches(['r', 'R', 'u', 'U']);
    let prefix = rest.len() - prefixed.len();
    for delimiter in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = prefixed.strip_prefix(delimiter) {
            let end = if delimiter.len() == 1 {
                inner.find(['\n', delimiter.chars().next()?])?
            } else {
                inner.find(delimiter)?
            };
            return Some((start + prefix + delimiter.len(), &inner[..end]));
        }
    }
    None
}

fn function_block(
    source: &str,
    name: &str,
    def_start: usize,
    paren: usize,
) -> ParseResult<TagBlock> {
    let def_line = line_of(source, def_start);
    let malformed =
        |reason: &str| ParseError::malformed(def_line, "def", format!("`{name}`: {reason}"));

    let after_paren = &source[paren + 1..];
    let close = find_top_level(after_paren, &[')'])
        .ok_or_else(|| malformed("unterminated signature"))?;
    let params = &after_paren[..close];
    let tail = &after_paren[close + 1..];
    let colon = find_top_level(tail, &[':'])
        .ok_or_else(|| malformed("missing `:` after signature"))?;
    let body = &tail[colon + 1..];
    let body_offset = source.len() - body.len();

    let mut tags = Vec::new();
    let doc = match docstring_at(body) {
        Some((offset, text)) => {
            let doc = parse_docstring(text);
            if !doc.summary.is_empty() {
                tags.push(RawTag::new(
                    TagKind::Describe,
                    quote_text(&doc.summary),
                    line_of(source, body_offset + offset),
                ));
            }
            doc
        }
        None => Docstring::default(),
    };

    let params_offset = paren + 1;
    for param in signature_params(params) {
        let line = line_of(source, params_offset + param.offset);
        let ty = param.annotation.map_or(PyType::plain(Base::Str), analyze);
        let description = doc.args.get(param.name).cloned().unwrap_or_default();
        let token = param.name.to_owned();

        let tag = if ty.base == Base::Bool && ty.choices.is_empty() {
            if ty.array {
                return Err(ParseError::malformed(
                    line,
                    "def",
                    format!("`{}`: boolean arrays are not supported", param.name),
                ));
            }
            RawTag::new(TagKind::Flag, FlagTag { token, description }.to_args(), line)
        } else {
            let required = param.default.is_none() && !ty.optional;
            let notation = match ty.base {
                Base::Int => Some("INTEGER".to_owned()),
                Base::Float => Some("NUMBER".to_owned()),
                Base::Str | Base::Bool => None,
            };
            let option = OptionTag {
                token,
                suffix: Suffix::from_shape(required, ty.array),
                choices: ty.choices,
                default: param.default.and_then(default_literal),
                notation,
                description,
            };
            RawTag::new(TagKind::Option, option.to_args(), line)
        };
        tags.push(tag);
    }

    Ok(TagBlock::new(name, def_line, tags))
}

impl CommentDialect for PythonDialect {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, source: &str, mode: ExtractMode) -> ParseResult<SourceTags> {
        let entry = Language::Python.tool_entry_function();
        let mut blocks = Vec::new();

        for captures in TOP_LEVEL_DEF.captures_iter(source) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let name = name.as_str();
            let wanted = match mode {
                ExtractMode::Tool => name == entry,
                ExtractMode::Agent => !name.starts_with('_'),
            };
            if wanted {
                blocks.push(function_block(source, name, whole.start(), whole.end() - 1)?);
            }
        }

        if mode == ExtractMode::Tool && blocks.is_empty() {
            blocks.push(TagBlock::new(entry, 1, Vec::new()));
        }

        Ok(SourceTags::new(Vec::new(), blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::ParsedTag;

    const TOOL: &str = r#"import os
from typing import List, Literal, Optional


def run(
    location: str,
    unit: Literal["c", "f"] = "c",
    days: int = 3,
    verbose: bool = False,
    tags: Optional[List[str]] = None,
    ratio: float | None = None,
):
    """Get the current weather in a given location.

    Uses wttr.in.

    Args:
        location: The city and optionally the state or country,
            e.g. San Francisco, CA
        unit (str): Temperature unit
        days: Forecast days
        verbose: Print more
        tags: Labels

    Returns:
        The forecast text.
    """
    return location


def _helper():
    pass
"#;

    fn options(block: &TagBlock) -> Vec<ParsedTag> {
        block.tags().iter().map(|tag| tag.parse().unwrap()).collect()
    }

    #[test]
    fn tool_signature_becomes_tags() {
        let tags = PythonDialect.extract(TOOL, ExtractMode::Tool).unwrap();
        assert_eq!(tags.blocks().len(), 1);
        let block = &tags.blocks()[0];
        assert_eq!(block.function(), "run");
        assert_eq!(block.line(), 5);

        let parsed = options(block);
        assert_eq!(parsed.len(), 7);
        assert_eq!(
            parsed[0],
            ParsedTag::Describe("Get the current weather in a given location. Uses wttr.in.".into())
        );

        let ParsedTag::Option(location) = &parsed[1] else {
            panic!("expected option");
        };
        assert_eq!(location.suffix, Suffix::Required);
        assert_eq!(
            location.description,
            "The city and optionally the state or country, e.g. San Francisco, CA"
        );
        assert_eq!(block.tags()[1].line(), 6);

        let ParsedTag::Option(unit) = &parsed[2] else {
            panic!("expected option");
        };
        assert_eq!(unit.choices, ["c", "f"]);
        assert_eq!(unit.default.as_deref(), Some("c"));
        assert_eq!(unit.suffix, Suffix::None);
        assert_eq!(unit.description, "Temperature unit");

        let ParsedTag::Option(days) = &parsed[3] else {
            panic!("expected option");
        };
        assert_eq!(days.notation.as_deref(), Some("INTEGER"));
        assert_eq!(days.default.as_deref(), Some("3"));

        assert!(matches!(&parsed[4], ParsedTag::Flag(flag) if flag.description == "Print more"));

        let ParsedTag::Option(labels) = &parsed[5] else {
            panic!("expected option");
        };
        assert_eq!(labels.suffix, Suffix::OptionalArray);
        assert_eq!(labels.default, None);

        let ParsedTag::Option(ratio) = &parsed[6] else {
            panic!("expected option");
        };
        assert_eq!(ratio.suffix, Suffix::None);
        assert_eq!(ratio.notation.as_deref(), Some("NUMBER"));
        assert_eq!(ratio.description, "");
    }

    #[test]
    fn agent_mode_skips_private_functions() {
        let source = r#"
async def add_todo(desc: str):
    """Add a new todo item

    Args:
        desc: The todo description
    """


def del_todo(id: int) -> dict[str, int]:
    '''Delete an existing todo item'''


def _load(self):
    pass


class Store:
    def save(self):
        """Nested methods are not actions."""
"#;
        let tags = PythonDialect.extract(source, ExtractMode::Agent).unwrap();
        let names: Vec<_> = tags.blocks().iter().map(TagBlock::function).collect();
        assert_eq!(names, ["add_todo", "del_todo"]);
        let del = options(&tags.blocks()[1]);
        assert_eq!(del[0], ParsedTag::Describe("Delete an existing todo item".into()));
        let ParsedTag::Option(id) = &del[1] else {
            panic!("expected option");
        };
        assert_eq!(id.suffix, Suffix::Required);
        assert_eq!(id.notation.as_deref(), Some("INTEGER"));
    }

    #[test]
    fn missing_run_yields_empty_block() {
        let tags = PythonDialect
            .extract("def main():\n    pass\n", ExtractMode::Tool)
            .unwrap();
        assert_eq!(tags.blocks()[0].function(), "run");
        assert!(tags.blocks()[0].tags().is_empty());
    }

    #[test]
    fn maps_annotations() {
        assert_eq!(analyze("str"), PyType::plain(Base::Str));
        assert_eq!(analyze("typing.List[int]").base, Base::Int);
        assert!(analyze("list[float]").array);
        assert!(analyze("Union[int, None]").optional);
        assert!(analyze("'Optional[str]'").optional);
        assert_eq!(analyze("Literal[1, 2]").choices, ["1", "2"]);
        assert_eq!(analyze("dict[str, int]"), PyType::plain(Base::Str));
        assert_eq!(default_literal("'x'").as_deref(), Some("x"));
        assert_eq!(default_literal("[]"), None);
        assert_eq!(default_literal("1.5").as_deref(), Some("1.5"));
    }

    #[test]
    fn docstring_text_is_kept_verbatim() {
        let source = r#"
def run(query: str, note: str, quoted: str):
    '''"Search" the <b>index</b> "now"

    Args:
        query: <b>bold</b> search text
        note: < 10 chars
        quoted: "foo" or "bar"
    '''
"#;
        let tags = PythonDialect.extract(source, ExtractMode::Tool).unwrap();
        let parsed = options(&tags.blocks()[0]);
        assert_eq!(
            parsed[0],
            ParsedTag::Describe(r#""Search" the <b>index</b> "now""#.into())
        );
        let descriptions: Vec<_> = parsed[1..]
            .iter()
            .map(|tag| match tag {
                ParsedTag::Option(option) => {
                    assert_eq!(option.notation, None);
                    option.description.as_str()
                }
                other => panic!("expected option, got {other:?}"),
            })
            .collect();
        assert_eq!(
            descriptions,
            ["<b>bold</b> search text", "< 10 chars", r#""foo" or "bar""#]
        );
    }

    #[test]
    fn rejects_unterminated_signature() {
        let err = PythonDialect
            .extract("\n\ndef run(a: str,\n", ExtractMode::Tool)
            .expect_err("unterminated");
        assert_eq!(err.line(), 3);
    }
}
