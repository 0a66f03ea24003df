//! JSDoc blocks in JavaScript sources.
//!
//! A block attaches to the export that immediately follows it:
//!
//! ```text
//! /**
//!  * Get the current weather in a given location.
//!  * @typedef {Object} Args
//!  * @property {string} location - The city
//!  * @property {'c'|'f'} [unit=c] - Temperature unit
//!  * @param {Args} args
//!  */
//! exports.run = function ({ location, unit }) { ... }
//! ```

use std::sync::LazyLock;

use fncall_primitives::Language;
use regex::Regex;

use crate::dialect::{CommentDialect, ExtractMode, SourceTags, TagBlock};
use crate::error::{ParseError, ParseResult};
use crate::tag::{FlagTag, OptionTag, RawTag, Suffix, TagKind, quote_text};

static DOC_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*\*(.*?)\*/").expect("valid jsdoc regex"));

static EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:",
        r"(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=",
        r"|(?:export\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(",
        r"|export\s+(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=",
        r")"
    ))
    .expect("valid export regex")
});

/// Dialect for `.js` sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScriptDialect;

#[derive(Debug)]
struct DocEntry {
    tag: String,
    text: String,
    line: usize,
}

#[derive(Debug, Default)]
struct DocComment {
    summary: Vec<String>,
    summary_line: usize,
    entries: Vec<DocEntry>,
}

impl DocComment {
    fn parse(body: &str, first_line: usize) -> Self {
        let mut doc = Self::default();
        for (offset, raw) in body.split('\n').enumerate() {
            let line = first_line + offset;
            let text = raw.trim_start();
            let text = text.strip_prefix('*').unwrap_or(text).trim();
            if text.is_empty() {
                continue;
            }
            if let Some(tagged) = text.strip_prefix('@') {
                let (tag, rest) = tagged
                    .split_once(char::is_whitespace)
                    .unwrap_or((tagged, ""));
                doc.entries.push(DocEntry {
                    tag: tag.to_owned(),
                    text: rest.trim().to_owned(),
                    line,
                });
            } else if let Some(entry) = doc.entries.last_mut() {
                if !entry.text.is_empty() {
                    entry.text.push(' ');
                }
                entry.text.push_str(text);
            } else {
                if doc.summary.is_empty() {
                    doc.summary_line = line;
                }
                doc.summary.push(text.to_owned());
            }
        }
        doc
    }

    fn into_tags(self) -> ParseResult<Vec<RawTag>> {
        let mut tags = Vec::new();
        if !self.summary.is_empty() {
            tags.push(RawTag::new(
                TagKind::Describe,
                quote_text(&self.summary.join(" ")),
                self.summary_line,
            ));
        }
        for entry in self.entries {
            match entry.tag.as_str() {
                "describe" | "description" => {
                    tags.push(RawTag::new(TagKind::Describe, entry.text, entry.line));
                }
                "property" | "param" => {
                    if let Some(tag) = property_tag(&entry)? {
                        tags.push(tag);
                    }
                }
                "env" => tags.push(RawTag::new(TagKind::Env, entry.text, entry.line)),
                "meta" => tags.push(RawTag::new(TagKind::Meta, entry.text, entry.line)),
                _ => {}
            }
        }
        Ok(tags)
    }
}

enum JsType {
    Flag,
    Value {
        notation: Option<&'static str>,
        array: bool,
        choices: Vec<String>,
    },
}

fn js_type(ty: &str) -> Option<JsType> {
    let ty = ty.trim();
    let (inner, array) = if let Some(inner) = ty.strip_suffix("[]") {
        (inner, true)
    } else if let Some(inner) = ty.strip_prefix("Array<").and_then(|t| t.strip_suffix('>')) {
        (inner, true)
    } else {
        (ty, false)
    };
    let inner = inner
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();

    let literals: Vec<&str> = inner.split('|').map(str::trim).collect();
    if literals.iter().all(|l| is_quoted(l)) {
        return Some(JsType::Value {
            notation: None,
            array,
            choices: literals.iter().map(|l| strip_quotes(l).to_owned()).collect(),
        });
    }

    let notation = match inner.to_ascii_lowercase().as_str() {
        "boolean" | "bool" if array => return None,
        "boolean" | "bool" => return Some(JsType::Flag),
        "number" => Some("NUMBER"),
        "integer" | "int" => Some("INTEGER"),
        _ => None,
    };
    Some(JsType::Value {
        notation,
        array,
        choices: Vec::new(),
    })
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
}

fn strip_quotes(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Splits `{TYPE}` off the front of a property entry, honoring nested braces.
fn split_type(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('{')?;
    let mut depth = 0usize;
    for (index, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some((&rest[..index], rest[index + 1..].trim_start())),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn property_tag(entry: &DocEntry) -> ParseResult<Option<RawTag>> {
    let malformed = |reason: &str| ParseError::malformed(entry.line, entry.tag.as_str(), reason);

    let (ty, rest) = split_type(&entry.text).ok_or_else(|| malformed("missing `{TYPE}`"))?;
    let (mut optional, ty) = match ty.trim().strip_suffix('=') {
        Some(ty) => (true, ty),
        None => (false, ty),
    };

    let (name, default, rest) = if let Some(bracketed) = rest.strip_prefix('[') {
        let end = bracketed
            .find(']')
            .ok_or_else(|| malformed("unterminated `[name]`"))?;
        optional = true;
        let (name, default) = match bracketed[..end].split_once('=') {
            Some((name, default)) => (name.trim(), Some(strip_quotes(default.trim()).to_owned())),
            None => (bracketed[..end].trim(), None),
        };
        (name, default, &bracketed[end + 1..])
    } else {
        let (name, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        (name, None, rest)
    };
    if name.is_empty() {
        return Err(malformed("missing parameter name"));
    }

    let name = match name.strip_prefix("args.") {
        Some(name) => name,
        // `@param {Args} args` documents the whole argument object.
        None if entry.tag == "param" => return Ok(None),
        None => name,
    };
    if name.contains('.') {
        return Ok(None);
    }

    let description = rest.trim();
    let description = description.strip_prefix('-').unwrap_or(description).trim();

    let tag = match js_type(ty).ok_or_else(|| malformed("boolean arrays are not supported"))? {
        JsType::Flag => RawTag::new(
            TagKind::Flag,
            FlagTag {
                token: name.to_owned(),
                description: description.to_owned(),
            }
            .to_args(),
            entry.line,
        ),
        JsType::Value {
            notation,
            array,
            choices,
        } => RawTag::new(
            TagKind::Option,
            OptionTag {
                token: name.to_owned(),
                suffix: Suffix::from_shape(!optional, array),
                choices,
                default,
                notation: notation.map(str::to_owned),
                description: description.to_owned(),
            }
            .to_args(),
            entry.line,
        ),
    };
    Ok(Some(tag))
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn exported_name(after: &str) -> Option<String> {
    let line = after.lines().find(|line| !line.trim().is_empty())?;
    let captures = EXPORT.captures(line)?;
    (1..=3)
        .find_map(|group| captures.get(group))
        .map(|m| m.as_str().to_owned())
}

impl CommentDialect for JavaScriptDialect {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extract(&self, source: &str, mode: ExtractMode) -> ParseResult<SourceTags> {
        let entry = Language::JavaScript.tool_entry_function();
        let mut file_tags = Vec::new();
        let mut blocks = Vec::new();

        for captures in DOC_BLOCK.captures_iter(source) {
            let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let line = line_of(source, whole.start());
            let tags = DocComment::parse(body.as_str(), line).into_tags()?;

            match exported_name(&source[whole.end()..]) {
                Some(function) => {
                    let wanted = match mode {
                        ExtractMode::Tool => function == entry,
                        ExtractMode::Agent => !function.starts_with('_'),
                    };
                    if wanted {
                        blocks.push(TagBlock::new(function, line, tags));
                    }
                }
                None => file_tags.extend(
                    tags.into_iter()
                        .filter(|tag| matches!(tag.kind(), TagKind::Env | TagKind::Meta)),
                ),
            }
        }

        if mode == ExtractMode::Tool && blocks.is_empty() {
            blocks.push(TagBlock::new(entry, 1, Vec::new()));
        }

        Ok(SourceTags::new(file_tags, blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::ParsedTag;

    const TOOL: &str = r"/**
 * @env OPENWEATHER_KEY! API key
 */

/**
 * Get the current weather in a given location.
 * @typedef {Object} Args
 * @property {string} location - The city and optionally the state or country,
 *   e.g. San Francisco, CA
 * @property {'c'|'f'} [unit=c] - Temperature unit
 * @property {number} [days] Forecast days
 * @property {string[]} tags - Labels
 * @property {boolean} [verbose] - Print more
 * @param {Args} args
 * @returns {Promise<string>}
 */
exports.run = async function ({ location }) {
  return `weather in ${location}`;
};
";

    fn parsed(tag: &RawTag) -> ParsedTag {
        tag.parse().unwrap()
    }

    #[test]
    fn tool_block_uses_run_export() {
        let tags = JavaScriptDialect.extract(TOOL, ExtractMode::Tool).unwrap();
        assert_eq!(tags.blocks().len(), 1);
        assert_eq!(tags.file_tags().len(), 1);
        assert_eq!(tags.file_tags()[0].kind(), TagKind::Env);

        let block = &tags.blocks()[0];
        assert_eq!(block.function(), "run");
        assert_eq!(block.line(), 5);
        let tags = block.tags();
        assert_eq!(tags.len(), 6);
        assert_eq!(
            parsed(&tags[0]),
            ParsedTag::Describe("Get the current weather in a given location.".into())
        );

        let ParsedTag::Option(location) = parsed(&tags[1]) else {
            panic!("expected option");
        };
        assert_eq!(location.suffix, Suffix::Required);
        assert_eq!(
            location.description,
            "The city and optionally the state or country, e.g. San Francisco, CA"
        );
        assert_eq!(tags[1].line(), 8);

        let ParsedTag::Option(unit) = parsed(&tags[2]) else {
            panic!("expected option");
        };
        assert_eq!(unit.suffix, Suffix::None);
        assert_eq!(unit.choices, ["c", "f"]);
        assert_eq!(unit.default.as_deref(), Some("c"));

        let ParsedTag::Option(days) = parsed(&tags[3]) else {
            panic!("expected option");
        };
        assert_eq!(days.notation.as_deref(), Some("NUMBER"));
        assert_eq!(days.description, "Forecast days");

        let ParsedTag::Option(labels) = parsed(&tags[4]) else {
            panic!("expected option");
        };
        assert_eq!(labels.suffix, Suffix::RequiredArray);

        assert!(matches!(parsed(&tags[5]), ParsedTag::Flag(flag) if flag.token == "verbose"));
    }

    #[test]
    fn tool_without_run_yields_empty_block() {
        let source = "/** Helper */\nfunction helper() {}\n";
        let tags = JavaScriptDialect.extract(source, ExtractMode::Tool).unwrap();
        assert_eq!(tags.blocks()[0].function(), "run");
        assert!(tags.blocks()[0].tags().is_empty());
    }

    const AGENT: &str = r"
/**
 * Add a new todo item
 * @param {Object} args
 * @param {string} args.desc - The todo description
 */
export async function add_todo(args) {}

/**
 * @description Delete an existing todo item
 * @property {integer} id - The id of the todo item to delete
 */
exports.del_todo = (args) => {};

/** Internal */
function _load() {}

/**
 * List all todo items
 */
module.exports.list_todos = function () {};
";

    #[test]
    fn agent_mode_collects_public_exports() {
        let tags = JavaScriptDialect.extract(AGENT, ExtractMode::Agent).unwrap();
        let names: Vec<_> = tags.blocks().iter().map(TagBlock::function).collect();
        assert_eq!(names, ["add_todo", "del_todo", "list_todos"]);

        let add = tags.blocks()[0].tags();
        assert_eq!(add.len(), 2);
        let ParsedTag::Option(desc) = parsed(&add[1]) else {
            panic!("expected option");
        };
        assert_eq!(desc.name(), "desc");
        assert_eq!(desc.suffix, Suffix::Required);

        let del = tags.blocks()[1].tags();
        assert_eq!(
            parsed(&del[0]),
            ParsedTag::Describe("Delete an existing todo item".into())
        );
        let ParsedTag::Option(id) = parsed(&del[1]) else {
            panic!("expected option");
        };
        assert_eq!(id.notation.as_deref(), Some("INTEGER"));
    }

    #[test]
    fn property_text_is_kept_verbatim() {
        let source = r#"/**
 * "Find" all <tag> "elements"
 * @property {string} query - <tag> to find
 * @property {string} [limit] - < 10 results
 * @property {string} [quoted] - "foo" or "bar"
 * @property {boolean} [strict] - "exact" matches only
 */
exports.run = () => {};
"#;
        let tags = JavaScriptDialect.extract(source, ExtractMode::Tool).unwrap();
        let tags = tags.blocks()[0].tags();
        assert_eq!(tags.len(), 5);
        assert_eq!(
            parsed(&tags[0]),
            ParsedTag::Describe(r#""Find" all <tag> "elements""#.into())
        );
        let descriptions: Vec<_> = tags[1..4]
            .iter()
            .map(|tag| match parsed(tag) {
                ParsedTag::Option(option) => {
                    assert_eq!(option.notation, None);
                    option.description
                }
                other => panic!("expected option, got {other:?}"),
            })
            .collect();
        assert_eq!(descriptions, ["<tag> to find", "< 10 results", r#""foo" or "bar""#]);
        assert!(matches!(
            parsed(&tags[4]),
            ParsedTag::Flag(flag) if flag.description == r#""exact" matches only"#
        ));
    }

    #[test]
    fn rejects_untyped_property() {
        let source = "/**\n * Echo\n * @property text - missing type\n */\n\
                      exports.run = () => {};\n";
        let err = JavaScriptDialect
            .extract(source, ExtractMode::Tool)
            .expect_err("untyped");
        assert_eq!(err.line(), 3);
    }
}
