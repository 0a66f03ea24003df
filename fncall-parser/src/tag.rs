//! Canonical tag records and the argument grammar shared by all dialects.

use std::fmt::Write as _;

use crate::error::{ParseError, ParseResult};

/// Tag vocabulary recognized in source comments.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TagKind {
    /// Summary of the tool or action.
    Describe,
    /// Named, typed parameter.
    Option,
    /// Boolean switch.
    Flag,
    /// Environment variable the source depends on.
    Env,
    /// Free-form metadata such as `require-tools`.
    Meta,
}

impl TagKind {
    /// Maps a tag name (without `@`) to its kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "describe" => Some(Self::Describe),
            "option" => Some(Self::Option),
            "flag" => Some(Self::Flag),
            "env" => Some(Self::Env),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }

    /// Returns the tag name without `@`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::Option => "option",
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Meta => "meta",
        }
    }
}

/// One tag occurrence: its kind, unparsed arguments and 1-based source line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawTag {
    kind: TagKind,
    args: String,
    line: usize,
}

impl RawTag {
    /// Creates a raw tag record.
    #[must_use]
    pub fn new(kind: TagKind, args: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            args: args.into(),
            line,
        }
    }

    /// Returns the tag kind.
    #[must_use]
    pub const fn kind(&self) -> TagKind {
        self.kind
    }

    /// Returns the raw argument string.
    #[must_use]
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Returns the 1-based source line.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Splits the argument string according to the tag's grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedTag`] when the arguments cannot be split
    /// into name, suffix and description.
    pub fn parse(&self) -> ParseResult<ParsedTag> {
        let mut cursor = Cursor::new(self);
        match self.kind {
            TagKind::Describe => parse_describe(self).map(ParsedTag::Describe),
            TagKind::Option => cursor.option().map(ParsedTag::Option),
            TagKind::Flag => cursor.flag().map(ParsedTag::Flag),
            TagKind::Env => cursor.env().map(ParsedTag::Env),
            TagKind::Meta => parse_meta(self).map(ParsedTag::Meta),
        }
    }
}

/// Structured form of a tag after grammar splitting.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedTag {
    /// `@describe` text.
    Describe(String),
    /// `@option` parameter.
    Option(OptionTag),
    /// `@flag` switch.
    Flag(FlagTag),
    /// `@env` requirement.
    Env(EnvTag),
    /// `@meta` entry.
    Meta(MetaTag),
}

/// Shape marker trailing an option name.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Suffix {
    /// No suffix: optional scalar.
    #[default]
    None,
    /// `!`: required scalar.
    Required,
    /// `+`: required array.
    RequiredArray,
    /// `*`: optional array.
    OptionalArray,
}

impl Suffix {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '!' => Some(Self::Required),
            '+' => Some(Self::RequiredArray),
            '*' => Some(Self::OptionalArray),
            _ => None,
        }
    }

    /// Derives the suffix for a required/array combination.
    #[must_use]
    pub const fn from_shape(required: bool, array: bool) -> Self {
        match (required, array) {
            (true, false) => Self::Required,
            (true, true) => Self::RequiredArray,
            (false, true) => Self::OptionalArray,
            (false, false) => Self::None,
        }
    }

    /// Returns the suffix character, if any.
    #[must_use]
    pub const fn as_char(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::Required => Some('!'),
            Self::RequiredArray => Some('+'),
            Self::OptionalArray => Some('*'),
        }
    }
}

/// `@option --NAME[SUFFIX][CHOICES][=DEFAULT] [<NOTATION>] [DESCRIPTION]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionTag {
    /// Token as written, without dashes (`file-path`).
    pub token: String,
    /// Shape suffix.
    pub suffix: Suffix,
    /// Enumerated values from `[a|b]`.
    pub choices: Vec<String>,
    /// Default value from `=value` or `[=a|b]`.
    pub default: Option<String>,
    /// Value notation from `<NOTATION>`.
    pub notation: Option<String>,
    /// Free-text description.
    pub description: String,
}

impl OptionTag {
    /// Returns the schema name: `file-path` becomes `file_path`.
    #[must_use]
    pub fn name(&self) -> String {
        schema_name(&self.token)
    }

    /// Renders the canonical argument string accepted by [`RawTag::parse`].
    #[must_use]
    pub fn to_args(&self) -> String {
        let mut args = format!("--{}", self.token);
        if let Some(c) = self.suffix.as_char() {
            args.push(c);
        }
        if !self.choices.is_empty() {
            args.push('[');
            args.push_str(&self.choices.join("|"));
            args.push(']');
        }
        if let Some(default) = &self.default {
            let _ = write!(args, "={}", quote(default));
        }
        if let Some(notation) = &self.notation {
            let _ = write!(args, " <{notation}>");
        }
        if !self.description.is_empty() {
            args.push(' ');
            args.push_str(&quote_text(&self.description));
        }
        args
    }
}

/// `@flag --NAME [DESCRIPTION]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagTag {
    /// Token as written, without dashes.
    pub token: String,
    /// Free-text description.
    pub description: String,
}

impl FlagTag {
    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> String {
        schema_name(&self.token)
    }

    /// Renders the canonical argument string.
    #[must_use]
    pub fn to_args(&self) -> String {
        if self.description.is_empty() {
            format!("--{}", self.token)
        } else {
            format!("--{} {}", self.token, quote_text(&self.description))
        }
    }
}

/// `@env NAME[!][=DEFAULT] [DESCRIPTION]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvTag {
    /// Variable name.
    pub name: String,
    /// Whether the variable must be set.
    pub required: bool,
    /// Fallback value.
    pub default: Option<String>,
    /// Free-text description.
    pub description: String,
}

/// `@meta KEY [VALUE ...]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaTag {
    /// Metadata key, e.g. `require-tools`.
    pub key: String,
    /// Whitespace-separated values.
    pub values: Vec<String>,
}

fn schema_name(token: &str) -> String {
    token.replace('-', "_")
}

fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == '"') {
        return value.to_owned();
    }
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Wraps free text in double quotes so [`unquote`] returns it verbatim.
pub(crate) fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

/// Strips one pair of surrounding double quotes and unescapes `\"`.
pub(crate) fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].replace("\\\"", "\"")
    } else {
        text.to_owned()
    }
}

fn parse_describe(tag: &RawTag) -> ParseResult<String> {
    let description = unquote(&tag.args);
    if description.is_empty() {
        return Err(ParseError::malformed(
            tag.line,
            tag.kind.as_str(),
            "missing description text",
        ));
    }
    Ok(description)
}

fn parse_meta(tag: &RawTag) -> ParseResult<MetaTag> {
    let mut parts = tag.args.split_whitespace();
    let key = parts
        .next()
        .ok_or_else(|| ParseError::malformed(tag.line, tag.kind.as_str(), "missing metadata key"))?;
    Ok(MetaTag {
        key: key.to_owned(),
        values: parts.map(str::to_owned).collect(),
    })
}

struct Cursor<'a> {
    tag: &'a RawTag,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(tag: &'a RawTag) -> Self {
        Self {
            tag,
            rest: tag.args.trim(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::malformed(self.tag.line, self.tag.kind.as_str(), reason)
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !predicate(c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn delimited(&mut self, close: char, what: &str) -> ParseResult<&'a str> {
        let end = self
            .rest
            .find(close)
            .ok_or_else(|| self.error(format!("unterminated {what}")))?;
        let inner = &self.rest[..end];
        self.rest = &self.rest[end + close.len_utf8()..];
        Ok(inner)
    }

    fn value(&mut self) -> ParseResult<String> {
        if self.peek() == Some('"') {
            self.bump();
            let mut value = String::new();
            loop {
                match self.bump() {
                    None => return Err(self.error("unterminated quoted value")),
                    Some('\\') if self.peek() == Some('"') => {
                        self.bump();
                        value.push('"');
                    }
                    Some('"') => return Ok(value),
                    Some(c) => value.push(c),
                }
            }
        }
        Ok(self.take_while(|c| !c.is_whitespace()).to_owned())
    }

    fn long_name(&mut self) -> ParseResult<&'a str> {
        if self.rest.is_empty() {
            return Err(self.error("missing parameter name"));
        }
        if !self.rest.starts_with("--") {
            return Err(self.error(format!(
                "expected `--NAME`, found `{}`",
                self.rest.split_whitespace().next().unwrap_or_default()
            )));
        }
        self.rest = &self.rest[2..];
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if name.is_empty() || name.starts_with('-') {
            return Err(self.error("missing parameter name"));
        }
        Ok(name)
    }

    fn end_of_head(&mut self, name: &str) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(c) if c.is_whitespace() => {
                self.skip_whitespace();
                Ok(())
            }
            Some(c) => Err(self.error(format!("unexpected `{c}` after `{name}`"))),
        }
    }

    fn description(&mut self) -> String {
        let description = unquote(self.rest);
        self.rest = "";
        description
    }

    fn option(&mut self) -> ParseResult<OptionTag> {
        let token = self.long_name()?.to_owned();
        let mut option = OptionTag {
            token,
            ..OptionTag::default()
        };

        if let Some(suffix) = self.peek().and_then(Suffix::from_char) {
            self.bump();
            option.suffix = suffix;
        }

        if self.peek() == Some('[') {
            self.bump();
            let inner = self.delimited(']', "choice list")?;
            for choice in inner.split('|').map(str::trim) {
                let choice = match choice.strip_prefix('=') {
                    Some(default) => {
                        option.default = Some(default.to_owned());
                        default
                    }
                    None => choice,
                };
                if choice.is_empty() {
                    return Err(self.error("empty value in choice list"));
                }
                option.choices.push(choice.to_owned());
            }
        }

        if self.peek() == Some('=') {
            self.bump();
            option.default = Some(self.value()?);
        }

        let name = format!("--{}", option.token);
        self.end_of_head(&name)?;

        if self.peek() == Some('<') {
            self.bump();
            let notation = self.delimited('>', "value notation")?.trim();
            if notation.is_empty() {
                return Err(self.error("empty value notation"));
            }
            option.notation = Some(notation.to_owned());
            self.skip_whitespace();
        }

        option.description = self.description();
        Ok(option)
    }

    fn flag(&mut self) -> ParseResult<FlagTag> {
        let token = self.long_name()?.to_owned();
        if let Some(c) = self.peek().filter(|c| Suffix::from_char(*c).is_some()) {
            return Err(self.error(format!("flag `--{token}` cannot carry the `{c}` suffix")));
        }
        self.end_of_head(&format!("--{token}"))?;
        Ok(FlagTag {
            token,
            description: self.description(),
        })
    }

    fn env(&mut self) -> ParseResult<EnvTag> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("missing or invalid variable name"));
        }
        let mut env = EnvTag {
            name: name.to_owned(),
            ..EnvTag::default()
        };
        if self.peek() == Some('!') {
            self.bump();
            env.required = true;
        }
        if self.peek() == Some('=') {
            self.bump();
            env.default = Some(self.value()?);
        }
        self.end_of_head(name)?;
        env.description = self.description();
        Ok(env)
    }
}
