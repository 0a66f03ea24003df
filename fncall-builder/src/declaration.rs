//! Folding raw tags into declarations.

use std::collections::HashSet;

use fncall_parser::{
    ExtractMode, FlagTag, OptionTag, ParseError, ParsedTag, RawTag, Suffix, extract_tags,
};
use fncall_primitives::{Declaration, Language, ParamKind, ParameterSpec};
use serde_json::{Number, Value};

use crate::error::DeclarationError;

/// Builds the declaration for one tag block.
///
/// Exactly one `describe` tag is required. Every `option` and `flag` tag
/// becomes a parameter in source order. `env` and `meta` tags do not
/// contribute to the declaration.
///
/// # Errors
///
/// Returns the first [`DeclarationError`] encountered in source order.
pub fn build_declaration(name: &str, tags: &[RawTag]) -> Result<Declaration, DeclarationError> {
    let mut description: Option<String> = None;
    let mut parameters = Vec::new();
    let mut seen = HashSet::new();

    for tag in tags {
        let parameter = match tag.parse()? {
            ParsedTag::Describe(text) => {
                if description.is_some() {
                    return Err(DeclarationError::DuplicateDescription {
                        name: name.to_owned(),
                        line: tag.line(),
                    });
                }
                description = Some(text);
                continue;
            }
            ParsedTag::Option(option) => option_parameter(&option, tag.line())?,
            ParsedTag::Flag(flag) => flag_parameter(&flag, tag.line())?,
            ParsedTag::Env(_) | ParsedTag::Meta(_) => continue,
        };

        if !seen.insert(parameter.name().to_owned()) {
            return Err(DeclarationError::DuplicateParameter {
                name: name.to_owned(),
                parameter: parameter.name().to_owned(),
                line: tag.line(),
            });
        }
        parameters.push(parameter);
    }

    let description = description.ok_or_else(|| DeclarationError::MissingDescription {
        name: name.to_owned(),
    })?;

    let mut declaration = Declaration::new(name, description)?;
    for parameter in parameters {
        declaration.push_parameter(parameter)?;
    }
    Ok(declaration)
}

/// Extracts and builds every declaration of one source file.
///
/// In tool mode the single block is named `name`; in agent mode each block is
/// named after its function and marked as an agent action.
///
/// # Errors
///
/// Returns the first parse or declaration error.
pub fn declarations_from_source(
    name: &str,
    language: Language,
    source: &str,
    mode: ExtractMode,
) -> Result<Vec<Declaration>, DeclarationError> {
    let tags = extract_tags(language, source, mode)?;
    tags.blocks()
        .iter()
        .map(|block| match mode {
            ExtractMode::Tool => build_declaration(name, block.tags()),
            ExtractMode::Agent => {
                build_declaration(block.function(), block.tags()).map(|d| d.with_agent(true))
            }
        })
        .collect()
}

fn notation_kind(notation: Option<&str>) -> ParamKind {
    match notation.map(str::to_ascii_uppercase).as_deref() {
        Some("INT" | "INTEGER") => ParamKind::Integer,
        Some("NUM" | "NUMBER" | "FLOAT") => ParamKind::Number,
        _ => ParamKind::String,
    }
}

fn default_value(kind: ParamKind, text: &str) -> Option<Value> {
    match kind {
        ParamKind::String => Some(Value::String(text.to_owned())),
        ParamKind::Integer => text.parse::<i64>().ok().map(Value::from),
        ParamKind::Number => text.parse::<i64>().ok().map(Value::from).or_else(|| {
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }),
        ParamKind::Boolean => None,
    }
}

fn option_parameter(option: &OptionTag, line: usize) -> Result<ParameterSpec, DeclarationError> {
    let malformed = |reason: String| ParseError::malformed(line, "option", reason);

    let kind = notation_kind(option.notation.as_deref());
    if !option.choices.is_empty() && kind != ParamKind::String {
        return Err(malformed(format!(
            "choices of `--{}` require a string value, not {}",
            option.token,
            kind.as_str()
        ))
        .into());
    }

    let (required, array) = match option.suffix {
        Suffix::None => (false, false),
        Suffix::Required => (true, false),
        Suffix::RequiredArray => (true, true),
        Suffix::OptionalArray => (false, true),
    };

    let mut parameter = ParameterSpec::option(option.name(), kind)
        .map_err(|err| malformed(err.to_string()))?
        .required(required)
        .array(array)
        .with_description(option.description.clone())
        .with_choices(option.choices.clone());

    if let Some(default) = &option.default {
        if !option.choices.is_empty() && !option.choices.contains(default) {
            return Err(malformed(format!(
                "default `{default}` of `--{}` is not one of its choices",
                option.token
            ))
            .into());
        }
        let value = default_value(kind, default).ok_or_else(|| {
            malformed(format!(
                "default `{default}` of `--{}` is not a valid {}",
                option.token,
                kind.as_str()
            ))
        })?;
        parameter = parameter.with_default(if array { Value::Array(vec![value]) } else { value });
    }

    Ok(parameter)
}

fn flag_parameter(flag: &FlagTag, line: usize) -> Result<ParameterSpec, DeclarationError> {
    let parameter = ParameterSpec::flag(flag.name())
        .map_err(|err| ParseError::malformed(line, "flag", err.to_string()))?
        .with_description(flag.description.clone());
    Ok(parameter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fncall_parser::TagKind;
    use serde_json::json;

    fn tag(kind: TagKind, args: &str, line: usize) -> RawTag {
        RawTag::new(kind, args, line)
    }

    #[test]
    fn echo_tool_scenario() {
        let tags = [
            tag(TagKind::Describe, r#""Echo input""#, 1),
            tag(TagKind::Option, r#"--text! "text to echo""#, 2),
        ];
        let declaration = build_declaration("echo", &tags).unwrap();
        assert_eq!(declaration.name(), "echo");
        assert_eq!(declaration.description(), "Echo input");
        assert_eq!(declaration.parameters().len(), 1);
        let text = &declaration.parameters()[0];
        assert_eq!(text.name(), "text");
        assert_eq!(text.kind(), ParamKind::String);
        assert!(text.is_required());
        assert!(!text.is_array());
        assert_eq!(text.description(), "text to echo");
    }

    #[test]
    fn parameters_follow_source_order() {
        let tags = [
            tag(TagKind::Env, "API_KEY! Key", 1),
            tag(TagKind::Describe, "Search files", 2),
            tag(TagKind::Option, "--pattern! <PATTERN> Glob", 3),
            tag(TagKind::Flag, "--hidden Include dotfiles", 4),
            tag(TagKind::Option, "--max-depth=3 <INT> Depth", 5),
            tag(TagKind::Option, "--paths* Roots", 6),
            tag(TagKind::Option, "--mode[=fast|slow] Strategy", 7),
            tag(TagKind::Meta, "require-tools fd", 8),
        ];
        let declaration = build_declaration("search", &tags).unwrap();
        let names: Vec<_> = declaration.parameters().iter().map(ParameterSpec::name).collect();
        assert_eq!(names, ["pattern", "hidden", "max_depth", "paths", "mode"]);

        let depth = declaration.parameter("max_depth").unwrap();
        assert_eq!(depth.kind(), ParamKind::Integer);
        assert_eq!(depth.default_value(), Some(&json!(3)));

        let paths = declaration.parameter("paths").unwrap();
        assert!(paths.is_array() && !paths.is_required());

        let mode = declaration.parameter("mode").unwrap();
        assert_eq!(mode.choices(), ["fast", "slow"]);
        assert_eq!(mode.default_value(), Some(&json!("fast")));

        assert!(declaration.parameter("hidden").unwrap().is_flag());
    }

    #[test]
    fn reports_duplicate_description_line() {
        let tags = [
            tag(TagKind::Describe, "First", 3),
            tag(TagKind::Option, "--a", 4),
            tag(TagKind::Describe, "Second", 5),
        ];
        let err = build_declaration("dup", &tags).expect_err("duplicate");
        assert!(matches!(err, DeclarationError::DuplicateDescription { line: 5, .. }));
    }

    #[test]
    fn reports_missing_description() {
        let err =
            build_declaration("bare", &[tag(TagKind::Option, "--a", 1)]).expect_err("missing");
        assert!(matches!(err, DeclarationError::MissingDescription { name } if name == "bare"));
    }

    #[test]
    fn reports_duplicate_parameter_after_name_mapping() {
        let tags = [
            tag(TagKind::Describe, "Copy", 1),
            tag(TagKind::Option, "--file-path!", 2),
            tag(TagKind::Flag, "--file_path", 3),
        ];
        let err = build_declaration("copy", &tags).expect_err("duplicate");
        assert!(matches!(
            err,
            DeclarationError::DuplicateParameter { ref parameter, line: 3, .. }
                if parameter == "file_path"
        ));
    }

    #[test]
    fn rejects_inconsistent_defaults() {
        for args in ["--n=abc <INT>", "--mode[a|b]=c", "--level[a|b] <INT>"] {
            let tags = [tag(TagKind::Describe, "x", 1), tag(TagKind::Option, args, 2)];
            let err = build_declaration("x", &tags).expect_err(args);
            assert!(
                matches!(err, DeclarationError::MalformedTag(ref e) if e.line() == 2),
                "{args}: {err}"
            );
        }
    }

    #[test]
    fn agent_source_marks_actions() {
        let source = "# @cmd Add\n# @option --desc!\nadd() { :; }\n# @cmd List\nlist() { :; }\n";
        let declarations =
            declarations_from_source("todo", Language::Shell, source, ExtractMode::Agent).unwrap();
        let names: Vec<_> = declarations.iter().map(Declaration::name).collect();
        assert_eq!(names, ["add", "list"]);
        assert!(declarations.iter().all(Declaration::is_agent_action));
    }
}
