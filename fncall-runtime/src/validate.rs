//! Argument validation against a declaration.

use fncall_primitives::Declaration;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Arguments that passed validation.
///
/// Declared parameters come first in declaration order, followed by any
/// undeclared keys in the order the caller supplied them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    /// Returns the value of one argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates `args` against `declaration` without mutating either.
///
/// * `null` is accepted as an empty object.
/// * Required parameters that are absent, `null` or empty arrays are reported
///   together in one [`ValidationError::MissingRequiredParameter`].
/// * Array parameters accept a bare value as a one-element array; every
///   element must match the element kind.
/// * Absent flags become `false`; absent optional parameters take their
///   declared default.
/// * Undeclared keys pass through unchanged.
///
/// # Errors
///
/// Returns the first [`ValidationError`]; missing parameters take precedence
/// over type mismatches.
pub fn validate(declaration: &Declaration, args: &Value) -> Result<ValidatedArgs, ValidationError> {
    let empty = Map::new();
    let input = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::NotAnObject {
                found: json_type(other),
            });
        }
    };

    let mut missing = Vec::new();
    let mut mismatch = None;
    let mut output = Map::new();

    for parameter in declaration.parameters() {
        let name = parameter.name();
        match input.get(name).filter(|value| !value.is_null()) {
            None => {
                if parameter.is_required() {
                    missing.push(name.to_owned());
                } else if parameter.is_flag() {
                    output.insert(name.to_owned(), Value::Bool(false));
                } else if let Some(default) = parameter.default_value() {
                    output.insert(name.to_owned(), default.clone());
                }
            }
            Some(value) if parameter.is_array() => {
                let items = match value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                if items.is_empty() && parameter.is_required() {
                    missing.push(name.to_owned());
                    continue;
                }
                if mismatch.is_none() {
                    mismatch = items
                        .iter()
                        .find(|item| !parameter.kind().matches(item))
                        .map(|item| ValidationError::TypeMismatch {
                            parameter: name.to_owned(),
                            expected: parameter.kind().as_str(),
                            found: json_type(item),
                        });
                }
                output.insert(name.to_owned(), Value::Array(items));
            }
            Some(value) => {
                output.insert(name.to_owned(), value.clone());
            }
        }
    }

    if !missing.is_empty() {
        return Err(ValidationError::MissingRequiredParameter { names: missing });
    }
    if let Some(err) = mismatch {
        return Err(err);
    }

    for (key, value) in input {
        if declaration.parameter(key).is_none() {
            output.insert(key.clone(), value.clone());
        }
    }

    Ok(ValidatedArgs(output))
}
