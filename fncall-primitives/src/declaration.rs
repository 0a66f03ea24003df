//! Language-neutral function declarations.
//!
//! A [`Declaration`] serializes to the JSON function-calling shape consumed by
//! LLM providers:
//!
//! ```json
//! {
//!   "name": "echo",
//!   "description": "Echo input",
//!   "parameters": {
//!     "type": "object",
//!     "properties": { "text": { "type": "string", "description": "text to echo" } },
//!     "required": ["text"]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Primitive kind of a parameter, or of the elements of an array parameter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// JSON string.
    String,
    /// Whole JSON number.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean. Only used by flags.
    Boolean,
}

impl ParamKind {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Parses a JSON Schema primitive type name.
    #[must_use]
    pub fn from_schema_type(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Returns `true` when `value` has the JSON shape of this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
        }
    }
}

/// One typed parameter of a declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSpec {
    name: String,
    kind: ParamKind,
    array: bool,
    required: bool,
    flag: bool,
    description: String,
    choices: Vec<String>,
    default: Option<Value>,
}

impl ParameterSpec {
    /// Creates an optional, scalar option parameter of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the name is empty or contains
    /// characters other than ASCII alphanumerics and underscores, or if the
    /// kind is boolean (booleans are expressed as flags).
    pub fn option(name: impl Into<String>, kind: ParamKind) -> Result<Self> {
        let name = name.into();
        validate_parameter_name(&name)?;
        if kind == ParamKind::Boolean {
            return Err(Error::InvalidParameter {
                name,
                reason: "boolean parameters must be declared as flags".into(),
            });
        }
        Ok(Self {
            name,
            kind,
            array: false,
            required: false,
            flag: false,
            description: String::new(),
            choices: Vec::new(),
            default: None,
        })
    }

    /// Creates a boolean flag. Flags are never required and never arrays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the name is invalid.
    pub fn flag(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_parameter_name(&name)?;
        Ok(Self {
            name,
            kind: ParamKind::Boolean,
            array: false,
            required: false,
            flag: true,
            description: String::new(),
            choices: Vec::new(),
            default: None,
        })
    }

    /// Marks the parameter as required. Ignored for flags.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required && !self.flag;
        self
    }

    /// Marks the parameter as an array of its kind. Ignored for flags.
    #[must_use]
    pub fn array(mut self, array: bool) -> Self {
        self.array = array && !self.flag;
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restricts the parameter to an enumerated set of string values.
    #[must_use]
    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }

    /// Sets the value used when the caller omits the parameter.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Returns the schema name of the parameter.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the primitive kind (element kind for arrays).
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Returns `true` for array parameters.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.array
    }

    /// Returns `true` when callers must supply the parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` for boolean switches.
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        self.flag
    }

    /// Returns the description, possibly empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the enumerated values, empty when unrestricted.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Returns the declared default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the JSON Schema type name of the parameter itself.
    #[must_use]
    pub const fn schema_type(&self) -> &'static str {
        if self.array { "array" } else { self.kind.as_str() }
    }
}

fn validate_parameter_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidParameter {
            name: String::new(),
            reason: "parameter name cannot be empty".into(),
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: "parameter name must contain ASCII alphanumerics or underscores".into(),
        });
    }
    Ok(())
}

/// Canonical description of one callable tool or agent action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DeclarationRepr", into = "DeclarationRepr")]
pub struct Declaration {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    agent: bool,
}

impl Declaration {
    /// Creates a declaration without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeclaration`] if the name is empty or contains
    /// whitespace, or if the description is blank.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDeclaration {
                name,
                reason: "name must be non-empty and contain no whitespace".into(),
            });
        }

        let description = description.into();
        if description.trim().is_empty() {
            return Err(Error::InvalidDeclaration {
                name,
                reason: "description cannot be empty".into(),
            });
        }

        Ok(Self {
            name,
            description,
            parameters: Vec::new(),
            agent: false,
        })
    }

    /// Appends a parameter, keeping declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if a parameter with the same name
    /// is already present.
    pub fn push_parameter(&mut self, parameter: ParameterSpec) -> Result<()> {
        if self.parameter(parameter.name()).is_some() {
            return Err(Error::DuplicateParameter {
                declaration: self.name.clone(),
                parameter: parameter.name().to_owned(),
            });
        }
        self.parameters.push(parameter);
        Ok(())
    }

    /// Appends a parameter, returning the updated declaration for chaining.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] on a name collision.
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Result<Self> {
        self.push_parameter(parameter)?;
        Ok(self)
    }

    /// Marks the declaration as an action implemented by an agent's own source.
    #[must_use]
    pub fn with_agent(mut self, agent: bool) -> Self {
        self.agent = agent;
        self
    }

    /// Returns the declaration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Looks up a parameter by schema name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Returns `true` for agent actions routed to the agent's dispatcher.
    #[must_use]
    pub const fn is_agent_action(&self) -> bool {
        self.agent
    }
}

#[derive(Serialize, Deserialize)]
struct DeclarationRepr {
    name: String,
    description: String,
    parameters: ParametersRepr,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    agent: bool,
}

#[derive(Serialize, Deserialize)]
struct ParametersRepr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct PropertyRepr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<ItemsRepr>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct ItemsRepr {
    #[serde(rename = "type")]
    kind: String,
}

impl From<Declaration> for DeclarationRepr {
    fn from(declaration: Declaration) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for parameter in declaration.parameters {
            if parameter.required {
                required.push(parameter.name.clone());
            }
            let property = PropertyRepr {
                kind: parameter.schema_type().to_owned(),
                description: parameter.description,
                items: parameter.array.then(|| ItemsRepr {
                    kind: parameter.kind.as_str().to_owned(),
                }),
                choices: parameter.choices,
                default: parameter.default,
            };
            // PropertyRepr only holds strings and JSON values, so encoding is infallible.
            let value = serde_json::to_value(property).unwrap_or(Value::Null);
            properties.insert(parameter.name, value);
        }

        Self {
            name: declaration.name,
            description: declaration.description,
            parameters: ParametersRepr {
                kind: "object".into(),
                properties,
                required,
            },
            agent: declaration.agent,
        }
    }
}

impl TryFrom<DeclarationRepr> for Declaration {
    type Error = Error;

    fn try_from(repr: DeclarationRepr) -> Result<Self> {
        if repr.parameters.kind != "object" {
            return Err(Error::invalid_document(format!(
                "parameters of `{}` must have type `object`, found `{}`",
                repr.name, repr.parameters.kind
            )));
        }

        for name in &repr.parameters.required {
            if !repr.parameters.properties.contains_key(name) {
                return Err(Error::invalid_document(format!(
                    "`{}` requires undeclared parameter `{name}`",
                    repr.name
                )));
            }
        }

        let mut declaration = Declaration::new(repr.name, repr.description)?.with_agent(repr.agent);

        for (name, value) in repr.parameters.properties {
            let property: PropertyRepr = serde_json::from_value(value)?;
            let required = repr.parameters.required.contains(&name);
            let parameter = decode_property(name, property, required)?;
            declaration.push_parameter(parameter)?;
        }

        Ok(declaration)
    }
}

fn decode_property(name: String, property: PropertyRepr, required: bool) -> Result<ParameterSpec> {
    let unknown_type = |kind: &str| {
        Error::invalid_document(format!("parameter `{name}` has unsupported type `{kind}`"))
    };

    let (kind, array) = if property.kind == "array" {
        let items = property.items.as_ref().ok_or_else(|| {
            Error::invalid_document(format!("array parameter `{name}` is missing `items`"))
        })?;
        let kind =
            ParamKind::from_schema_type(&items.kind).ok_or_else(|| unknown_type(&items.kind))?;
        (kind, true)
    } else {
        let kind = ParamKind::from_schema_type(&property.kind)
            .ok_or_else(|| unknown_type(&property.kind))?;
        (kind, false)
    };

    let mut parameter = if kind == ParamKind::Boolean && !array {
        ParameterSpec::flag(name)?
    } else {
        ParameterSpec::option(name, kind)?.required(required).array(array)
    };
    parameter = parameter
        .with_description(property.description)
        .with_choices(property.choices);
    if let Some(default) = property.default {
        parameter = parameter.with_default(default);
    }
    Ok(parameter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo() -> Declaration {
        Declaration::new("echo", "Echo input")
            .unwrap()
            .with_parameter(
                ParameterSpec::option("text", ParamKind::String)
                    .unwrap()
                    .required(true)
                    .with_description("text to echo"),
            )
            .unwrap()
    }

    #[test]
    fn serializes_function_calling_shape() {
        let declaration = echo()
            .with_parameter(ParameterSpec::flag("loud").unwrap().with_description("shout"))
            .unwrap()
            .with_parameter(
                ParameterSpec::option("tags", ParamKind::String)
                    .unwrap()
                    .array(true),
            )
            .unwrap();

        let value = serde_json::to_value(&declaration).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "echo",
                "description": "Echo input",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string", "description": "text to echo" },
                        "loud": { "type": "boolean", "description": "shout" },
                        "tags": {
                            "type": "array",
                            "description": "",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["text"]
                }
            })
        );
    }

    #[test]
    fn round_trips_through_json() {
        let declaration = echo()
            .with_parameter(
                ParameterSpec::option("unit", ParamKind::String)
                    .unwrap()
                    .with_choices(vec!["c".into(), "f".into()])
                    .with_default(json!("c")),
            )
            .unwrap()
            .with_parameter(
                ParameterSpec::option("ids", ParamKind::Integer)
                    .unwrap()
                    .array(true)
                    .required(true),
            )
            .unwrap()
            .with_agent(true);

        let encoded = serde_json::to_string(&declaration).unwrap();
        let decoded: Declaration = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, declaration);
        let names: Vec<_> = decoded.parameters().iter().map(ParameterSpec::name).collect();
        assert_eq!(names, ["text", "unit", "ids"]);
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let err = echo()
            .with_parameter(ParameterSpec::flag("text").unwrap())
            .expect_err("duplicate should fail");
        assert!(matches!(
            err,
            Error::DuplicateParameter { declaration, parameter }
                if declaration == "echo" && parameter == "text"
        ));
    }

    #[test]
    fn rejects_blank_description() {
        let err = Declaration::new("echo", "  ").expect_err("blank description");
        assert!(matches!(err, Error::InvalidDeclaration { .. }));
    }

    #[test]
    fn flags_are_never_required() {
        let flag = ParameterSpec::flag("force").unwrap().required(true).array(true);
        assert!(!flag.is_required());
        assert!(!flag.is_array());
        assert_eq!(flag.kind(), ParamKind::Boolean);
    }

    #[test]
    fn rejects_required_undeclared_parameter() {
        let raw = json!({
            "name": "broken",
            "description": "Broken",
            "parameters": { "type": "object", "properties": {}, "required": ["ghost"] }
        });
        let err = serde_json::from_value::<Declaration>(raw).expect_err("should fail");
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn integer_kind_accepts_whole_numbers_only() {
        assert!(ParamKind::Integer.matches(&json!(3)));
        assert!(ParamKind::Integer.matches(&json!(3.0)));
        assert!(!ParamKind::Integer.matches(&json!(3.5)));
        assert!(!ParamKind::Integer.matches(&json!("3")));
        assert!(ParamKind::Number.matches(&json!(3.5)));
    }
}
