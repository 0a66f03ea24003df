//! Agent metadata read from `agents/<name>/index.yaml`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Prefix of the environment bindings carrying agent variables.
const AGENT_VAR_PREFIX: &str = "LLM_AGENT_VAR_";

/// Human-authored description of an agent: identity, instructions and variables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentManifest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    instructions: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    variables: Vec<AgentVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conversation_starters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    documents: Vec<String>,
}

impl AgentManifest {
    /// Parses a manifest from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] when the text is not valid YAML for the
    /// manifest shape and [`Error::InvalidManifest`] when the name is empty or
    /// two variables share a name.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidManifest {
                reason: "manifest name cannot be empty".into(),
            });
        }
        for (index, variable) in self.variables.iter().enumerate() {
            if variable.name.trim().is_empty() {
                return Err(Error::InvalidManifest {
                    reason: format!("variable #{} has an empty name", index + 1),
                });
            }
            if self.variables[..index].iter().any(|v| v.name == variable.name) {
                return Err(Error::InvalidManifest {
                    reason: format!("variable `{}` is declared twice", variable.name),
                });
            }
        }
        Ok(())
    }

    /// Returns the agent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the optional version string.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the system instructions.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Returns the declared variables.
    #[must_use]
    pub fn variables(&self) -> &[AgentVariable] {
        &self.variables
    }

    /// Returns the suggested conversation starters.
    #[must_use]
    pub fn conversation_starters(&self) -> &[String] {
        &self.conversation_starters
    }

    /// Returns the documents attached to the agent.
    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }
}

/// Variable resolved at invocation time and exported to the agent's process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentVariable {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(
        default,
        deserialize_with = "deserialize_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    default: Option<String>,
}

impl AgentVariable {
    /// Returns the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns the environment variable name carrying this variable,
    /// e.g. `LLM_AGENT_VAR_API_BASE` for `api-base`.
    #[must_use]
    pub fn env_name(&self) -> String {
        let suffix: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{AGENT_VAR_PREFIX}{suffix}")
    }
}

fn deserialize_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(D::Error::custom("variable default must be a scalar")),
    }
}
