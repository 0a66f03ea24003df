//! Invocation dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use fncall_builder::{BuildError, resolve_agent_source, resolve_listed_tool};
use fncall_config::{FunctionsConfig, Layout, Runtimes};
use fncall_primitives::{AgentManifest, Declaration, SchemaDocument};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::context::{EntryPoint, ExecutionContext};
use crate::env::EnvLookup;
use crate::error::{InvokeError, InvokeResult};
use crate::runner::runner_for;
use crate::validate::validate;

/// Kind of target a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A tool listed in `ROOT/functions.json`.
    Tool,
    /// An action (or shared tool) of an agent.
    Agent,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => f.write_str("tool"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

/// One call to a tool or agent action.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Target kind.
    pub kind: TargetKind,
    /// Tool or agent name.
    pub name: String,
    /// Action name; required for agents.
    pub action: Option<String>,
    /// JSON arguments; `null` is treated as `{}`.
    pub arguments: Value,
    /// Caller-supplied agent variables keyed by manifest name.
    pub variables: HashMap<String, String>,
}

impl InvocationRequest {
    /// Request for a standalone tool.
    #[must_use]
    pub fn tool(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            kind: TargetKind::Tool,
            name: name.into(),
            action: None,
            arguments,
            variables: HashMap::new(),
        }
    }

    /// Request for an agent action.
    #[must_use]
    pub fn agent(name: impl Into<String>, action: impl Into<String>, arguments: Value) -> Self {
        Self {
            kind: TargetKind::Agent,
            name: name.into(),
            action: Some(action.into()),
            arguments,
            variables: HashMap::new(),
        }
    }

    /// Adds a caller-supplied agent variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// `tool` or `agent.action`, used in messages and logs.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match (&self.kind, &self.action) {
            (TargetKind::Agent, Some(action)) => format!("{}.{action}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Capture file content when non-empty, otherwise the child's stdout.
    pub output: String,
    /// Child exit status (always 0 here; failures become errors).
    pub exit_status: i32,
}

/// Resolves, validates and executes invocation requests.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    layout: Layout,
    runtimes: Runtimes,
    env: EnvLookup,
    temp_dir: PathBuf,
}

impl Dispatcher {
    /// Creates a dispatcher reading the process environment and placing
    /// capture files in the system temporary directory.
    #[must_use]
    pub fn new(config: &FunctionsConfig) -> Self {
        Self {
            layout: Layout::new(config),
            runtimes: config.runtimes().clone(),
            env: EnvLookup::process(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Replaces the environment used to resolve agent variables.
    #[must_use]
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Places capture files under `dir`.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Layout the dispatcher resolves paths with.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Runs one invocation to completion.
    ///
    /// Validation and resolution failures short-circuit before anything is
    /// spawned. The capture file is removed once the child has exited.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`]; see [`InvokeError::exit_code`] for how each
    /// variant maps to a process status.
    pub async fn invoke(&self, request: &InvocationRequest) -> InvokeResult<InvocationOutput> {
        let qualified = request.qualified_name();
        let (document_path, lookup, what) = match request.kind {
            TargetKind::Tool => (self.layout.functions_path(), request.name.as_str(), "tool"),
            TargetKind::Agent => {
                let action = request.action.as_deref().ok_or_else(|| InvokeError::MissingAction {
                    agent: request.name.clone(),
                })?;
                (self.layout.agent_functions_path(&request.name), action, "action")
            }
        };

        let document = load_document(&document_path).await?;
        let declaration = document
            .get(lookup)
            .ok_or_else(|| InvokeError::not_found(what, qualified.clone()))?;
        let args = validate(declaration, &request.arguments).map_err(|source| {
            InvokeError::Validation {
                name: qualified.clone(),
                source,
            }
        })?;

        let entry = self.entry_point(request, declaration).await?;
        let context = match request.kind {
            TargetKind::Tool => {
                ExecutionContext::for_tool(&self.layout, &request.name, &self.temp_dir).await?
            }
            TargetKind::Agent => {
                let variables = self.agent_variables(request).await?;
                ExecutionContext::for_agent(
                    &self.layout,
                    &request.name,
                    declaration.name(),
                    declaration.is_agent_action(),
                    variables,
                    &self.temp_dir,
                )
                .await?
            }
        };

        info!(call = %qualified, language = %entry.language, "invoking");
        let runner = runner_for(entry.language, &self.runtimes);
        let outcome = runner.run(&entry, &args, &context).await;
        let capture = context.into_capture();

        let result = match outcome {
            Ok(process) if process.success() => capture.read().await.map(|captured| {
                let output = if captured.is_empty() {
                    process.stdout
                } else {
                    captured
                };
                InvocationOutput {
                    output,
                    exit_status: 0,
                }
            }),
            Ok(process) => {
                warn!(call = %qualified, exit_code = process.exit_code, "invocation failed");
                Err(InvokeError::Execution {
                    name: qualified.clone(),
                    exit_code: process.exit_code,
                    stderr: process.stderr,
                })
            }
            Err(err) => Err(err),
        };
        capture.close().await;

        if result.is_ok() {
            info!(call = %qualified, "invocation finished");
        }
        result
    }

    /// Agent actions run from the agent's own source. Tools and shared agent
    /// tools run from the file their listing entry names, the one the
    /// declaration was built from.
    async fn entry_point(
        &self,
        request: &InvocationRequest,
        declaration: &Declaration,
    ) -> InvokeResult<EntryPoint> {
        if request.kind == TargetKind::Agent && declaration.is_agent_action() {
            let (language, path) = resolve_agent_source(&self.layout, &request.name)
                .await
                .ok_or_else(|| InvokeError::not_found("agent source", request.name.clone()))?;
            return Ok(EntryPoint::action(language, path, declaration.name()));
        }

        let listing = match request.kind {
            TargetKind::Tool => self.layout.tools_listing(),
            TargetKind::Agent => self.layout.agent_tools_listing(&request.name),
        };
        let source = resolve_listed_tool(&self.layout, &listing, declaration.name())
            .await
            .map_err(|err| match err {
                BuildError::Io { path, source, .. } => InvokeError::io(path, source),
                _ => InvokeError::not_found("tool source", declaration.name()),
            })?
            .ok_or_else(|| InvokeError::not_found("tool source", declaration.name()))?;
        debug!(tool = %source.name, path = %source.path.display(), "tool source resolved");
        Ok(EntryPoint::tool(source.language, source.path))
    }

    /// Resolves every manifest variable from the request, then the
    /// environment, then its default.
    async fn agent_variables(
        &self,
        request: &InvocationRequest,
    ) -> InvokeResult<Vec<(String, String)>> {
        let path = self.layout.agent_manifest(&request.name);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(InvokeError::not_found("agent", request.name.clone()));
            }
            Err(err) => return Err(InvokeError::io(path, err)),
        };
        let manifest = AgentManifest::from_yaml_str(&content)
            .map_err(|source| InvokeError::Manifest { path, source })?;

        let mut resolved = Vec::with_capacity(manifest.variables().len());
        for variable in manifest.variables() {
            let env_name = variable.env_name();
            let value = request
                .variables
                .get(variable.name())
                .cloned()
                .or_else(|| self.env.get(&env_name))
                .or_else(|| variable.default_value().map(str::to_owned))
                .ok_or_else(|| InvokeError::MissingAgentVariable {
                    agent: request.name.clone(),
                    variable: variable.name().to_owned(),
                    env: env_name.clone(),
                })?;
            resolved.push((env_name, value));
        }
        debug!(agent = %request.name, variables = resolved.len(), "agent variables resolved");
        Ok(resolved)
    }
}

async fn load_document(path: &Path) -> InvokeResult<SchemaDocument> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(InvokeError::SchemaUnavailable {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(InvokeError::io(path, err)),
    };
    SchemaDocument::from_json_str(&content).map_err(|source| InvokeError::Document {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn qualified_names() {
        assert_eq!(InvocationRequest::tool("echo", Value::Null).qualified_name(), "echo");
        assert_eq!(
            InvocationRequest::agent("todo", "add_todo", json!({})).qualified_name(),
            "todo.add_todo"
        );
    }

    #[tokio::test]
    async fn missing_document_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(&FunctionsConfig::new(dir.path()));

        let err = dispatcher
            .invoke(&InvocationRequest::tool("echo", json!({})))
            .await
            .expect_err("no document");
        assert!(matches!(err, InvokeError::SchemaUnavailable { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }

    #[tokio::test]
    async fn agent_request_needs_action() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(&FunctionsConfig::new(dir.path()));
        let mut request = InvocationRequest::agent("todo", "x", json!({}));
        request.action = None;

        let err = dispatcher.invoke(&request).await.expect_err("no action");
        assert!(matches!(err, InvokeError::MissingAction { agent } if agent == "todo"));
    }
}
