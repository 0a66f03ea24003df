//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use fncall_runtime::{InvocationRequest, TargetKind};
use serde_json::Value;
use thiserror::Error;

/// Argument errors detected after clap parsing.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The JSON argument did not parse.
    #[error("invalid JSON arguments: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// An agent call did not name an action.
    #[error("`run agent {agent}` needs an action name")]
    MissingAction {
        /// Agent name.
        agent: String,
    },

    /// More positionals than the target kind accepts.
    #[error("unexpected argument `{0}`")]
    Unexpected(String),

    /// `--var` was used on a tool call.
    #[error("--var only applies to agent calls")]
    VariablesOnTool,
}

#[derive(Parser, Debug)]
#[command(name = "fncall", version)]
#[command(about = "Build function declarations from commented scripts and run them")]
pub struct Cli {
    /// Repository root containing tools.txt, agents.txt, tools/ and agents/
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate every functions.json
    Build,
    /// Invoke one tool or agent action
    Run(RunArgs),
    /// Report missing environment variables, programs and files
    Check,
    /// List declarations from the built schema documents
    List(ListArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// A tool from tools.txt
    Tool,
    /// An agent from agents.txt
    Agent,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// What to invoke
    #[arg(value_enum)]
    pub target: Target,

    /// Tool or agent name
    pub name: String,

    /// Action name (agents only) followed by the JSON arguments
    #[arg(value_name = "ACTION|JSON", num_args = 0..=2)]
    pub rest: Vec<String>,

    /// Agent variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list the actions of this agent
    #[arg(long, value_name = "NAME")]
    pub agent: Option<String>,

    /// Print JSON instead of `name<TAB>description` lines
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Turns the positionals into a dispatcher request. Missing JSON means `{}`.
    pub fn into_request(self) -> Result<InvocationRequest, UsageError> {
        let mut rest = self.rest.into_iter();
        let kind = match self.target {
            Target::Tool => TargetKind::Tool,
            Target::Agent => TargetKind::Agent,
        };

        let action = match kind {
            TargetKind::Tool => None,
            TargetKind::Agent => Some(rest.next().ok_or_else(|| UsageError::MissingAction {
                agent: self.name.clone(),
            })?),
        };
        let arguments = match rest.next() {
            Some(json) => serde_json::from_str(&json).map_err(UsageError::InvalidJson)?,
            None => Value::Object(serde_json::Map::new()),
        };
        if let Some(extra) = rest.next() {
            return Err(UsageError::Unexpected(extra));
        }
        if kind == TargetKind::Tool && !self.variables.is_empty() {
            return Err(UsageError::VariablesOnTool);
        }

        Ok(InvocationRequest {
            kind,
            name: self.name,
            action,
            arguments,
            variables: self.variables.into_iter().collect(),
        })
    }
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_args(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Run(run) => run,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_defaults_to_empty_object() {
        let request = run_args(&["fncall", "run", "tool", "echo"]).into_request().unwrap();
        assert_eq!(request.kind, TargetKind::Tool);
        assert_eq!(request.name, "echo");
        assert_eq!(request.action, None);
        assert_eq!(request.arguments, json!({}));
    }

    #[test]
    fn agent_call_takes_action_json_and_variables() {
        let request = run_args(&[
            "fncall",
            "--root",
            "/repo",
            "run",
            "agent",
            "todo",
            "add_todo",
            r#"{"desc":"milk"}"#,
            "--var",
            "owner=ann=b",
        ])
        .into_request()
        .unwrap();
        assert_eq!(request.action.as_deref(), Some("add_todo"));
        assert_eq!(request.arguments, json!({ "desc": "milk" }));
        assert_eq!(request.variables["owner"], "ann=b");
    }

    #[test]
    fn usage_errors() {
        let err = run_args(&["fncall", "run", "agent", "todo"]).into_request().unwrap_err();
        assert!(matches!(err, UsageError::MissingAction { .. }));

        let err = run_args(&["fncall", "run", "tool", "echo", "{oops"]).into_request().unwrap_err();
        assert!(matches!(err, UsageError::InvalidJson(_)));

        let err = run_args(&["fncall", "run", "tool", "echo", "{}", "extra"])
            .into_request()
            .unwrap_err();
        assert!(matches!(err, UsageError::Unexpected(extra) if extra == "extra"));

        let parsed =
            Cli::try_parse_from(["fncall", "run", "agent", "todo", "x", "--var", "novalue"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli =
            Cli::try_parse_from(["fncall", "list", "--agent", "todo", "--json", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root, PathBuf::from("."));
        match cli.command {
            Command::List(list) => {
                assert_eq!(list.agent.as_deref(), Some("todo"));
                assert!(list.json);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }
}
