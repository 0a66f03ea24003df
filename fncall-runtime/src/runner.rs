//! Language runners: one child process per invocation.
//!
//! Every runner turns an [`EntryPoint`] plus [`ValidatedArgs`] into a command
//! line for its runtime. Shell tools receive `--option value` arguments;
//! JavaScript and Python entry points are loaded by a small bootstrap that
//! calls the target function with the JSON arguments and prints a non-null
//! return value.

use std::process::Stdio;

use async_trait::async_trait;
use fncall_config::Runtimes;
use fncall_primitives::Language;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::context::{EntryPoint, ExecutionContext};
use crate::error::{InvokeError, InvokeResult};
use crate::validate::ValidatedArgs;

const NODE_BOOTSTRAP: &str = r#"const { pathToFileURL } = require("node:url");
(async () => {
  const [entry, func, raw] = process.argv.slice(1);
  const mod = await import(pathToFileURL(entry).href);
  const target = mod[func] ?? mod.default?.[func];
  if (typeof target !== "function") {
    console.error(`function \`${func}\` not found in ${entry}`);
    process.exit(1);
  }
  const result = await target(JSON.parse(raw));
  if (result !== undefined && result !== null) {
    process.stdout.write(typeof result === "string" ? result : JSON.stringify(result, null, 2));
  }
})().catch((err) => {
  console.error(err && err.stack ? err.stack : String(err));
  process.exit(1);
});
"#;

const PYTHON_BOOTSTRAP: &str = r#"import asyncio
import importlib.util
import inspect
import json
import os
import sys
import traceback


def main():
    entry, func, raw = sys.argv[1:4]
    sys.path.insert(0, os.path.dirname(entry))
    spec = importlib.util.spec_from_file_location("fncall_entry", entry)
    module = importlib.util.module_from_spec(spec)
    spec.loader.exec_module(module)
    target = getattr(module, func, None)
    if not callable(target):
        print(f"function `{func}` not found in {entry}", file=sys.stderr)
        return 1
    result = target(**json.loads(raw))
    if inspect.iscoroutine(result):
        result = asyncio.run(result)
    if result is not None:
        if isinstance(result, str):
            sys.stdout.write(result)
        else:
            sys.stdout.write(json.dumps(result, ensure_ascii=False, indent=2))
    return 0


try:
    code = main()
except Exception:
    traceback.print_exc()
    code = 1
sys.exit(code)
"#;

/// Exit status and captured streams of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status; 1 when the child was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns `true` for a zero exit status.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Launches one language runtime.
#[async_trait]
pub trait LanguageRunner: Send + Sync {
    /// Language handled by this runner.
    fn language(&self) -> Language;

    /// Program that is spawned.
    fn program(&self) -> &str;

    /// Arguments passed to [`LanguageRunner::program`].
    fn command_args(&self, entry: &EntryPoint, args: &ValidatedArgs) -> Vec<String>;

    /// Spawns the runtime and waits for it to exit.
    ///
    /// Stdin is closed, stdout and stderr are captured, and the context's
    /// environment bindings are added to the inherited environment.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Spawn`] when the program cannot be started or
    /// waited on. A non-zero exit is not an error at this level.
    async fn run(
        &self,
        entry: &EntryPoint,
        args: &ValidatedArgs,
        context: &ExecutionContext,
    ) -> InvokeResult<ProcessOutput> {
        let argv = self.command_args(entry, args);
        debug!(
            program = %self.program(),
            language = %self.language(),
            entry = %entry.path.display(),
            function = %entry.function_name(),
            "spawning runtime"
        );

        let mut command = Command::new(self.program());
        command
            .args(&argv)
            .envs(context.env_bindings())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await.map_err(|source| InvokeError::Spawn {
            program: self.program().to_owned(),
            source,
        })?;
        let exit_code = output.status.code().unwrap_or(1);
        debug!(program = %self.program(), exit_code, "runtime exited");

        Ok(ProcessOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs `.sh` entry points through `bash ENTRY [ACTION] --opt value ...`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    program: String,
}

impl ShellRunner {
    /// Creates a runner for the given shell program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl LanguageRunner for ShellRunner {
    fn language(&self) -> Language {
        Language::Shell
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, entry: &EntryPoint, args: &ValidatedArgs) -> Vec<String> {
        let mut argv = vec![entry.path.display().to_string()];
        if let Some(function) = &entry.function {
            argv.push(function.clone());
        }
        argv.extend(shell_options(args));
        argv
    }
}

/// Runs `.js` entry points through `node -e BOOTSTRAP ENTRY FUNCTION JSON`.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    program: String,
}

impl NodeRunner {
    /// Creates a runner for the given Node.js program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl LanguageRunner for NodeRunner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, entry: &EntryPoint, args: &ValidatedArgs) -> Vec<String> {
        bootstrap_args(NODE_BOOTSTRAP, "-e", entry, args)
    }
}

/// Runs `.py` entry points through `python3 -c BOOTSTRAP ENTRY FUNCTION JSON`.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    program: String,
}

impl PythonRunner {
    /// Creates a runner for the given Python program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl LanguageRunner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, entry: &EntryPoint, args: &ValidatedArgs) -> Vec<String> {
        bootstrap_args(PYTHON_BOOTSTRAP, "-c", entry, args)
    }
}

/// Returns the runner for `language` using the configured program names.
#[must_use]
pub fn runner_for(language: Language, runtimes: &Runtimes) -> Box<dyn LanguageRunner> {
    let program = runtimes.program(language);
    match language {
        Language::Shell => Box::new(ShellRunner::new(program)),
        Language::JavaScript => Box::new(NodeRunner::new(program)),
        Language::Python => Box::new(PythonRunner::new(program)),
    }
}

fn bootstrap_args(
    script: &str,
    flag: &str,
    entry: &EntryPoint,
    args: &ValidatedArgs,
) -> Vec<String> {
    vec![
        flag.to_owned(),
        script.to_owned(),
        entry.path.display().to_string(),
        entry.function_name().to_owned(),
        Value::Object(args.as_map().clone()).to_string(),
    ]
}

/// Renders arguments as `--name value` pairs. Array values repeat the
/// option, `true` becomes a bare flag and `false`/`null` are omitted.
fn shell_options(args: &ValidatedArgs) -> Vec<String> {
    let mut argv = Vec::new();
    for (name, value) in args.iter() {
        let option = format!("--{}", name.replace('_', "-"));
        match value {
            Value::Array(items) => {
                for item in items {
                    push_option(&mut argv, &option, item);
                }
            }
            other => push_option(&mut argv, &option, other),
        }
    }
    argv
}

fn push_option(argv: &mut Vec<String>, option: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => argv.push(option.to_owned()),
        Value::String(text) => {
            argv.push(option.to_owned());
            argv.push(text.clone());
        }
        other => {
            argv.push(option.to_owned());
            argv.push(other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fncall_primitives::{Declaration, ParamKind, ParameterSpec};
    use serde_json::json;

    fn args(value: Value) -> ValidatedArgs {
        let declaration = Declaration::new("search", "Search")
            .unwrap()
            .with_parameter(
                ParameterSpec::option("file_path", ParamKind::String)
                    .unwrap()
                    .array(true),
            )
            .unwrap()
            .with_parameter(ParameterSpec::flag("dry_run").unwrap())
            .unwrap()
            .with_parameter(ParameterSpec::option("limit", ParamKind::Integer).unwrap())
            .unwrap();
        crate::validate::validate(&declaration, &value).unwrap()
    }

    #[test]
    fn shell_arguments_follow_option_grammar() {
        let runner = ShellRunner::new("bash");
        let entry = EntryPoint::tool(Language::Shell, "/repo/tools/search.sh");

        let argv = runner.command_args(
            &entry,
            &args(json!({ "file_path": ["a.txt", "b c.txt"], "limit": 5, "note": null })),
        );
        assert_eq!(
            argv,
            [
                "/repo/tools/search.sh",
                "--file-path",
                "a.txt",
                "--file-path",
                "b c.txt",
                "--limit",
                "5",
            ]
        );

        let argv = runner.command_args(&entry, &args(json!({ "dry_run": true })));
        assert_eq!(argv, ["/repo/tools/search.sh", "--dry-run"]);
    }

    #[test]
    fn shell_actions_are_routed() {
        let runner = ShellRunner::new("bash");
        let entry = EntryPoint::action(Language::Shell, "/repo/agents/todo/tools.sh", "add_todo");
        let argv = runner.command_args(&entry, &args(json!({})));
        assert_eq!(argv, ["/repo/agents/todo/tools.sh", "add_todo"]);
    }

    #[test]
    fn bootstraps_receive_entry_function_and_json() {
        let runner = PythonRunner::new("python3");
        let entry = EntryPoint::tool(Language::Python, "/repo/tools/search.py");
        let argv = runner.command_args(&entry, &args(json!({ "limit": 2 })));

        assert_eq!(argv[0], "-c");
        assert_eq!(argv[2], "/repo/tools/search.py");
        assert_eq!(argv[3], "run");
        let payload: Value = serde_json::from_str(&argv[4]).unwrap();
        assert_eq!(payload, json!({ "dry_run": false, "limit": 2 }));

        let node = NodeRunner::new("node");
        let entry = EntryPoint::action(Language::JavaScript, "/repo/agents/a/tools.js", "go");
        let argv = node.command_args(&entry, &args(json!({})));
        assert_eq!(argv[0], "-e");
        assert_eq!(argv[3], "go");
    }

    #[test]
    fn runner_uses_configured_program() {
        let runtimes = Runtimes {
            python: "python3.12".into(),
            ..Runtimes::default()
        };
        let runner = runner_for(Language::Python, &runtimes);
        assert_eq!(runner.program(), "python3.12");
        assert_eq!(runner.language(), Language::Python);
        assert_eq!(runner_for(Language::Shell, &runtimes).program(), "bash");
    }
}
