//! Repository readiness checks.
//!
//! [`Checker::run`] walks the same listings the builder reads and reports
//! everything that would make an invocation fail before the tool's own code
//! runs: unset required `@env` variables, programs named by
//! `@meta require-tools`, language runtimes that are not on `PATH`, missing
//! sources or manifests, and agent variables with no value.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use fncall_builder::{read_listing, resolve_agent_source, resolve_tool};
use fncall_config::{FunctionsConfig, Layout, Runtimes};
use fncall_parser::{ExtractMode, ParsedTag, extract_tags};
use fncall_primitives::{AgentManifest, Language};
use tokio::fs;
use tracing::debug;

use crate::env::EnvLookup;

const REQUIRE_TOOLS: &str = "require-tools";

/// What is wrong with a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// A required `@env` variable without default is unset.
    MissingEnv {
        /// Variable name.
        variable: String,
    },
    /// A program from `@meta require-tools` is not on `PATH`.
    MissingProgram {
        /// Program name.
        program: String,
    },
    /// The runtime for a language in use is not on `PATH`.
    MissingRuntime {
        /// Language whose sources need the runtime.
        language: Language,
        /// Configured program.
        program: String,
    },
    /// A listing entry, manifest or schema document does not exist.
    MissingFile {
        /// Path that was expected.
        path: PathBuf,
    },
    /// A source or manifest exists but cannot be used.
    Invalid {
        /// Offending file.
        path: PathBuf,
        /// Reason reported by the parser.
        reason: String,
    },
    /// An agent variable has no environment value and no default.
    UnresolvedVariable {
        /// Variable name from the manifest.
        variable: String,
        /// Environment variable consulted.
        env: String,
    },
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnv { variable } => {
                write!(f, "environment variable `{variable}` is not set")
            }
            Self::MissingProgram { program } => {
                write!(f, "required program `{program}` not found on PATH")
            }
            Self::MissingRuntime { language, program } => {
                write!(f, "{language} runtime `{program}` not found on PATH")
            }
            Self::MissingFile { path } => write!(f, "`{}` does not exist", path.display()),
            Self::Invalid { path, reason } => {
                write!(f, "`{}` is invalid: {reason}", path.display())
            }
            Self::UnresolvedVariable { variable, env } => {
                write!(f, "variable `{variable}` has no default and {env} is not set")
            }
        }
    }
}

/// One problem attributed to a tool, agent or runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// `tool <name>`, `agent <name>` or `runtime`.
    pub subject: String,
    /// The problem.
    pub kind: FindingKind,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.kind)
    }
}

/// Outcome of [`Checker::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    findings: Vec<Finding>,
}

impl CheckReport {
    /// All findings in discovery order.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Returns `true` when nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    fn push(&mut self, subject: &str, kind: FindingKind) {
        self.findings.push(Finding {
            subject: subject.to_owned(),
            kind,
        });
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        match self.findings.len() {
            0 => write!(f, "all checks passed"),
            1 => write!(f, "1 problem found"),
            n => write!(f, "{n} problems found"),
        }
    }
}

/// Inspects a repository without running any of its code.
#[derive(Debug, Clone)]
pub struct Checker {
    layout: Layout,
    runtimes: Runtimes,
    env: EnvLookup,
}

impl Checker {
    /// Creates a checker reading the process environment.
    #[must_use]
    pub fn new(config: &FunctionsConfig) -> Self {
        Self {
            layout: Layout::new(config),
            runtimes: config.runtimes().clone(),
            env: EnvLookup::process(),
        }
    }

    /// Replaces the environment consulted for `@env`, agent variables and
    /// `PATH`.
    #[must_use]
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Runs every check.
    pub async fn run(&self) -> CheckReport {
        let mut report = CheckReport::default();
        let mut languages = Vec::new();

        self.check_tools(&mut report, &mut languages).await;
        self.check_agents(&mut report, &mut languages).await;

        for language in Language::ALL {
            if !languages.contains(&language) {
                continue;
            }
            let program = self.runtimes.program(language);
            if !self.on_path(program).await {
                report.push(
                    "runtime",
                    FindingKind::MissingRuntime {
                        language,
                        program: program.to_owned(),
                    },
                );
            }
        }

        debug!(findings = report.findings.len(), "check finished");
        report
    }

    async fn check_tools(&self, report: &mut CheckReport, languages: &mut Vec<Language>) {
        let listing = self.layout.tools_listing();
        let entries = match read_listing(&listing).await {
            Ok(Some(entries)) => entries,
            Ok(None) => return,
            Err(err) => {
                report.push("tools", invalid(&listing, &err));
                return;
            }
        };

        if !entries.is_empty() && !is_file(&self.layout.functions_path()).await {
            report.push(
                "tools",
                FindingKind::MissingFile {
                    path: self.layout.functions_path(),
                },
            );
        }

        for entry in &entries {
            let subject = format!("tool {entry}");
            self.check_tool_entry(report, languages, &subject, entry).await;
        }
    }

    async fn check_tool_entry(
        &self,
        report: &mut CheckReport,
        languages: &mut Vec<Language>,
        subject: &str,
        entry: &str,
    ) {
        match resolve_tool(&self.layout, entry, entry).await {
            Ok(tool) => {
                self.check_source(report, subject, tool.language, &tool.path, ExtractMode::Tool)
                    .await;
                remember(languages, tool.language);
            }
            Err(err) => report.push(
                subject,
                FindingKind::MissingFile {
                    path: err.path().to_path_buf(),
                },
            ),
        }
    }

    async fn check_agents(&self, report: &mut CheckReport, languages: &mut Vec<Language>) {
        let listing = self.layout.agents_listing();
        let agents = match read_listing(&listing).await {
            Ok(Some(agents)) => agents,
            Ok(None) => return,
            Err(err) => {
                report.push("agents", invalid(&listing, &err));
                return;
            }
        };

        for agent in &agents {
            let subject = format!("agent {agent}");
            self.check_manifest(report, &subject, agent).await;

            if let Some((language, path)) = resolve_agent_source(&self.layout, agent).await {
                self.check_source(report, &subject, language, &path, ExtractMode::Agent)
                    .await;
                remember(languages, language);
            }

            let shared_listing = self.layout.agent_tools_listing(agent);
            match read_listing(&shared_listing).await {
                Ok(shared) => {
                    for entry in shared.unwrap_or_default() {
                        self.check_tool_entry(report, languages, &subject, &entry).await;
                    }
                }
                Err(err) => report.push(&subject, invalid(&shared_listing, &err)),
            }

            let document = self.layout.agent_functions_path(agent);
            if !is_file(&document).await {
                report.push(&subject, FindingKind::MissingFile { path: document });
            }
        }
    }

    async fn check_manifest(&self, report: &mut CheckReport, subject: &str, agent: &str) {
        let path = self.layout.agent_manifest(agent);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                report.push(subject, FindingKind::MissingFile { path });
                return;
            }
            Err(err) => {
                report.push(subject, invalid(&path, &err));
                return;
            }
        };
        let manifest = match AgentManifest::from_yaml_str(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                report.push(subject, invalid(&path, &err));
                return;
            }
        };

        for variable in manifest.variables() {
            let env = variable.env_name();
            if variable.default_value().is_none() && self.env.get(&env).is_none() {
                report.push(
                    subject,
                    FindingKind::UnresolvedVariable {
                        variable: variable.name().to_owned(),
                        env,
                    },
                );
            }
        }
    }

    async fn check_source(
        &self,
        report: &mut CheckReport,
        subject: &str,
        language: Language,
        path: &Path,
        mode: ExtractMode,
    ) {
        let source = match fs::read_to_string(path).await {
            Ok(source) => source,
            Err(err) => {
                report.push(subject, invalid(path, &err));
                return;
            }
        };
        let tags = match extract_tags(language, &source, mode) {
            Ok(tags) => tags,
            Err(err) => {
                report.push(subject, invalid(path, &err));
                return;
            }
        };

        for raw in tags.all_tags() {
            match raw.parse() {
                Ok(ParsedTag::Env(env)) => {
                    if env.required && env.default.is_none() && self.env.get(&env.name).is_none() {
                        report.push(subject, FindingKind::MissingEnv { variable: env.name });
                    }
                }
                Ok(ParsedTag::Meta(meta)) if meta.key == REQUIRE_TOOLS => {
                    for program in meta.values {
                        if !self.on_path(&program).await {
                            report.push(subject, FindingKind::MissingProgram { program });
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => report.push(subject, invalid(path, &err)),
            }
        }
    }

    /// Looks `program` up like a shell would: paths containing `/` are
    /// checked directly, bare names against every `PATH` entry.
    async fn on_path(&self, program: &str) -> bool {
        if program.contains('/') {
            return is_executable(Path::new(program)).await;
        }
        let Some(path_var) = self.env.get("PATH") else {
            return false;
        };
        for dir in std::env::split_paths(&path_var) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            if is_executable(&dir.join(program)).await {
                return true;
            }
        }
        false
    }
}

fn remember(languages: &mut Vec<Language>, language: Language) {
    if !languages.contains(&language) {
        languages.push(language);
    }
}

fn invalid(path: &Path, err: &dyn std::error::Error) -> FindingKind {
    FindingKind::Invalid {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

async fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path).await else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn executable(dir: &Path, name: &str) {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn reports_missing_requirements() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        executable(bin.path(), "bash");
        executable(bin.path(), "jq");
        write(root.path(), "tools.txt", "weather.sh\nghost.sh\n");
        write(
            root.path(),
            "tools/weather.sh",
            "# @describe Weather\n\
             # @env API_KEY! Service key\n\
             # @env UNITS=metric\n\
             # @meta require-tools jq curl\n\
             main() { :; }\n",
        );
        write(root.path(), "functions.json", "[]\n");

        let env = EnvLookup::from_pairs([("PATH", bin.path().display().to_string())]);
        let report = Checker::new(&FunctionsConfig::new(root.path()))
            .with_env(env)
            .run()
            .await;

        let kinds: Vec<_> = report.findings().iter().map(|f| &f.kind).collect();
        assert_eq!(kinds.len(), 3, "{report}");
        assert_eq!(
            kinds[0],
            &FindingKind::MissingEnv {
                variable: "API_KEY".into()
            }
        );
        assert_eq!(
            kinds[1],
            &FindingKind::MissingProgram {
                program: "curl".into()
            }
        );
        assert!(matches!(
            kinds[2],
            FindingKind::MissingFile { path } if path.ends_with("tools/ghost.sh")
        ));
        assert_eq!(report.findings()[0].subject, "tool weather.sh");
        assert!(report.to_string().ends_with("3 problems found"));
    }

    #[tokio::test]
    async fn reports_runtimes_and_agent_variables() {
        let root = tempfile::tempdir().unwrap();
        write(root.path(), "agents.txt", "todo\n");
        write(
            root.path(),
            "agents/todo/index.yaml",
            r"name: todo
description: Todos
variables:
  - name: owner
    description: Owner
  - name: limit
    description: Max
    default: 10
",
        );
        write(root.path(), "agents/todo/tools.sh", "# @cmd Add\nadd() { :; }\n");
        write(root.path(), "agents/todo/functions.json", "[]\n");

        let report = Checker::new(&FunctionsConfig::new(root.path()))
            .with_env(EnvLookup::from_pairs([("PATH", "")]))
            .run()
            .await;
        assert_eq!(
            report.findings(),
            [
                Finding {
                    subject: "agent todo".into(),
                    kind: FindingKind::UnresolvedVariable {
                        variable: "owner".into(),
                        env: "LLM_AGENT_VAR_OWNER".into(),
                    },
                },
                Finding {
                    subject: "runtime".into(),
                    kind: FindingKind::MissingRuntime {
                        language: Language::Shell,
                        program: "bash".into(),
                    },
                },
            ]
        );

        let bin = tempfile::tempdir().unwrap();
        executable(bin.path(), "bash");
        let report = Checker::new(&FunctionsConfig::new(root.path()))
            .with_env(EnvLookup::from_pairs([
                ("PATH", bin.path().display().to_string()),
                ("LLM_AGENT_VAR_OWNER", "me".to_owned()),
            ]))
            .run()
            .await;
        assert!(report.is_clean(), "{report}");
        assert_eq!(report.to_string(), "all checks passed");
    }

    #[tokio::test]
    async fn empty_repository_passes() {
        let root = tempfile::tempdir().unwrap();
        let report = Checker::new(&FunctionsConfig::new(root.path()))
            .with_env(EnvLookup::from_pairs(Vec::<(String, String)>::new()))
            .run()
            .await;
        assert!(report.is_clean());
    }
}
