//! Per-invocation state: entry point, capture file and `LLM_*` bindings.

use std::io;
use std::path::{Path, PathBuf};

use fncall_config::Layout;
use fncall_primitives::Language;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{InvokeError, InvokeResult};

/// Source file and function a runner executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Language of the source file.
    pub language: Language,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Routed function for agent actions; `None` runs the tool entry function.
    pub function: Option<String>,
}

impl EntryPoint {
    /// Entry point of a standalone tool.
    #[must_use]
    pub fn tool(language: Language, path: impl Into<PathBuf>) -> Self {
        Self {
            language,
            path: path.into(),
            function: None,
        }
    }

    /// Entry point of an agent action routed to `function`.
    #[must_use]
    pub fn action(
        language: Language,
        path: impl Into<PathBuf>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            language,
            path: path.into(),
            function: Some(function.into()),
        }
    }

    /// Function the runtime calls: the routed action or the language's tool
    /// entry function (`main` for shell, `run` otherwise).
    #[must_use]
    pub fn function_name(&self) -> &str {
        self.function
            .as_deref()
            .unwrap_or_else(|| self.language.tool_entry_function())
    }
}

/// Empty file a child writes its authoritative result to (`LLM_OUTPUT`).
///
/// The file is named after a fresh UUID so concurrent invocations never
/// share one. Call [`CaptureFile::close`] once the child has exited; the
/// `Drop` impl removes the file if that did not happen.
#[derive(Debug)]
pub struct CaptureFile {
    path: PathBuf,
    removed: bool,
}

impl CaptureFile {
    /// Creates `fncall-<uuid>.out` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Io`] if the file cannot be created.
    pub async fn create(dir: &Path) -> InvokeResult<Self> {
        let path = dir.join(format!("fncall-{}.out", Uuid::new_v4()));
        fs::write(&path, b"")
            .await
            .map_err(|err| InvokeError::io(&path, err))?;
        debug!(path = %path.display(), "capture file created");
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Path exported as `LLM_OUTPUT`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads what the child wrote.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Io`] if the file cannot be read.
    pub async fn read(&self) -> InvokeResult<String> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|err| InvokeError::io(&self.path, err))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Removes the file.
    pub async fn close(mut self) {
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove capture file"
            ),
        }
    }
}

impl Drop for CaptureFile {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[derive(Debug)]
struct AgentScope {
    name: String,
    function: String,
    root_dir: PathBuf,
    cache_dir: PathBuf,
    variables: Vec<(String, String)>,
}

/// Environment and state built for one invocation.
#[derive(Debug)]
pub struct ExecutionContext {
    root: PathBuf,
    tool_name: String,
    tool_cache_dir: PathBuf,
    agent: Option<AgentScope>,
    capture: CaptureFile,
}

impl ExecutionContext {
    /// Context for a standalone tool. Creates `cache/<tool>` and a capture
    /// file under `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Io`] if a directory or the capture file cannot
    /// be created.
    pub async fn for_tool(layout: &Layout, tool: &str, temp_dir: &Path) -> InvokeResult<Self> {
        let tool_cache_dir = layout.cache_dir(tool);
        create_dir(&tool_cache_dir).await?;
        Ok(Self {
            root: layout.root().to_path_buf(),
            tool_name: tool.to_owned(),
            tool_cache_dir,
            agent: None,
            capture: CaptureFile::create(temp_dir).await?,
        })
    }

    /// Context for a call routed through `agent`.
    ///
    /// `function` is the declaration being called. For the agent's own
    /// actions (`own_action`) the tool cache is the agent cache; shared tools
    /// keep `cache/<tool>`. `variables` pairs each `LLM_AGENT_VAR_*` name with
    /// its resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Io`] if a directory or the capture file cannot
    /// be created.
    pub async fn for_agent(
        layout: &Layout,
        agent: &str,
        function: &str,
        own_action: bool,
        variables: Vec<(String, String)>,
        temp_dir: &Path,
    ) -> InvokeResult<Self> {
        let agent_cache_dir = layout.cache_dir(agent);
        create_dir(&agent_cache_dir).await?;
        let tool_cache_dir = if own_action {
            agent_cache_dir.clone()
        } else {
            let dir = layout.cache_dir(function);
            create_dir(&dir).await?;
            dir
        };
        Ok(Self {
            root: layout.root().to_path_buf(),
            tool_name: function.to_owned(),
            tool_cache_dir,
            agent: Some(AgentScope {
                name: agent.to_owned(),
                function: function.to_owned(),
                root_dir: layout.agent_dir(agent),
                cache_dir: agent_cache_dir,
                variables,
            }),
            capture: CaptureFile::create(temp_dir).await?,
        })
    }

    /// Capture file of this invocation.
    #[must_use]
    pub fn capture(&self) -> &CaptureFile {
        &self.capture
    }

    /// Consumes the context, keeping only the capture file.
    #[must_use]
    pub fn into_capture(self) -> CaptureFile {
        self.capture
    }

    /// Environment bindings exported to the child, in a stable order.
    #[must_use]
    pub fn env_bindings(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            ("LLM_ROOT_DIR".to_owned(), display(&self.root)),
            ("LLM_OUTPUT".to_owned(), display(self.capture.path())),
            ("LLM_TOOL_NAME".to_owned(), self.tool_name.clone()),
            ("LLM_TOOL_CACHE_DIR".to_owned(), display(&self.tool_cache_dir)),
        ];
        if let Some(agent) = &self.agent {
            vars.push(("LLM_AGENT_NAME".to_owned(), agent.name.clone()));
            vars.push(("LLM_AGENT_FUNC".to_owned(), agent.function.clone()));
            vars.push(("LLM_AGENT_ROOT_DIR".to_owned(), display(&agent.root_dir)));
            vars.push(("LLM_AGENT_CACHE_DIR".to_owned(), display(&agent.cache_dir)));
            vars.extend(agent.variables.iter().cloned());
        }
        vars
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

async fn create_dir(path: &Path) -> InvokeResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|err| InvokeError::io(path, err))
}
