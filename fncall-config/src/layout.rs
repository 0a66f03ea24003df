//! Paths of a function repository.

use std::path::{Path, PathBuf};

use fncall_primitives::Language;

use crate::schema::FunctionsConfig;

/// Tool listing file name.
pub const TOOLS_LISTING: &str = "tools.txt";
/// Agent listing file name.
pub const AGENTS_LISTING: &str = "agents.txt";
/// Generated schema document file name.
pub const FUNCTIONS_FILE: &str = "functions.json";
/// Agent manifest file name.
pub const AGENT_MANIFEST: &str = "index.yaml";

/// Resolves every path the build and dispatch steps touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    cache_root: PathBuf,
}

impl Layout {
    /// Builds the layout for a loaded configuration.
    #[must_use]
    pub fn new(config: &FunctionsConfig) -> Self {
        Self {
            root: config.root().to_path_buf(),
            cache_root: config.cache_dir(),
        }
    }

    /// Repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `ROOT/tools.txt`.
    #[must_use]
    pub fn tools_listing(&self) -> PathBuf {
        self.root.join(TOOLS_LISTING)
    }

    /// `ROOT/tools`.
    #[must_use]
    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    /// `ROOT/tools/<file>` for a listing entry such as `get_weather.sh`.
    #[must_use]
    pub fn tool_file(&self, file: &str) -> PathBuf {
        self.tools_dir().join(file)
    }

    /// Candidate tool sources in probing order (`.sh`, `.js`, `.py`).
    pub fn tool_sources(&self, name: &str) -> impl Iterator<Item = (Language, PathBuf)> + '_ {
        let dir = self.tools_dir();
        let name = name.to_owned();
        Language::ALL
            .into_iter()
            .map(move |language| (language, dir.join(format!("{name}.{}", language.extension()))))
    }

    /// `ROOT/functions.json`.
    #[must_use]
    pub fn functions_path(&self) -> PathBuf {
        self.root.join(FUNCTIONS_FILE)
    }

    /// `ROOT/agents.txt`.
    #[must_use]
    pub fn agents_listing(&self) -> PathBuf {
        self.root.join(AGENTS_LISTING)
    }

    /// `ROOT/agents/<agent>`.
    #[must_use]
    pub fn agent_dir(&self, agent: &str) -> PathBuf {
        self.root.join("agents").join(agent)
    }

    /// `ROOT/agents/<agent>/index.yaml`.
    #[must_use]
    pub fn agent_manifest(&self, agent: &str) -> PathBuf {
        self.agent_dir(agent).join(AGENT_MANIFEST)
    }

    /// Candidate agent action sources in probing order.
    pub fn agent_sources(&self, agent: &str) -> impl Iterator<Item = (Language, PathBuf)> + '_ {
        let dir = self.agent_dir(agent);
        Language::ALL
            .into_iter()
            .map(move |language| (language, dir.join(format!("tools.{}", language.extension()))))
    }

    /// `ROOT/agents/<agent>/tools.txt`.
    #[must_use]
    pub fn agent_tools_listing(&self, agent: &str) -> PathBuf {
        self.agent_dir(agent).join(TOOLS_LISTING)
    }

    /// `ROOT/agents/<agent>/functions.json`.
    #[must_use]
    pub fn agent_functions_path(&self, agent: &str) -> PathBuf {
        self.agent_dir(agent).join(FUNCTIONS_FILE)
    }

    /// Cache root, `ROOT/cache` unless configured otherwise.
    #[must_use]
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// `cache/<name>` for a tool or agent.
    #[must_use]
    pub fn cache_dir(&self, name: &str) -> PathBuf {
        self.cache_root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_repository_paths() {
        let layout = Layout::new(&FunctionsConfig::new("/repo"));
        assert_eq!(layout.functions_path(), PathBuf::from("/repo/functions.json"));
        assert_eq!(
            layout.agent_functions_path("todo"),
            PathBuf::from("/repo/agents/todo/functions.json")
        );
        assert_eq!(layout.cache_dir("todo"), PathBuf::from("/repo/cache/todo"));
        assert_eq!(layout.tool_file("echo.sh"), PathBuf::from("/repo/tools/echo.sh"));
    }

    #[test]
    fn probes_sources_in_language_order() {
        let layout = Layout::new(&FunctionsConfig::new("/repo"));
        let tools: Vec<_> = layout.tool_sources("echo").map(|(_, path)| path).collect();
        assert_eq!(
            tools,
            [
                PathBuf::from("/repo/tools/echo.sh"),
                PathBuf::from("/repo/tools/echo.js"),
                PathBuf::from("/repo/tools/echo.py"),
            ]
        );
        let (language, path) = layout.agent_sources("todo").last().unwrap();
        assert_eq!(language, Language::Python);
        assert_eq!(path, PathBuf::from("/repo/agents/todo/tools.py"));
    }

    #[test]
    fn absolute_cache_dir_is_kept() {
        let config = FunctionsConfig::new("/repo").with_cache_dir("/var/cache/fncall");
        assert_eq!(
            Layout::new(&config).cache_dir("echo"),
            PathBuf::from("/var/cache/fncall/echo")
        );
    }
}
