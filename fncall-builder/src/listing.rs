//! Listing files (`tools.txt`, `agents.txt`) and source resolution.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use fncall_config::Layout;
use fncall_primitives::Language;
use tokio::fs;

use crate::error::{BuildError, BuildResult};

/// Splits listing content into entries, skipping blanks and `#` comments.
#[must_use]
pub fn parse_listing(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Reads a listing file. Returns `None` when the file does not exist.
///
/// # Errors
///
/// Propagates any I/O error other than `NotFound`.
pub async fn read_listing(path: &Path) -> io::Result<Option<Vec<String>>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(parse_listing(&content))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Tool name produced by a listing entry: `get_weather.sh` gives `get_weather`.
#[must_use]
pub fn entry_name(entry: &str) -> &str {
    Path::new(entry)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(entry)
}

pub(crate) async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

/// A tool listing entry resolved to its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSource {
    /// Tool name (file stem).
    pub name: String,
    /// Source language.
    pub language: Language,
    /// Source path under `ROOT/tools`.
    pub path: PathBuf,
}

/// Resolves a `tools.txt` entry such as `get_weather.sh` or `get_weather`.
///
/// Entries without an extension are probed in `.sh`, `.js`, `.py` order.
/// Errors are attributed to `artifact`.
///
/// # Errors
///
/// Returns [`BuildError::UnsupportedLanguage`] for unknown extensions and
/// [`BuildError::MissingSource`] when no file exists.
pub async fn resolve_tool(layout: &Layout, artifact: &str, entry: &str) -> BuildResult<ToolSource> {
    let file = Path::new(entry);
    let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
        return Err(BuildError::MissingSource {
            artifact: artifact.to_owned(),
            path: layout.tool_file(entry),
        });
    };

    if file.extension().is_some() {
        let path = layout.tool_file(entry);
        let language = Language::from_path(file).ok_or_else(|| BuildError::UnsupportedLanguage {
            artifact: artifact.to_owned(),
            path: path.clone(),
        })?;
        if !is_file(&path).await {
            return Err(BuildError::MissingSource {
                artifact: artifact.to_owned(),
                path,
            });
        }
        return Ok(ToolSource {
            name: stem.to_owned(),
            language,
            path,
        });
    }

    for (language, path) in layout.tool_sources(stem) {
        if is_file(&path).await {
            return Ok(ToolSource {
                name: stem.to_owned(),
                language,
                path,
            });
        }
    }
    Err(BuildError::MissingSource {
        artifact: artifact.to_owned(),
        path: layout.tool_file(&format!("{stem}.{}", Language::Shell.extension())),
    })
}

/// Resolves the source `listing` builds the tool `name` from.
///
/// The first entry whose [`entry_name`] is `name` wins, as it does during a
/// build. Returns `None` when the listing is absent or has no such entry.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when the listing cannot be read, otherwise the
/// errors of [`resolve_tool`].
pub async fn resolve_listed_tool(
    layout: &Layout,
    listing: &Path,
    name: &str,
) -> BuildResult<Option<ToolSource>> {
    let entries = read_listing(listing)
        .await
        .map_err(|err| BuildError::io(name, listing, err))?
        .unwrap_or_default();
    match entries.iter().find(|entry| entry_name(entry) == name) {
        Some(entry) => resolve_tool(layout, name, entry).await.map(Some),
        None => Ok(None),
    }
}

/// Finds the action source of an agent, if it has one.
pub async fn resolve_agent_source(layout: &Layout, agent: &str) -> Option<(Language, PathBuf)> {
    for (language, path) in layout.agent_sources(agent) {
        if is_file(&path).await {
            return Some((language, path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fncall_config::FunctionsConfig;

    #[test]
    fn skips_comments_and_blanks() {
        let entries = parse_listing("# tools\nget_weather.sh\n\n  echo.js  \n#disabled.py\n");
        assert_eq!(entries, ["get_weather.sh", "echo.js"]);
    }

    #[tokio::test]
    async fn missing_listing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_listing(&dir.path().join("tools.txt")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn resolves_entries_with_and_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(&FunctionsConfig::new(dir.path()));
        std::fs::create_dir_all(layout.tools_dir()).unwrap();
        std::fs::write(layout.tool_file("echo.py"), "").unwrap();

        let source = resolve_tool(&layout, "echo", "echo").await.unwrap();
        assert_eq!(source.language, Language::Python);
        assert_eq!(source.name, "echo");

        let source = resolve_tool(&layout, "echo", "echo.py").await.unwrap();
        assert_eq!(source.path, layout.tool_file("echo.py"));

        let err = resolve_tool(&layout, "echo", "echo.rb").await.expect_err("ruby");
        assert!(matches!(err, BuildError::UnsupportedLanguage { .. }));

        let err = resolve_tool(&layout, "gone", "gone.sh").await.expect_err("missing");
        assert!(matches!(err, BuildError::MissingSource { .. }));
    }

    #[tokio::test]
    async fn listed_extension_wins_over_probe_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(&FunctionsConfig::new(dir.path()));
        std::fs::create_dir_all(layout.tools_dir()).unwrap();
        std::fs::write(layout.tool_file("greet.sh"), "").unwrap();
        std::fs::write(layout.tool_file("greet.py"), "").unwrap();
        std::fs::write(layout.tools_listing(), "# tools\ngreet.py\n").unwrap();

        let source = resolve_listed_tool(&layout, &layout.tools_listing(), "greet")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.language, Language::Python);
        assert_eq!(source.path, layout.tool_file("greet.py"));

        let unlisted = resolve_listed_tool(&layout, &layout.tools_listing(), "other")
            .await
            .unwrap();
        assert_eq!(unlisted, None);
        let no_listing = resolve_listed_tool(&layout, &dir.path().join("none.txt"), "greet")
            .await
            .unwrap();
        assert_eq!(no_listing, None);
    }
}
