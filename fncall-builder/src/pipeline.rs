//! Build pipeline over the repository listings.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use fncall_config::Layout;
use fncall_config::layout::{AGENTS_LISTING, TOOLS_LISTING};
use fncall_parser::ExtractMode;
use fncall_primitives::{AgentManifest, Declaration, SchemaDocument};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::declaration::declarations_from_source;
use crate::error::{BuildError, BuildResult, DeclarationError};
use crate::listing::{entry_name, read_listing, resolve_agent_source, resolve_tool};
use crate::report::{ArtifactKind, BuildReport, BuiltArtifact};

/// Regenerates every schema document of a repository.
#[derive(Debug, Clone)]
pub struct Builder {
    layout: Layout,
}

impl Builder {
    /// Creates a builder for the given layout.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Returns the layout the builder reads from and writes to.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Builds the tool document, then every listed agent.
    pub async fn build_all(&self) -> BuildReport {
        let mut report = BuildReport::new();
        self.build_tools(&mut report).await;
        self.build_agents(&mut report).await;
        info!(
            built = report.built().len(),
            failed = report.failed().len(),
            "build finished"
        );
        report
    }

    /// Builds `ROOT/functions.json` from `tools.txt`.
    ///
    /// Failing tools are recorded and left out of the document. Nothing is
    /// written when `tools.txt` does not exist.
    pub async fn build_tools(&self, report: &mut BuildReport) {
        let listing = self.layout.tools_listing();
        let entries = match read_listing(&listing).await {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(path = %listing.display(), "no tool listing");
                return;
            }
            Err(err) => {
                report.record_failed(
                    ArtifactKind::Tool,
                    BuildError::io(TOOLS_LISTING, &listing, err),
                );
                return;
            }
        };

        let document_path = self.layout.functions_path();
        let mut document = SchemaDocument::new();
        let mut built = Vec::new();

        for entry in &entries {
            let artifact = entry_name(entry);
            let outcome = match self.tool_declaration(artifact, entry).await {
                Ok((declaration, path)) => insert(&mut document, artifact, &path, declaration),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => {
                    info!(tool = %artifact, "declaration built");
                    built.push(BuiltArtifact {
                        kind: ArtifactKind::Tool,
                        name: artifact.to_owned(),
                        declarations: 1,
                        document: document_path.clone(),
                    });
                }
                Err(err) => {
                    warn!(tool = %artifact, error = %err, "tool skipped");
                    report.record_failed(ArtifactKind::Tool, err);
                }
            }
        }

        let file_name = document_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_owned();
        match write_document(&file_name, &document_path, &document).await {
            Ok(()) => built.into_iter().for_each(|artifact| report.record_built(artifact)),
            Err(err) => report.record_failed(ArtifactKind::Tool, err),
        }
    }

    /// Builds every agent listed in `agents.txt`.
    pub async fn build_agents(&self, report: &mut BuildReport) {
        let listing = self.layout.agents_listing();
        let agents = match read_listing(&listing).await {
            Ok(Some(agents)) => agents,
            Ok(None) => {
                debug!(path = %listing.display(), "no agent listing");
                return;
            }
            Err(err) => {
                report.record_failed(
                    ArtifactKind::Agent,
                    BuildError::io(AGENTS_LISTING, &listing, err),
                );
                return;
            }
        };

        for agent in &agents {
            match self.build_agent(agent).await {
                Ok(artifact) => {
                    info!(agent = %agent, declarations = artifact.declarations, "agent built");
                    report.record_built(artifact);
                }
                Err(err) => {
                    warn!(agent = %agent, error = %err, "agent skipped");
                    self.remove_stale_document(agent).await;
                    report.record_failed(ArtifactKind::Agent, err);
                }
            }
        }
    }

    /// Builds `agents/<agent>/functions.json`: the agent's own actions in
    /// source order followed by its shared tools in listing order.
    ///
    /// # Errors
    ///
    /// Returns the first error; nothing is written in that case.
    pub async fn build_agent(&self, agent: &str) -> BuildResult<BuiltArtifact> {
        let manifest_path = self.layout.agent_manifest(agent);
        let manifest = fs::read_to_string(&manifest_path)
            .await
            .map_err(|err| BuildError::io(agent, &manifest_path, err))?;
        let manifest =
            AgentManifest::from_yaml_str(&manifest).map_err(|source| BuildError::Manifest {
                artifact: agent.to_owned(),
                path: manifest_path.clone(),
                source,
            })?;
        debug!(agent = %agent, variables = manifest.variables().len(), "manifest loaded");

        let mut document = SchemaDocument::new();

        if let Some((language, path)) = resolve_agent_source(&self.layout, agent).await {
            let source = fs::read_to_string(&path)
                .await
                .map_err(|err| BuildError::io(agent, &path, err))?;
            let declarations =
                declarations_from_source(agent, language, &source, ExtractMode::Agent)
                    .map_err(|err| BuildError::declaration(agent, &path, err))?;
            for declaration in declarations {
                insert(&mut document, agent, &path, declaration)?;
            }
        }

        let shared_listing = self.layout.agent_tools_listing(agent);
        let shared = read_listing(&shared_listing)
            .await
            .map_err(|err| BuildError::io(agent, &shared_listing, err))?
            .unwrap_or_default();
        for entry in &shared {
            let (declaration, path) = self.tool_declaration(agent, entry).await?;
            insert(&mut document, agent, &path, declaration)?;
        }

        let document_path = self.layout.agent_functions_path(agent);
        write_document(agent, &document_path, &document).await?;
        Ok(BuiltArtifact {
            kind: ArtifactKind::Agent,
            name: agent.to_owned(),
            declarations: document.len(),
            document: document_path,
        })
    }

    async fn tool_declaration(
        &self,
        artifact: &str,
        entry: &str,
    ) -> BuildResult<(Declaration, PathBuf)> {
        let tool = resolve_tool(&self.layout, artifact, entry).await?;
        let source = fs::read_to_string(&tool.path)
            .await
            .map_err(|err| BuildError::io(artifact, &tool.path, err))?;
        let declaration =
            declarations_from_source(&tool.name, tool.language, &source, ExtractMode::Tool)
                .and_then(|declarations| {
                    declarations.into_iter().next().ok_or_else(|| {
                        DeclarationError::MissingDescription {
                            name: tool.name.clone(),
                        }
                    })
                })
                .map_err(|err| BuildError::declaration(artifact, &tool.path, err))?;
        Ok((declaration, tool.path))
    }

    async fn remove_stale_document(&self, agent: &str) {
        let path = self.layout.agent_functions_path(agent);
        match fs::remove_file(&path).await {
            Ok(()) => info!(
                agent = %agent,
                path = %path.display(),
                "removed stale schema document"
            ),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                agent = %agent,
                error = %err,
                "failed to remove stale schema document"
            ),
        }
    }
}

fn insert(
    document: &mut SchemaDocument,
    artifact: &str,
    path: &Path,
    declaration: Declaration,
) -> BuildResult<()> {
    let name = declaration.name().to_owned();
    document
        .insert(declaration)
        .map_err(|_| BuildError::DuplicateDeclaration {
            artifact: artifact.to_owned(),
            path: path.to_path_buf(),
            name,
        })
}

/// Writes a schema document through a staging file renamed into place.
///
/// # Errors
///
/// Returns [`BuildError::Document`] if encoding fails and
/// [`BuildError::Io`] if the file cannot be written.
pub async fn write_document(
    artifact: &str,
    path: &Path,
    document: &SchemaDocument,
) -> BuildResult<()> {
    let json = document.to_json_pretty().map_err(|source| BuildError::Document {
        artifact: artifact.to_owned(),
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| BuildError::io(artifact, parent, err))?;
    }

    let file_name = path.file_name().and_then(OsStr::to_str).unwrap_or("functions.json");
    let staging = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    fs::write(&staging, json)
        .await
        .map_err(|err| BuildError::io(artifact, &staging, err))?;
    if let Err(err) = fs::rename(&staging, path).await {
        let _ = fs::remove_file(&staging).await;
        return Err(BuildError::io(artifact, path, err));
    }

    debug!(path = %path.display(), declarations = document.len(), "schema document written");
    Ok(())
}
