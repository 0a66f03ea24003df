//! Build outcome summary.

use std::fmt;
use std::path::PathBuf;

use crate::error::BuildError;

/// Kind of build artifact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArtifactKind {
    /// One tool source contributing to `ROOT/functions.json`.
    Tool,
    /// One agent and its `agents/<name>/functions.json`.
    Agent,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Agent => "agent",
        })
    }
}

/// An artifact whose declarations were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Tool or agent name.
    pub name: String,
    /// Number of declarations contributed.
    pub declarations: usize,
    /// Document the declarations were written to.
    pub document: PathBuf,
}

/// An artifact that was skipped because of an error.
#[derive(Debug)]
pub struct FailedArtifact {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Tool or agent name.
    pub name: String,
    /// Why the artifact failed.
    pub error: BuildError,
}

/// Successes and failures of one build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    built: Vec<BuiltArtifact>,
    failed: Vec<FailedArtifact>,
}

impl BuildReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_built(&mut self, artifact: BuiltArtifact) {
        self.built.push(artifact);
    }

    pub(crate) fn record_failed(&mut self, kind: ArtifactKind, error: BuildError) {
        self.failed.push(FailedArtifact {
            kind,
            name: error.artifact().to_owned(),
            error,
        });
    }

    /// Artifacts that were written, in build order.
    #[must_use]
    pub fn built(&self) -> &[BuiltArtifact] {
        &self.built
    }

    /// Artifacts that failed, in build order.
    #[must_use]
    pub fn failed(&self) -> &[FailedArtifact] {
        &self.failed
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns `true` when at least one artifact was attempted and all of
    /// them failed.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.built.is_empty() && !self.failed.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for artifact in &self.built {
            writeln!(
                f,
                "built {} `{}` ({} declaration{}) -> {}",
                artifact.kind,
                artifact.name,
                artifact.declarations,
                if artifact.declarations == 1 { "" } else { "s" },
                artifact.document.display()
            )?;
        }
        for artifact in &self.failed {
            writeln!(f, "failed {} {}", artifact.kind, artifact.error)?;
        }
        write!(f, "{} built, {} failed", self.built.len(), self.failed.len())
    }
}
