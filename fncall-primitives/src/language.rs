//! Script languages supported by the runners and comment dialects.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language a tool or agent source file is written in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Bash scripts (`.sh`).
    Shell,
    /// Node.js modules (`.js`).
    JavaScript,
    /// Python modules (`.py`).
    Python,
}

impl Language {
    /// Every supported language, in entry-point probing order.
    pub const ALL: [Language; 3] = [Language::Shell, Language::JavaScript, Language::Python];

    /// Maps a file extension (without the dot) to a language.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "sh" => Some(Self::Shell),
            "js" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Determines the language of a source path from its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the file extension used by sources of this language.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Shell => "sh",
            Self::JavaScript => "js",
            Self::Python => "py",
        }
    }

    /// Returns the function a tool file of this language exposes as its entry point.
    #[must_use]
    pub const fn tool_entry_function(self) -> &'static str {
        match self {
            Self::Shell => "main",
            Self::JavaScript | Self::Python => "run",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shell => "shell",
            Self::JavaScript => "javascript",
            Self::Python => "python",
        };
        f.write_str(name)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shell" | "sh" | "bash" => Ok(Self::Shell),
            "javascript" | "js" | "node" => Ok(Self::JavaScript),
            "python" | "py" => Ok(Self::Python),
            other => Err(format!("unsupported language `{other}`")),
        }
    }
}
