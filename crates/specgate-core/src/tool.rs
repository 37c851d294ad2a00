//! External tool descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Generator,
    Linter,
    Diff,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Generator => write!(f, "generator"),
            ToolKind::Linter => write!(f, "linter"),
            ToolKind::Diff => write!(f, "diff"),
        }
    }
}

/// A versioned external tool and where it lives on disk.
///
/// Built once from configuration when the orchestrator starts and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: String,
    pub version: String,
    /// Release URL with `{version}` and `{artifact}` placeholders. Tools
    /// installed through a package manager have none.
    pub download_url_template: Option<String>,
    /// Directory owned exclusively by this tool's installer.
    pub install_dir: PathBuf,
    pub executable: PathBuf,
}

impl ToolDescriptor {
    /// Expand the download template for a platform-specific artifact name.
    pub fn download_url(&self, artifact: &str) -> Option<String> {
        self.download_url_template.as_ref().map(|template| {
            template
                .replace("{version}", &self.version)
                .replace("{artifact}", artifact)
        })
    }

    pub fn is_installed(&self) -> bool {
        self.executable.is_file()
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
