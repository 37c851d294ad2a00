//! Validation run configuration.
//!
//! This is the surface the build integration hands to the orchestrator.

use crate::document::DocumentSet;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_GENERATOR_VERSION: &str = "6.5.0";
pub const DEFAULT_LINTER_VERSION: &str = "6.11.1";
pub const DEFAULT_DIFF_VERSION: &str = "1.10.25";

/// Which artifact gets linted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Generate specifications from the service, lint them, then diff them
    /// against the committed baseline.
    #[default]
    GenerateFirst,
    /// Lint the committed baseline, optionally generating and diffing too.
    ValidateFirst,
}

/// Pinned tool versions. `generator: None` means "detect from the service
/// build output, falling back to the pinned default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolVersions {
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default = "default_linter_version")]
    pub linter: String,
    #[serde(default = "default_diff_version")]
    pub diff: String,
}

fn default_linter_version() -> String {
    DEFAULT_LINTER_VERSION.to_string()
}

fn default_diff_version() -> String {
    DEFAULT_DIFF_VERSION.to_string()
}

/// Download URL templates overriding the public release locations, for
/// mirrors. Placeholders: `{version}` and `{artifact}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSources {
    #[serde(default)]
    pub linter: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
}

impl Default for ToolVersions {
    fn default() -> Self {
        Self {
            generator: None,
            linter: default_linter_version(),
            diff: default_diff_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub mode: Mode,
    /// Compiled service entry assembly the generator loads.
    #[serde(default)]
    pub service_assembly: Option<PathBuf>,
    /// Logical document names exposed by the service.
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,
    /// Committed specifications keyed by document name.
    #[serde(default)]
    pub baseline: DocumentSet,
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    /// Local path or http(s) URL of the lint ruleset.
    #[serde(default = "default_ruleset")]
    pub ruleset: String,
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default)]
    pub treat_warnings_as_errors: bool,
    /// Generate-first: diff generated specs against the baseline.
    #[serde(default = "default_true")]
    pub diff_enabled: bool,
    /// Validate-first: also generate specs and diff them against the baseline.
    #[serde(default)]
    pub compare_with_generated: bool,
    #[serde(default)]
    pub tools: ToolVersions,
    #[serde(default)]
    pub tool_sources: ToolSources,
    #[serde(default = "default_generator_timeout")]
    pub generator_timeout_secs: u64,
    #[serde(default)]
    pub generator_env: BTreeMap<String, String>,
    /// .NET host used to install the generator.
    #[serde(default = "default_dotnet")]
    pub dotnet: PathBuf,
    /// Running inside a CI job; changes output formatting only.
    #[serde(default)]
    pub ci: bool,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_documents() -> Vec<String> {
    vec!["v1".to_string()]
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("obj/openapi")
}

fn default_ruleset() -> String {
    ".spectral.yaml".to_string()
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from(".specgate/tools")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from(".specgate/reports")
}

fn default_true() -> bool {
    true
}

fn default_generator_timeout() -> u64 {
    300
}

fn default_dotnet() -> PathBuf {
    PathBuf::from("dotnet")
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            service_assembly: None,
            documents: default_documents(),
            baseline: DocumentSet::new(),
            generated_dir: default_generated_dir(),
            ruleset: default_ruleset(),
            tools_dir: default_tools_dir(),
            reports_dir: default_reports_dir(),
            treat_warnings_as_errors: false,
            diff_enabled: true,
            compare_with_generated: false,
            tools: ToolVersions::default(),
            tool_sources: ToolSources::default(),
            generator_timeout_secs: default_generator_timeout(),
            generator_env: BTreeMap::new(),
            dotnet: default_dotnet(),
            ci: false,
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl ValidationConfig {
    /// Where the generator writes the given document.
    pub fn generated_path(&self, document: &str) -> PathBuf {
        self.generated_dir.join(format!("openapi-{}.yaml", document))
    }

    /// Every configured document mapped to its generated output path.
    pub fn generated_documents(&self) -> Result<DocumentSet> {
        DocumentSet::from_pairs(
            self.documents
                .iter()
                .map(|name| (name.clone(), self.generated_path(name))),
        )
    }

    pub fn ruleset_is_remote(&self) -> bool {
        self.ruleset.starts_with("http://") || self.ruleset.starts_with("https://")
    }

    /// Whether this run invokes the generator at all.
    pub fn needs_generation(&self) -> bool {
        match self.mode {
            Mode::GenerateFirst => true,
            Mode::ValidateFirst => self.compare_with_generated,
        }
    }

    /// Whether this run compares generated specs with the baseline.
    pub fn needs_diff(&self) -> bool {
        match self.mode {
            Mode::GenerateFirst => self.diff_enabled && !self.baseline.is_empty(),
            Mode::ValidateFirst => self.compare_with_generated,
        }
    }

    /// Check cross-field requirements.
    pub fn validate(&self) -> Result<()> {
        if self.needs_generation() {
            if self.service_assembly.is_none() {
                return Err(Error::Config(
                    "service_assembly is required to generate specifications".into(),
                ));
            }
            if self.documents.is_empty() {
                return Err(Error::Config("at least one document name is required".into()));
            }
            // Surfaces duplicate document names.
            self.generated_documents()?;
        }
        if self.mode == Mode::ValidateFirst && self.baseline.is_empty() {
            return Err(Error::Config(
                "validate_first mode requires at least one baseline specification".into(),
            ));
        }
        if self.ruleset.trim().is_empty() {
            return Err(Error::Config("ruleset must not be empty".into()));
        }
        Ok(())
    }

    /// Anchor relative paths at `base`, normally the config file's directory.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(assembly) = self.service_assembly.as_mut() {
            anchor(assembly);
        }
        anchor(&mut self.generated_dir);
        anchor(&mut self.tools_dir);
        anchor(&mut self.reports_dir);

        let baseline = std::mem::take(&mut self.baseline);
        for (name, path) in baseline.iter() {
            let resolved = if path.is_relative() {
                base.join(path)
            } else {
                path.to_path_buf()
            };
            // Names were unique in the source set.
            let _ = self.baseline.insert(name, resolved);
        }

        if !self.ruleset_is_remote() && Path::new(&self.ruleset).is_relative() {
            self.ruleset = base.join(&self.ruleset).to_string_lossy().into_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config: ValidationConfig =
            serde_yaml::from_str("service_assembly: bin/Api.dll\n").unwrap();
        assert_eq!(config.mode, Mode::GenerateFirst);
        assert_eq!(config.documents, vec!["v1".to_string()]);
        assert_eq!(config.tools.linter, DEFAULT_LINTER_VERSION);
        assert!(config.tools.generator.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_paths_follow_document_names() {
        let config = ValidationConfig {
            documents: vec!["v1".into(), "admin".into()],
            generated_dir: PathBuf::from("/out"),
            ..Default::default()
        };
        let generated = config.generated_documents().unwrap();
        assert_eq!(
            generated.get("admin"),
            Some(Path::new("/out/openapi-admin.yaml"))
        );
    }

    #[test]
    fn test_validate_first_requires_baseline() {
        let config = ValidationConfig {
            mode: Mode::ValidateFirst,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_generate_first_requires_assembly() {
        let config = ValidationConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_documents_rejected() {
        let config = ValidationConfig {
            service_assembly: Some(PathBuf::from("Api.dll")),
            documents: vec!["v1".into(), "v1".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_diff_and_generation_switches() {
        let mut config = ValidationConfig {
            service_assembly: Some(PathBuf::from("Api.dll")),
            ..Default::default()
        };
        assert!(config.needs_generation());
        assert!(!config.needs_diff(), "no baseline means nothing to diff");

        config.mode = Mode::ValidateFirst;
        config.baseline.insert("v1", "openapi-v1.yaml").unwrap();
        assert!(!config.needs_generation());
        assert!(!config.needs_diff());

        config.compare_with_generated = true;
        assert!(config.needs_generation());
        assert!(config.needs_diff());
    }

    #[test]
    fn test_resolve_relative_paths() {
        let mut config: ValidationConfig = serde_yaml::from_str(
            "service_assembly: bin/Api.dll\nbaseline:\n  v1: openapi-v1.yaml\nruleset: https://example.com/rules.yaml\n",
        )
        .unwrap();
        config.resolve_relative_to(Path::new("/repo"));

        assert_eq!(
            config.service_assembly.as_deref(),
            Some(Path::new("/repo/bin/Api.dll"))
        );
        assert_eq!(
            config.baseline.get("v1"),
            Some(Path::new("/repo/openapi-v1.yaml"))
        );
        assert_eq!(config.ruleset, "https://example.com/rules.yaml");
        assert_eq!(config.reports_dir, PathBuf::from("/repo/.specgate/reports"));
    }
}
