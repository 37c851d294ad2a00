//! Configuration file loading and command-line overrides.

use crate::commands::Overrides;
use specgate_core::ValidationConfig;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "specgate.yaml";

/// Environment variables set by common CI systems.
const CI_VARIABLES: &[&str] = &["CI", "TF_BUILD", "GITHUB_ACTIONS"];

/// Whether the environment looks like a CI job.
pub fn ci_from_env(lookup: impl Fn(&str) -> Option<String>) -> bool {
    CI_VARIABLES.iter().any(|name| {
        lookup(name).is_some_and(|v| {
            let v = v.trim();
            !v.is_empty() && !v.eq_ignore_ascii_case("false") && v != "0"
        })
    })
}

/// Load `path`, or defaults when the default file is absent.
///
/// Relative paths in the file are anchored at the file's directory.
pub fn load(path: &Path, explicit: bool) -> Result<ValidationConfig, Box<dyn std::error::Error>> {
    if !path.exists() {
        if explicit {
            return Err(format!("configuration file {} not found", path.display()).into());
        }
        return Ok(ValidationConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let mut config: ValidationConfig = serde_yaml::from_str(&content)
        .map_err(|e| format!("invalid configuration in {}: {}", path.display(), e))?;

    let base = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    config.resolve_relative_to(&base);
    Ok(config)
}

/// Apply command-line overrides and the CI capability flag.
pub fn apply(config: &mut ValidationConfig, overrides: &Overrides, ci_detected: bool) {
    if let Some(mode) = overrides.mode {
        config.mode = mode.into();
    }
    if let Some(assembly) = &overrides.assembly {
        config.service_assembly = Some(assembly.clone());
    }
    if let Some(ruleset) = &overrides.ruleset {
        config.ruleset = ruleset.clone();
    }
    if let Some(dir) = &overrides.tools_dir {
        config.tools_dir = dir.clone();
    }
    if let Some(dir) = &overrides.reports_dir {
        config.reports_dir = dir.clone();
    }
    if overrides.strict {
        config.treat_warnings_as_errors = true;
    }
    if overrides.no_diff {
        config.diff_enabled = false;
        config.compare_with_generated = false;
    }
    config.ci = overrides.ci.unwrap_or(config.ci || ci_detected);
}

pub const STARTER_CONFIG: &str = r#"# specgate configuration
mode: generate_first

# Compiled service entry assembly, relative to this file.
service_assembly: bin/Release/net8.0/Api.dll

documents:
  - v1

# Committed specifications compared against the generated ones.
baseline:
  v1: openapi/openapi-v1.yaml

ruleset: .spectral.yaml
treat_warnings_as_errors: false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ModeArg;
    use pretty_assertions::assert_eq;
    use specgate_core::Mode;
    use std::path::PathBuf;

    #[test]
    fn test_ci_detection() {
        assert!(ci_from_env(|name| (name == "GITHUB_ACTIONS").then(|| "true".into())));
        assert!(ci_from_env(|name| (name == "TF_BUILD").then(|| "True".into())));
        assert!(!ci_from_env(|name| (name == "CI").then(|| "false".into())));
        assert!(!ci_from_env(|_| None));
    }

    #[test]
    fn test_missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join(DEFAULT_CONFIG_FILE), false).unwrap();
        assert_eq!(config.documents, vec!["v1".to_string()]);
        assert!(load(&dir.path().join("other.yaml"), true).is_err());
    }

    #[test]
    fn test_paths_anchor_at_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, STARTER_CONFIG).unwrap();

        let config = load(&path, true).unwrap();
        assert_eq!(
            config.service_assembly,
            Some(dir.path().join("bin/Release/net8.0/Api.dll"))
        );
        assert_eq!(
            config.baseline.get("v1"),
            Some(dir.path().join("openapi/openapi-v1.yaml").as_path())
        );
        assert_eq!(
            PathBuf::from(&config.ruleset),
            dir.path().join(".spectral.yaml")
        );
    }

    #[test]
    fn test_overrides_win() {
        let mut config = ValidationConfig::default();
        let overrides = Overrides {
            mode: Some(ModeArg::ValidateFirst),
            ruleset: Some("https://rules.example.com/api.yaml".into()),
            strict: true,
            no_diff: true,
            ..Default::default()
        };

        apply(&mut config, &overrides, true);
        assert_eq!(config.mode, Mode::ValidateFirst);
        assert!(config.ruleset_is_remote());
        assert!(config.treat_warnings_as_errors);
        assert!(!config.diff_enabled);
        assert!(config.ci);

        apply(
            &mut config,
            &Overrides {
                ci: Some(false),
                ..Default::default()
            },
            true,
        );
        assert!(!config.ci);
    }
}
