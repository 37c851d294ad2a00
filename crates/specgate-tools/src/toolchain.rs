//! The set of tools one run needs, resolved once from configuration.

use crate::diff::{self, DiffInstaller};
use crate::generator::{self, GeneratorInstaller};
use crate::installer::{InstallContext, Installation, ensure_installed};
use crate::linter::{self, LinterInstaller};
use crate::version::resolve_generator_version;
use specgate_core::{Platform, Result, ToolDescriptor, ValidationConfig};
use std::path::PathBuf;
use tracing::info;

/// Tool descriptors for a run. Tools the configured mode never invokes are
/// left out so they are not installed.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub platform: Platform,
    pub generator: Option<ToolDescriptor>,
    pub linter: ToolDescriptor,
    pub diff: Option<ToolDescriptor>,
    dotnet: PathBuf,
}

/// Executables ready for use.
#[derive(Debug, Clone)]
pub struct InstalledTools {
    pub generator: Option<ToolDescriptor>,
    pub linter: ToolDescriptor,
    pub diff: Option<ToolDescriptor>,
}

impl Toolchain {
    pub fn from_config(config: &ValidationConfig, platform: Platform) -> Self {
        let tools_dir = &config.tools_dir;

        let generator = config.needs_generation().then(|| {
            let version = resolve_generator_version(
                config.tools.generator.as_deref(),
                config.service_assembly.as_deref(),
            );
            generator::descriptor(&version, tools_dir, platform)
        });

        let linter = linter::descriptor(
            &config.tools.linter,
            tools_dir,
            platform,
            config.tool_sources.linter.as_deref(),
        );

        let diff = config.needs_diff().then(|| {
            diff::descriptor(
                &config.tools.diff,
                tools_dir,
                platform,
                config.tool_sources.diff.as_deref(),
            )
        });

        Self {
            platform,
            generator,
            linter,
            diff,
            dotnet: config.dotnet.clone(),
        }
    }

    /// Every descriptor in install order.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.generator
            .iter()
            .chain(std::iter::once(&self.linter))
            .chain(self.diff.iter())
            .collect()
    }

    /// Install every tool concurrently. Each installer owns its directory, so
    /// nothing is shared between them. The first failure wins.
    pub async fn install(&self, ctx: &InstallContext) -> Result<InstalledTools> {
        let generator = async {
            match &self.generator {
                Some(tool) => {
                    let installer = GeneratorInstaller::new(tool.clone(), &self.dotnet);
                    ensure_installed(&installer, ctx).await.map(Some)
                }
                None => Ok(None),
            }
        };
        let linter = async {
            let installer = LinterInstaller::new(self.linter.clone(), self.platform);
            ensure_installed(&installer, ctx).await
        };
        let diff = async {
            match &self.diff {
                Some(tool) => {
                    let installer = DiffInstaller::new(tool.clone(), self.platform);
                    ensure_installed(&installer, ctx).await.map(Some)
                }
                None => Ok(None),
            }
        };

        let (generator, linter, diff) = tokio::try_join!(generator, linter, diff)?;

        let fresh = [generator.as_ref(), Some(&linter), diff.as_ref()]
            .into_iter()
            .flatten()
            .filter(|i| i.newly_installed)
            .count();
        info!(installed = fresh, "Tools ready");

        Ok(InstalledTools {
            generator: generator.map(|i: Installation| i.tool),
            linter: linter.tool,
            diff: diff.map(|i| i.tool),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specgate_core::{Arch, DocumentSet, Mode, Os};
    use std::path::Path;

    fn linux() -> Platform {
        Platform::new(Os::Linux, Arch::X86_64)
    }

    #[test]
    fn test_generate_first_without_baseline_skips_diff_tool() {
        let config = ValidationConfig {
            service_assembly: Some(PathBuf::from("/nonexistent/Api.dll")),
            tools_dir: PathBuf::from("/tools"),
            ..Default::default()
        };
        let chain = Toolchain::from_config(&config, linux());

        let generator = chain.generator.as_ref().unwrap();
        assert_eq!(generator.version, "6.5.0");
        assert!(chain.diff.is_none());
        assert_eq!(chain.descriptors().len(), 2);
    }

    #[test]
    fn test_validate_first_lint_only() {
        let config = ValidationConfig {
            mode: Mode::ValidateFirst,
            baseline: DocumentSet::from_pairs([(
                "v1".to_string(),
                PathBuf::from("openapi-v1.yaml"),
            )])
            .unwrap(),
            tools_dir: PathBuf::from("/tools"),
            ..Default::default()
        };
        let chain = Toolchain::from_config(&config, linux());

        assert!(chain.generator.is_none());
        assert!(chain.diff.is_none());
        assert_eq!(
            chain.linter.install_dir,
            Path::new("/tools/spectral/6.11.1")
        );
    }

    #[test]
    fn test_explicit_versions_are_injected() {
        let mut config = ValidationConfig {
            mode: Mode::ValidateFirst,
            compare_with_generated: true,
            service_assembly: Some(PathBuf::from("/nonexistent/Api.dll")),
            ..Default::default()
        };
        config.tools.generator = Some("6.8.1".into());
        config.tools.diff = "1.11.0".into();

        let chain = Toolchain::from_config(&config, linux());
        assert_eq!(chain.generator.unwrap().version, "6.8.1");
        assert_eq!(chain.diff.unwrap().version, "1.11.0");
    }
}
