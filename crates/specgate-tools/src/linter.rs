//! Spectral linter: a single binary downloaded from its release page.

use crate::installer::{InstallContext, ToolInstaller, make_executable};
use async_trait::async_trait;
use specgate_core::{Arch, Error, Os, Platform, Result, ToolDescriptor, ToolKind};
use std::path::Path;
use tracing::info;

pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://github.com/stoplightio/spectral/releases/download/v{version}/spectral-{artifact}";

/// Release artifact suffix for a platform.
///
/// macOS ships one universal binary for both architectures and Windows only
/// an x64 build.
pub fn artifact_name(platform: Platform) -> &'static str {
    match (platform.os, platform.arch) {
        (Os::Linux, Arch::X86_64) => "linux-x64",
        (Os::Linux, Arch::Aarch64) => "linux-arm64",
        (Os::Macos, _) => "macos",
        (Os::Windows, _) => "win.exe",
    }
}

pub fn descriptor(
    version: &str,
    tools_dir: &Path,
    platform: Platform,
    url_template: Option<&str>,
) -> ToolDescriptor {
    let install_dir = tools_dir.join("spectral").join(version);
    ToolDescriptor {
        kind: ToolKind::Linter,
        name: "spectral".to_string(),
        version: version.to_string(),
        download_url_template: Some(url_template.unwrap_or(DEFAULT_DOWNLOAD_URL).to_string()),
        executable: install_dir.join(format!("spectral{}", platform.exe_suffix())),
        install_dir,
    }
}

pub struct LinterInstaller {
    tool: ToolDescriptor,
    artifact: &'static str,
}

impl LinterInstaller {
    pub fn new(tool: ToolDescriptor, platform: Platform) -> Self {
        Self {
            tool,
            artifact: artifact_name(platform),
        }
    }
}

#[async_trait]
impl ToolInstaller for LinterInstaller {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.tool
    }

    async fn install_once(&self, ctx: &InstallContext) -> Result<()> {
        let url = self
            .tool
            .download_url(self.artifact)
            .ok_or_else(|| Error::Config("spectral has no download URL".into()))?;

        info!(url = %url, "Downloading spectral");
        ctx.fetcher
            .download(&url, &self.tool.executable, &ctx.cancel)
            .await?;
        make_executable(&self.tool.executable)
    }
}
