//! oasdiff: an archived release that is downloaded, then extracted.

use crate::archive::{ArchiveKind, extract_archive};
use crate::installer::{InstallContext, ToolInstaller, is_non_empty_file, make_executable};
use async_trait::async_trait;
use specgate_core::{Arch, Error, Os, Platform, Result, ToolDescriptor, ToolKind};
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://github.com/oasdiff/oasdiff/releases/download/v{version}/{artifact}";

/// Archive file name for a platform.
///
/// macOS has a single `darwin_all` archive covering both architectures;
/// Windows archives are zip files.
pub fn artifact_name(version: &str, platform: Platform) -> String {
    let arch = match platform.arch {
        Arch::X86_64 => "amd64",
        Arch::Aarch64 => "arm64",
    };
    match platform.os {
        Os::Linux => format!("oasdiff_{}_linux_{}.tar.gz", version, arch),
        Os::Macos => format!("oasdiff_{}_darwin_all.tar.gz", version),
        Os::Windows => format!("oasdiff_{}_windows_{}.zip", version, arch),
    }
}

pub fn descriptor(
    version: &str,
    tools_dir: &Path,
    platform: Platform,
    url_template: Option<&str>,
) -> ToolDescriptor {
    let install_dir = tools_dir.join("oasdiff").join(version);
    ToolDescriptor {
        kind: ToolKind::Diff,
        name: "oasdiff".to_string(),
        version: version.to_string(),
        download_url_template: Some(url_template.unwrap_or(DEFAULT_DOWNLOAD_URL).to_string()),
        executable: install_dir.join(format!("oasdiff{}", platform.exe_suffix())),
        install_dir,
    }
}

pub struct DiffInstaller {
    tool: ToolDescriptor,
    artifact: String,
}

impl DiffInstaller {
    pub fn new(tool: ToolDescriptor, platform: Platform) -> Self {
        let artifact = artifact_name(&tool.version, platform);
        Self { tool, artifact }
    }
}

#[async_trait]
impl ToolInstaller for DiffInstaller {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.tool
    }

    async fn install_once(&self, ctx: &InstallContext) -> Result<()> {
        let archive = self.tool.install_dir.join(&self.artifact);
        let kind = ArchiveKind::from_file_name(&self.artifact).ok_or_else(|| {
            Error::Internal(format!("unknown archive format: {}", self.artifact))
        })?;

        if !is_non_empty_file(&archive) {
            let url = self
                .tool
                .download_url(&self.artifact)
                .ok_or_else(|| Error::Config("oasdiff has no download URL".into()))?;
            info!(url = %url, "Downloading oasdiff");
            ctx.fetcher.download(&url, &archive, &ctx.cancel).await?;
        }

        // A previous partial run may have extracted already.
        if !self.tool.is_installed() {
            if let Err(e) = extract_archive(&archive, &self.tool.install_dir, kind).await {
                warn!(archive = %archive.display(), error = %e, "Discarding unusable archive");
                let _ = tokio::fs::remove_file(&archive).await;
                return Err(e);
            }
        }

        make_executable(&self.tool.executable)
    }
}
