//! Swashbuckle CLI: installed through the .NET tool package manager.

use crate::installer::{InstallContext, ToolInstaller};
use async_trait::async_trait;
use specgate_core::{Error, Platform, ProcessInvocation, Result, ToolDescriptor, ToolKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const PACKAGE_ID: &str = "swashbuckle.aspnetcore.cli";

const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

pub fn descriptor(version: &str, tools_dir: &Path, platform: Platform) -> ToolDescriptor {
    let install_dir = tools_dir.join("swashbuckle").join(version);
    ToolDescriptor {
        kind: ToolKind::Generator,
        name: "swagger".to_string(),
        version: version.to_string(),
        download_url_template: None,
        executable: install_dir.join(format!("swagger{}", platform.exe_suffix())),
        install_dir,
    }
}

pub struct GeneratorInstaller {
    tool: ToolDescriptor,
    dotnet: PathBuf,
}

impl GeneratorInstaller {
    pub fn new(tool: ToolDescriptor, dotnet: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            dotnet: dotnet.into(),
        }
    }

    fn invocation(&self) -> ProcessInvocation {
        ProcessInvocation::new(&self.dotnet)
            .args(["tool", "install", PACKAGE_ID, "--tool-path"])
            .path_arg(&self.tool.install_dir)
            .arg("--version")
            .arg(&self.tool.version)
            .timeout(INSTALL_TIMEOUT)
    }
}

#[async_trait]
impl ToolInstaller for GeneratorInstaller {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.tool
    }

    async fn install_once(&self, ctx: &InstallContext) -> Result<()> {
        let invocation = self.invocation();
        info!(command = %invocation.command_line(), "Installing swashbuckle CLI");

        let result = ctx.executor.run(&invocation, &ctx.cancel).await?;
        if !result.success() {
            return Err(Error::ToolFailed {
                tool: invocation.display_name(),
                exit_code: result.exit_code,
                output: result.combined_output(),
            });
        }
        Ok(())
    }
}
