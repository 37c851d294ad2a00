//! Tool installation state machine.

use async_trait::async_trait;
use specgate_core::{ArtifactFetcher, Error, ProcessExecutor, Result, ToolDescriptor};
use specgate_runner::{RetryPolicy, retry};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Lifecycle of one tool within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    Installing,
    Installed,
    Failed,
}

/// Shared collaborators for installers.
#[derive(Clone)]
pub struct InstallContext {
    pub executor: Arc<dyn ProcessExecutor>,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

/// Installs one tool into its descriptor's directory.
#[async_trait]
pub trait ToolInstaller: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// A single installation attempt. Must tolerate leftovers from a
    /// previous partial attempt.
    async fn install_once(&self, ctx: &InstallContext) -> Result<()>;
}

/// Result of [`ensure_installed`].
#[derive(Debug, Clone)]
pub struct Installation {
    pub tool: ToolDescriptor,
    pub state: InstallState,
    /// False when the executable was already present.
    pub newly_installed: bool,
}

fn transition(tool: &ToolDescriptor, from: InstallState, to: InstallState) -> InstallState {
    debug!(tool = %tool, from = ?from, to = ?to, "Install state change");
    to
}

/// Make sure the tool's executable exists, installing it when missing.
///
/// Fallible steps are retried per `ctx.retry`. Exhausting the attempts, or
/// finishing without the executable on disk, yields
/// `Error::InstallationFailed`. Cancellation is passed through unchanged.
pub async fn ensure_installed(
    installer: &dyn ToolInstaller,
    ctx: &InstallContext,
) -> Result<Installation> {
    let tool = installer.descriptor();

    if tool.is_installed() {
        debug!(tool = %tool, path = %tool.executable.display(), "Tool already installed");
        return Ok(Installation {
            tool: tool.clone(),
            state: InstallState::Installed,
            newly_installed: false,
        });
    }

    let mut state = transition(tool, InstallState::NotInstalled, InstallState::Installing);
    info!(tool = %tool, dir = %tool.install_dir.display(), "Installing tool");

    tokio::fs::create_dir_all(&tool.install_dir)
        .await
        .map_err(|e| Error::InstallationFailed {
            tool: tool.to_string(),
            message: format!("cannot create {}: {}", tool.install_dir.display(), e),
        })?;

    let label = format!("install {}", tool.name);
    let attempt = retry(&ctx.retry, &label, &ctx.cancel, |_| installer.install_once(ctx)).await;

    match attempt {
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => {
            transition(tool, state, InstallState::Failed);
            return Err(Error::InstallationFailed {
                tool: tool.to_string(),
                message: e.to_string(),
            });
        }
        Ok(()) => {}
    }

    if !tool.is_installed() {
        transition(tool, state, InstallState::Failed);
        return Err(Error::InstallationFailed {
            tool: tool.to_string(),
            message: format!(
                "expected executable {} is missing after installation",
                tool.executable.display()
            ),
        });
    }

    state = transition(tool, state, InstallState::Installed);
    info!(tool = %tool, "Tool installed");
    Ok(Installation {
        tool: tool.clone(),
        state,
        newly_installed: true,
    })
}

/// Mark a downloaded file as executable.
pub(crate) fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = std::fs::metadata(path)?.permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Whether a file exists with content, i.e. a previous download completed.
pub(crate) fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
