//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the orchestration logic and
//! the processes and network it drives.

use crate::Result;
use crate::process::{ProcessInvocation, ProcessResult};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Runs external executables.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run a process to completion and capture its output.
    ///
    /// Returns `Ok` for any exit code. Fails with `Error::ProcessStart` when
    /// the program cannot be launched, and with `Error::Cancelled` or
    /// `Error::Timeout` after killing the child.
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessResult>;
}

/// Downloads remote artifacts.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download `url` to `destination`, replacing any existing file.
    async fn download(&self, url: &str, destination: &Path, cancel: &CancellationToken)
    -> Result<()>;
}
