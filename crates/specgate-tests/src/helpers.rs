//! Test doubles for the process and network ports.

use async_trait::async_trait;
use specgate_core::{
    ArtifactFetcher, Error, ProcessExecutor, ProcessInvocation, ProcessResult, Result,
};
use specgate_runner::TokioProcessExecutor;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Runs real processes and records which programs were started.
#[derive(Default)]
pub struct CountingExecutor {
    inner: TokioProcessExecutor,
    programs: Mutex<Vec<String>>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.programs.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.programs
            .lock()
            .map(|p| p.iter().filter(|name| *name == program).count())
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        if let Ok(mut programs) = self.programs.lock() {
            programs.clear();
        }
    }
}

#[async_trait]
impl ProcessExecutor for CountingExecutor {
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessResult> {
        if let Ok(mut programs) = self.programs.lock() {
            programs.push(invocation.display_name());
        }
        self.inner.run(invocation, cancel).await
    }
}

/// A fetcher for runs that must not touch the network.
#[derive(Default)]
pub struct OfflineFetcher {
    attempts: AtomicUsize,
}

impl OfflineFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for OfflineFetcher {
    async fn download(
        &self,
        url: &str,
        _destination: &Path,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Download {
            url: url.to_string(),
            message: "network access is disabled in this test".to_string(),
        })
    }
}
