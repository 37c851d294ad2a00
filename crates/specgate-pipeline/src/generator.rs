//! Specification generation from the compiled service.

use futures::future::try_join_all;
use specgate_core::{
    DocumentSet, Error, ProcessExecutor, ProcessInvocation, Result, ToolDescriptor,
};
use specgate_runner::{RetryPolicy, retry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const GENERATED_MARKER: &str =
    "# This file was generated by specgate. Do not edit manually.";

/// A document the generator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub name: String,
    pub path: PathBuf,
    /// False when prepending the marker line failed.
    pub marked: bool,
}

/// Runs the generator once per logical document.
pub struct GeneratorRunner {
    executor: Arc<dyn ProcessExecutor>,
    tool: ToolDescriptor,
    assembly: PathBuf,
    env: BTreeMap<String, String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeneratorRunner {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        tool: ToolDescriptor,
        assembly: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            tool,
            assembly: assembly.into(),
            env: BTreeMap::new(),
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn invocation(&self, document: &str, output: &Path) -> ProcessInvocation {
        let mut invocation = ProcessInvocation::new(&self.tool.executable)
            .args(["tofile", "--output"])
            .path_arg(output)
            .arg("--yaml")
            .path_arg(&self.assembly)
            .arg(document)
            .env("DOTNET_ROLL_FORWARD", "Major")
            .envs(&self.env)
            .timeout(self.timeout);
        if let Some(dir) = self.assembly.parent().filter(|d| !d.as_os_str().is_empty()) {
            invocation = invocation.current_dir(dir);
        }
        invocation
    }

    /// Generate every document concurrently and wait for all of them.
    ///
    /// The first document to exhaust its retries fails the whole call; the
    /// remaining generator processes are killed when their futures drop.
    pub async fn generate_all(
        &self,
        documents: &DocumentSet,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeneratedDocument>> {
        info!(
            tool = %self.tool,
            assembly = %self.assembly.display(),
            documents = documents.len(),
            "Generating OpenAPI documents"
        );
        try_join_all(
            documents
                .iter()
                .map(|(name, output)| self.generate(name, output, cancel)),
        )
        .await
    }

    async fn generate(
        &self,
        document: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let label = format!("generate {}", document);
        retry(&self.retry, &label, cancel, |_| {
            self.generate_once(document, output, cancel)
        })
        .await
        .map_err(|e| match e {
            Error::Cancelled { .. } | Error::ProcessStart { .. } => e,
            other => Error::GenerationFailed {
                document: document.to_string(),
                message: other.to_string(),
            },
        })?;

        let marked = match prepend_marker(output).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %output.display(), error = %e, "Could not add generated-file marker");
                false
            }
        };

        info!(document = %document, path = %output.display(), "Generated OpenAPI document");
        Ok(GeneratedDocument {
            name: document.to_string(),
            path: output.to_path_buf(),
            marked,
        })
    }

    async fn generate_once(
        &self,
        document: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // A stale file must not pass for this attempt's output.
        if output.is_file() {
            tokio::fs::remove_file(output).await?;
        }

        let invocation = self.invocation(document, output);
        debug!(command = %invocation.command_line(), "Running generator");
        let result = self.executor.run(&invocation, cancel).await?;

        if !result.success() {
            return Err(Error::ToolFailed {
                tool: invocation.display_name(),
                exit_code: result.exit_code,
                output: result.combined_output(),
            });
        }
        if !output.is_file() {
            return Err(Error::GenerationFailed {
                document: document.to_string(),
                message: format!(
                    "generator exited successfully but wrote no file at {}",
                    output.display()
                ),
            });
        }
        Ok(())
    }
}

/// Put the marker line at the top of a generated file, once.
pub async fn prepend_marker(path: &Path) -> std::io::Result<()> {
    let content = tokio::fs::read_to_string(path).await?;
    if content.starts_with(GENERATED_MARKER) {
        return Ok(());
    }
    tokio::fs::write(path, format!("{}\n{}", GENERATED_MARKER, content)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use specgate_core::{ProcessResult, ToolKind};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then writes the requested output.
    struct ScriptedGenerator {
        failures: u32,
        calls: AtomicU32,
        seen: Mutex<Vec<ProcessInvocation>>,
    }

    impl ScriptedGenerator {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessExecutor for ScriptedGenerator {
        async fn run(
            &self,
            invocation: &ProcessInvocation,
            _cancel: &CancellationToken,
        ) -> Result<ProcessResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().unwrap().push(invocation.clone());
            if call <= self.failures {
                return Ok(ProcessResult {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "Unable to start host".into(),
                });
            }
            let output = &invocation.args[2];
            std::fs::write(output, "openapi: 3.0.1\npaths: {}\n").unwrap();
            Ok(ProcessResult {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn tool() -> ToolDescriptor {
        ToolDescriptor {
            kind: ToolKind::Generator,
            name: "swagger".into(),
            version: "6.5.0".into(),
            download_url_template: None,
            install_dir: PathBuf::from("/tools/swashbuckle/6.5.0"),
            executable: PathBuf::from("/tools/swashbuckle/6.5.0/swagger"),
        }
    }

    fn runner(executor: Arc<ScriptedGenerator>) -> GeneratorRunner {
        GeneratorRunner::new(executor, tool(), "/app/bin/Api.dll", Duration::from_secs(30))
            .with_retry(RetryPolicy::immediate())
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("openapi-v1.yaml");
        let documents = DocumentSet::from_pairs([("v1", output.clone())]).unwrap();
        let executor = ScriptedGenerator::new(2);

        let generated = runner(executor.clone())
            .generate_all(&documents, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(generated.len(), 1);
        assert!(generated[0].marked);
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.starts_with(GENERATED_MARKER));
        assert!(content.contains("openapi: 3.0.1"));
    }

    #[tokio::test]
    async fn test_three_failures_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let documents =
            DocumentSet::from_pairs([("v1", dir.path().join("openapi-v1.yaml"))]).unwrap();
        let executor = ScriptedGenerator::new(3);

        let err = runner(executor.clone())
            .generate_all(&documents, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
        match err {
            Error::GenerationFailed { document, message } => {
                assert_eq!(document, "v1");
                assert!(message.contains("Unable to start host"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invocation_contract() {
        let dir = tempfile::tempdir().unwrap();
        let documents = DocumentSet::from_pairs([
            ("v1", dir.path().join("openapi-v1.yaml")),
            ("v2", dir.path().join("openapi-v2.yaml")),
        ])
        .unwrap();
        let executor = ScriptedGenerator::new(0);

        runner(executor.clone())
            .generate_all(&documents, &CancellationToken::new())
            .await
            .unwrap();

        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let v1 = seen.iter().find(|i| i.args.last().unwrap() == "v1").unwrap();
        assert_eq!(v1.args[0], "tofile");
        assert_eq!(v1.args[1], "--output");
        assert_eq!(v1.args[3], "--yaml");
        assert_eq!(v1.args[4], "/app/bin/Api.dll");
        assert_eq!(v1.env.get("DOTNET_ROLL_FORWARD").map(String::as_str), Some("Major"));
        assert_eq!(v1.timeout, Some(Duration::from_secs(30)));
        assert_eq!(v1.working_dir.as_deref(), Some(Path::new("/app/bin")));
    }

    #[tokio::test]
    async fn test_marker_is_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi-v1.yaml");
        std::fs::write(&path, "openapi: 3.0.1\n").unwrap();

        prepend_marker(&path).await.unwrap();
        prepend_marker(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(GENERATED_MARKER).count(), 1);
    }

    #[tokio::test]
    async fn test_marker_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(prepend_marker(&dir.path().join("missing.yaml")).await.is_err());
    }
}
