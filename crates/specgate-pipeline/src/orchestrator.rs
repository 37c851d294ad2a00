//! Pipeline sequencing for both validation modes.

use crate::diff::DiffRunner;
use crate::generator::GeneratorRunner;
use crate::lint::{LintRunner, lint_report_paths};
use crate::ruleset::{ResolvedRuleset, resolve_ruleset};
use specgate_cache::{ChangeDecision, ChangeDetector, ChecksumStore, FilesystemChecksumStore};
use specgate_core::{
    ArtifactFetcher, DocumentSet, Error, Mode, Platform, ProcessExecutor, Result,
    ValidationConfig, ValidationOutcome,
};
use specgate_runner::RetryPolicy;
use specgate_tools::{InstallContext, InstalledTools, Toolchain};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns one validation run: its configuration, tools and outcome.
pub struct Orchestrator {
    config: ValidationConfig,
    platform: Platform,
    executor: Arc<dyn ProcessExecutor>,
    fetcher: Arc<dyn ArtifactFetcher>,
    store: Arc<dyn ChecksumStore>,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Checksum state is kept under `<reports_dir>/.checksums`.
    pub fn new(
        config: ValidationConfig,
        executor: Arc<dyn ProcessExecutor>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        let store = Arc::new(FilesystemChecksumStore::new(
            config.reports_dir.join(".checksums"),
        ));
        let retry = RetryPolicy::new(3, Duration::from_millis(config.retry_delay_ms));
        Self {
            config,
            platform: Platform::current(),
            executor,
            fetcher,
            store,
            retry,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ChecksumStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::from_config(&self.config, self.platform)
    }

    /// Install every tool this run needs.
    pub async fn install(&self, cancel: &CancellationToken) -> Result<InstalledTools> {
        let ctx = InstallContext {
            executor: self.executor.clone(),
            fetcher: self.fetcher.clone(),
            retry: self.retry.clone(),
            cancel: cancel.clone(),
        };
        self.toolchain().install(&ctx).await
    }

    async fn ruleset(&self, cancel: &CancellationToken) -> Result<ResolvedRuleset> {
        resolve_ruleset(
            &self.config.ruleset,
            &self.config.tools_dir,
            self.fetcher.as_ref(),
            &self.retry,
            cancel,
        )
        .await
    }

    /// The documents the linter checks in the configured mode.
    pub fn lint_targets(&self) -> Result<DocumentSet> {
        match self.config.mode {
            Mode::GenerateFirst => self.config.generated_documents(),
            Mode::ValidateFirst => Ok(self.config.baseline.clone()),
        }
    }

    /// Decide whether the next lint would run, without running anything.
    pub async fn checksum(&self, cancel: &CancellationToken) -> Result<ChangeDecision> {
        let ruleset = self.ruleset(cancel).await?;
        let documents = self.lint_targets()?;
        let reports = lint_report_paths(&self.config.reports_dir, &documents);
        ChangeDetector::new(self.store.clone(), ruleset.location)
            .evaluate(&ruleset.path, &documents, &reports)
            .await
    }

    /// Run the pipeline to completion.
    ///
    /// Never fails: a fatal error stops the remaining steps and is recorded
    /// on the returned outcome.
    pub async fn run(&self, cancel: &CancellationToken) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new(self.config.treat_warnings_as_errors);
        if let Err(e) = self.execute(&mut outcome, cancel).await {
            error!(error = %e, "Validation aborted");
            outcome.record_fatal(&e);
        }
        outcome
    }

    async fn execute(
        &self,
        outcome: &mut ValidationOutcome,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.config.validate()?;
        info!(mode = ?self.config.mode, "Starting OpenAPI validation");

        let tools = self.install(cancel).await?;
        let ruleset = self.ruleset(cancel).await?;
        let lint = LintRunner::new(
            self.executor.clone(),
            tools.linter.clone(),
            self.store.clone(),
            &self.config.reports_dir,
        )
        .with_ci(self.config.ci);

        let generated = match self.config.mode {
            Mode::GenerateFirst => {
                let generated = self.generate(&tools, outcome, cancel).await?;
                lint.lint(&ruleset, &generated, outcome, cancel).await?;
                generated
            }
            Mode::ValidateFirst => {
                lint.lint(&ruleset, &self.config.baseline, outcome, cancel)
                    .await?;
                if !self.config.needs_generation() {
                    return Ok(());
                }
                self.generate(&tools, outcome, cancel).await?
            }
        };

        if self.config.needs_diff() {
            let tool = tools
                .diff
                .clone()
                .ok_or_else(|| Error::Internal("diff tool was not installed".into()))?;
            DiffRunner::new(self.executor.clone(), tool, &self.config.reports_dir)
                .compare(&self.config.baseline, &generated, outcome, cancel)
                .await?;
        }

        Ok(())
    }

    async fn generate(
        &self,
        tools: &InstalledTools,
        outcome: &mut ValidationOutcome,
        cancel: &CancellationToken,
    ) -> Result<DocumentSet> {
        let tool = tools
            .generator
            .clone()
            .ok_or_else(|| Error::Internal("generator was not installed".into()))?;
        let assembly = self
            .config
            .service_assembly
            .clone()
            .ok_or_else(|| Error::Config("service_assembly is not set".into()))?;
        let documents = self.config.generated_documents()?;

        let generated = GeneratorRunner::new(
            self.executor.clone(),
            tool,
            assembly,
            Duration::from_secs(self.config.generator_timeout_secs),
        )
        .with_env(self.config.generator_env.clone())
        .with_retry(self.retry.clone())
        .generate_all(&documents, cancel)
        .await?;

        for doc in generated.iter().filter(|d| !d.marked) {
            outcome.warn(format!(
                "could not mark {} as generated",
                doc.path.display()
            ));
        }
        Ok(documents)
    }
}
