//! Baseline against generated comparison.

use specgate_core::{
    DiffStatus, DocumentSet, ProcessExecutor, ProcessInvocation, Result, ToolDescriptor,
    ValidationOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fields whose changes are cosmetic and never count as breaking.
pub const EXCLUDED_ELEMENTS: &str = "description,examples,title,summary";

/// Report path for a baseline document: `openapi-diff-<file stem>.yaml`.
pub fn diff_report_path(reports_dir: &Path, baseline: &Path) -> PathBuf {
    let stem = baseline
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    reports_dir.join(format!("openapi-diff-{}.yaml", stem))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub compared: usize,
    pub breaking: usize,
    /// Missing counterparts plus tool errors.
    pub skipped: usize,
}

impl DiffSummary {
    pub fn any_breaking(&self) -> bool {
        self.breaking > 0
    }
}

pub struct DiffRunner {
    executor: Arc<dyn ProcessExecutor>,
    tool: ToolDescriptor,
    reports_dir: PathBuf,
}

impl DiffRunner {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        tool: ToolDescriptor,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            tool,
            reports_dir: reports_dir.into(),
        }
    }

    fn invocation(&self, baseline: &Path, generated: &Path) -> ProcessInvocation {
        ProcessInvocation::new(&self.tool.executable)
            .arg("breaking")
            .path_arg(baseline)
            .path_arg(generated)
            .args(["--exclude-elements", EXCLUDED_ELEMENTS])
            .args(["--fail-on", "ERR", "--format", "yaml"])
    }

    /// Diff every baseline file against the generated file with the same
    /// file name.
    ///
    /// Missing counterparts and tool errors are logged and skipped. Only
    /// error-level changes fail the tool, so exit code 0 means no breaking
    /// changes and anything else means breaking changes. The tool's stdout
    /// becomes the report; a report left by an earlier run is removed first.
    pub async fn compare(
        &self,
        baseline: &DocumentSet,
        generated: &DocumentSet,
        outcome: &mut ValidationOutcome,
        cancel: &CancellationToken,
    ) -> Result<DiffSummary> {
        let mut summary = DiffSummary::default();
        tokio::fs::create_dir_all(&self.reports_dir).await?;

        for (name, base_path) in baseline.iter() {
            let counterpart = base_path
                .file_name()
                .and_then(|file_name| generated.find_by_file_name(file_name));

            let Some((_, generated_path)) = counterpart else {
                warn!(
                    document = %name,
                    baseline = %base_path.display(),
                    "No generated specification with a matching file name, skipping diff"
                );
                outcome.warn(format!(
                    "no generated counterpart for {}, diff skipped",
                    base_path.display()
                ));
                outcome.document_mut(name).diff = Some(DiffStatus::MissingCounterpart);
                summary.skipped += 1;
                continue;
            };

            let report = diff_report_path(&self.reports_dir, base_path);
            if report.exists() {
                tokio::fs::remove_file(&report).await?;
            }

            let invocation = self.invocation(base_path, generated_path);
            debug!(command = %invocation.command_line(), "Running diff");
            let result = self.executor.run(&invocation, cancel).await?;

            let stderr = result.stderr.trim();
            if !stderr.is_empty() {
                warn!(document = %name, error = %stderr, "Diff tool reported an error, skipping");
                outcome.warn(format!("{} failed for {}: {}", self.tool.name, base_path.display(), stderr));
                outcome.document_mut(name).diff = Some(DiffStatus::ToolError {
                    message: stderr.to_string(),
                });
                summary.skipped += 1;
                continue;
            }

            tokio::fs::write(&report, &result.stdout).await?;
            summary.compared += 1;

            let status = if result.success() {
                debug!(document = %name, "No breaking changes");
                DiffStatus::NoBreakingChanges
            } else {
                summary.breaking += 1;
                warn!(
                    document = %name,
                    baseline = %base_path.display(),
                    report = %report.display(),
                    "Breaking changes detected"
                );
                DiffStatus::BreakingChanges
            };

            let doc = outcome.document_mut(name);
            doc.diff = Some(status);
            doc.diff_report = Some(report);
        }

        if summary.compared > 0 && !summary.any_breaking() {
            info!(compared = summary.compared, "No breaking changes against the baseline");
            outcome.info(format!(
                "No breaking changes in {} compared specification(s)",
                summary.compared
            ));
        }
        Ok(summary)
    }
}
