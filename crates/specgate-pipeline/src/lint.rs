//! Lint runs gated by change detection.

use crate::ruleset::ResolvedRuleset;
use crate::summary::LintSummary;
use specgate_cache::{ChangeDecision, ChangeDetector, ChecksumStore};
use specgate_core::{
    DocumentSet, Error, LintStatus, ProcessExecutor, ProcessInvocation, Result, ToolDescriptor,
    ValidationOutcome,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Report path for a linted document: `spectral-<file stem>.txt`.
pub fn lint_report_path(reports_dir: &Path, document: &Path) -> PathBuf {
    reports_dir.join(format!("spectral-{}.txt", file_stem(document)))
}

/// Report paths for every document, in set order.
///
/// Documents sharing a file stem get `spectral-<file stem>.<name>.txt`
/// instead, so no two documents write the same report.
pub fn lint_report_paths(reports_dir: &Path, documents: &DocumentSet) -> Vec<PathBuf> {
    let stems: Vec<String> = documents.paths().map(file_stem).collect();
    documents
        .iter()
        .zip(&stems)
        .map(|((name, path), stem)| {
            if stems.iter().filter(|s| *s == stem).count() > 1 {
                reports_dir.join(format!("spectral-{}.{}.txt", stem, name))
            } else {
                lint_report_path(reports_dir, path)
            }
        })
        .collect()
}

fn file_stem(document: &Path) -> String {
    document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintRun {
    /// Nothing changed since the last successful run; no linter was started.
    pub skipped: bool,
    pub problems: u32,
}

pub struct LintRunner {
    executor: Arc<dyn ProcessExecutor>,
    tool: ToolDescriptor,
    store: Arc<dyn ChecksumStore>,
    reports_dir: PathBuf,
    ci: bool,
}

impl LintRunner {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        tool: ToolDescriptor,
        store: Arc<dyn ChecksumStore>,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            tool,
            store,
            reports_dir: reports_dir.into(),
            ci: false,
        }
    }

    /// Echo report contents into the log so they show up in CI job output.
    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    /// Lint `documents` in order, or replay the previous summaries when
    /// neither the ruleset nor any document changed.
    ///
    /// A missing report aborts with `Error::TaskFailed`. A non-zero exit is
    /// recorded as violations. The checksum is persisted only after every
    /// document has been linted.
    pub async fn lint(
        &self,
        ruleset: &ResolvedRuleset,
        documents: &DocumentSet,
        outcome: &mut ValidationOutcome,
        cancel: &CancellationToken,
    ) -> Result<LintRun> {
        let reports = lint_report_paths(&self.reports_dir, documents);

        let detector = ChangeDetector::new(self.store.clone(), ruleset.location.clone());
        let decision = detector
            .evaluate(&ruleset.path, documents, &reports)
            .await?;

        if !decision.must_run() {
            info!(ruleset = %ruleset.location, "Ruleset and documents unchanged, skipping lint");
            return self.replay(&decision, documents, &reports, outcome).await;
        }

        info!(reason = %decision.reason, documents = documents.len(), "Linting OpenAPI documents");
        tokio::fs::create_dir_all(&self.reports_dir).await?;

        let mut total = 0;
        let mut problems = BTreeMap::new();
        for ((name, path), report) in documents.iter().zip(&reports) {
            let status = self
                .lint_document(ruleset, name, path, report, cancel)
                .await?;
            total += status.problems();
            problems.insert(name.to_string(), status.problems());

            let doc = outcome.document_mut(name);
            doc.spec_path = Some(path.to_path_buf());
            doc.lint = Some(status);
            doc.lint_report = Some(report.clone());
        }

        detector.persist(&decision, problems).await?;
        Ok(LintRun {
            skipped: false,
            problems: total,
        })
    }

    async fn lint_document(
        &self,
        ruleset: &ResolvedRuleset,
        name: &str,
        document: &Path,
        report: &Path,
        cancel: &CancellationToken,
    ) -> Result<LintStatus> {
        if report.exists() {
            tokio::fs::remove_file(report).await?;
        }

        let invocation = ProcessInvocation::new(&self.tool.executable)
            .arg("lint")
            .path_arg(document)
            .arg("--ruleset")
            .path_arg(&ruleset.path)
            .args(["--format", "stylish", "--output"])
            .path_arg(report)
            .args(["--fail-severity", "warn", "--verbose"]);
        debug!(command = %invocation.command_line(), "Running linter");

        let result = self.executor.run(&invocation, cancel).await?;

        if !report.is_file() {
            return Err(Error::TaskFailed {
                task: format!("lint of '{}'", name),
                message: format!(
                    "{} produced no report at {} (exit code {})\n{}",
                    self.tool,
                    report.display(),
                    result.exit_code,
                    result.combined_output()
                ),
            });
        }

        let text = tokio::fs::read_to_string(report).await?;
        self.echo(report, &text);
        let summary = LintSummary::parse(&text);

        if result.success() {
            info!(document = %name, report = %report.display(), "Lint passed");
            return Ok(LintStatus::Passed);
        }

        let problems = summary
            .filter(|s| !s.is_clean())
            .map(|s| s.problems)
            .unwrap_or(1);
        warn!(
            document = %name,
            problems,
            report = %report.display(),
            output = %result.combined_output(),
            "Lint reported problems"
        );
        Ok(LintStatus::Violations { problems })
    }

    /// Report the counts recorded by the last run. The reports are read only
    /// to echo them, so a report without a result line replays the same
    /// count the live run derived from the exit code.
    async fn replay(
        &self,
        decision: &ChangeDecision,
        documents: &DocumentSet,
        reports: &[PathBuf],
        outcome: &mut ValidationOutcome,
    ) -> Result<LintRun> {
        let mut total = 0;
        for ((name, path), report) in documents.iter().zip(reports) {
            let problems = decision.recorded_problems(name);
            if problems > 0 {
                let text = tokio::fs::read_to_string(report).await?;
                let found = LintSummary::parse(&text)
                    .map(|summary| summary.to_string())
                    .unwrap_or_else(|| format!("{} problem(s)", problems));
                warn!(
                    document = %name,
                    problems,
                    report = %report.display(),
                    "Previous lint run found {}", found
                );
                self.echo(report, &text);
            }
            total += problems;

            let doc = outcome.document_mut(name);
            doc.spec_path = Some(path.to_path_buf());
            doc.lint = Some(LintStatus::Cached { problems });
            doc.lint_report = Some(report.clone());
        }
        outcome.info("Lint skipped: ruleset and documents unchanged since the last successful run");
        Ok(LintRun {
            skipped: true,
            problems: total,
        })
    }

    fn echo(&self, report: &Path, text: &str) {
        if !self.ci {
            return;
        }
        info!(report = %report.display(), "Lint report");
        for line in text.lines() {
            info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use specgate_cache::FilesystemChecksumStore;
    use specgate_core::{ProcessResult, ToolKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    const VIOLATIONS: &str = "\
openapi-v1.yaml
  1:1  warning  info-contact  Info object must have \"contact\" object.

✖ 1 problem (0 errors, 1 warning, 0 infos, 0 hints)
";

    /// Writes `report` to the `--output` path and exits with `exit_code`.
    struct FakeLinter {
        report: Option<&'static str>,
        exit_code: i32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ProcessExecutor for FakeLinter {
        async fn run(
            &self,
            invocation: &ProcessInvocation,
            _cancel: &CancellationToken,
        ) -> Result<ProcessResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = invocation
                .args
                .iter()
                .position(|a| a == "--output")
                .map(|i| invocation.args[i + 1].clone())
                .unwrap();
            if let Some(report) = self.report {
                std::fs::write(output, report).unwrap();
            }
            Ok(ProcessResult {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        ruleset: ResolvedRuleset,
        documents: DocumentSet,
        reports_dir: PathBuf,
        store: Arc<FilesystemChecksumStore>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ruleset_path = dir.path().join(".spectral.yaml");
        std::fs::write(&ruleset_path, "extends: spectral:oas\n").unwrap();
        let spec = dir.path().join("openapi-v1.yaml");
        std::fs::write(&spec, "openapi: 3.0.1\n").unwrap();
        Fixture {
            ruleset: ResolvedRuleset {
                location: ruleset_path.to_string_lossy().into_owned(),
                path: ruleset_path,
                remote: false,
            },
            documents: DocumentSet::from_pairs([("v1", spec)]).unwrap(),
            reports_dir: dir.path().join("reports"),
            store: Arc::new(FilesystemChecksumStore::new(dir.path().join("state"))),
            _dir: dir,
        }
    }

    fn tool() -> ToolDescriptor {
        ToolDescriptor {
            kind: ToolKind::Linter,
            name: "spectral".into(),
            version: "6.11.1".into(),
            download_url_template: None,
            install_dir: PathBuf::from("/tools/spectral/6.11.1"),
            executable: PathBuf::from("/tools/spectral/6.11.1/spectral"),
        }
    }

    fn linter(report: Option<&'static str>, exit_code: i32) -> Arc<FakeLinter> {
        Arc::new(FakeLinter {
            report,
            exit_code,
            calls: AtomicU32::new(0),
        })
    }

    #[test]
    fn test_report_path_uses_base_name() {
        assert_eq!(
            lint_report_path(Path::new("/reports"), Path::new("/specs/openapi-v1.yaml")),
            PathBuf::from("/reports/spectral-openapi-v1.txt")
        );
    }

    #[test]
    fn test_report_paths_disambiguate_shared_file_names() {
        let documents = DocumentSet::from_pairs([
            ("v1", "/specs/v1/openapi.yaml"),
            ("v2", "/specs/v2/openapi.yaml"),
            ("admin", "/specs/openapi-admin.yaml"),
        ])
        .unwrap();

        assert_eq!(
            lint_report_paths(Path::new("/reports"), &documents),
            vec![
                PathBuf::from("/reports/spectral-openapi.v1.txt"),
                PathBuf::from("/reports/spectral-openapi.v2.txt"),
                PathBuf::from("/reports/spectral-openapi-admin.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn test_violations_are_not_fatal_and_second_run_is_skipped() {
        let f = fixture();
        let exec = linter(Some(VIOLATIONS), 1);
        let runner = LintRunner::new(exec.clone(), tool(), f.store.clone(), &f.reports_dir);
        let cancel = CancellationToken::new();

        let mut outcome = ValidationOutcome::new(false);
        let first = runner
            .lint(&f.ruleset, &f.documents, &mut outcome, &cancel)
            .await
            .unwrap();
        assert!(!first.skipped);
        assert_eq!(first.problems, 1);
        assert_eq!(
            outcome.documents["v1"].lint,
            Some(LintStatus::Violations { problems: 1 })
        );
        assert!(outcome.passed());

        let mut again = ValidationOutcome::new(false);
        let second = runner
            .lint(&f.ruleset, &f.documents, &mut again, &cancel)
            .await
            .unwrap();
        assert!(second.skipped);
        assert_eq!(second.problems, 1);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            again.documents["v1"].lint,
            Some(LintStatus::Cached { problems: 1 })
        );
    }

    #[tokio::test]
    async fn test_replay_keeps_count_of_report_without_result_line() {
        let f = fixture();
        let exec = linter(Some("openapi-v1.yaml\n  1:1  error  oas3-schema  Invalid schema.\n"), 1);
        let runner = LintRunner::new(exec.clone(), tool(), f.store.clone(), &f.reports_dir);
        let cancel = CancellationToken::new();

        let mut first = ValidationOutcome::new(true);
        runner
            .lint(&f.ruleset, &f.documents, &mut first, &cancel)
            .await
            .unwrap();
        assert_eq!(
            first.documents["v1"].lint,
            Some(LintStatus::Violations { problems: 1 })
        );
        assert_eq!(first.exit_code(), 1);

        let mut second = ValidationOutcome::new(true);
        let run = runner
            .lint(&f.ruleset, &f.documents, &mut second, &cancel)
            .await
            .unwrap();
        assert!(run.skipped);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            second.documents["v1"].lint,
            Some(LintStatus::Cached { problems: 1 })
        );
        assert_eq!(second.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_missing_report_is_fatal_and_not_cached() {
        let f = fixture();
        let exec = linter(None, 2);
        let runner = LintRunner::new(exec.clone(), tool(), f.store.clone(), &f.reports_dir);
        let cancel = CancellationToken::new();

        let err = runner
            .lint(&f.ruleset, &f.documents, &mut ValidationOutcome::new(false), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed { .. }));

        let err = runner
            .lint(&f.ruleset, &f.documents, &mut ValidationOutcome::new(false), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskFailed { .. }));
        assert_eq!(exec.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_document_runs_again() {
        let f = fixture();
        let exec = linter(Some("No results with a severity of 'warn' found!\n"), 0);
        let runner = LintRunner::new(exec.clone(), tool(), f.store.clone(), &f.reports_dir);
        let cancel = CancellationToken::new();

        runner
            .lint(&f.ruleset, &f.documents, &mut ValidationOutcome::new(false), &cancel)
            .await
            .unwrap();
        std::fs::write(f.documents.get("v1").unwrap(), "openapi: 3.0.2\n").unwrap();

        let run = runner
            .lint(&f.ruleset, &f.documents, &mut ValidationOutcome::new(false), &cancel)
            .await
            .unwrap();
        assert!(!run.skipped);
        assert_eq!(run.problems, 0);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invocation_contract() {
        struct Recording(std::sync::Mutex<Option<ProcessInvocation>>);

        #[async_trait]
        impl ProcessExecutor for Recording {
            async fn run(
                &self,
                invocation: &ProcessInvocation,
                _cancel: &CancellationToken,
            ) -> Result<ProcessResult> {
                *self.0.lock().unwrap() = Some(invocation.clone());
                Ok(ProcessResult {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }

        let f = fixture();
        let exec = Arc::new(Recording(std::sync::Mutex::new(None)));
        let runner = LintRunner::new(exec.clone(), tool(), f.store.clone(), &f.reports_dir);
        let _ = runner
            .lint(
                &f.ruleset,
                &f.documents,
                &mut ValidationOutcome::new(false),
                &CancellationToken::new(),
            )
            .await;

        let invocation = exec.0.lock().unwrap().clone().unwrap();
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        assert_eq!(args[0], "lint");
        assert_eq!(args[2], "--ruleset");
        assert_eq!(&args[4..7], ["--format", "stylish", "--output"]);
        assert_eq!(&args[8..], ["--fail-severity", "warn", "--verbose"]);
    }
}
