//! Incremental lint skipping across runs.

#![cfg(unix)]

use specgate_cache::ChangeReason;
use specgate_core::{LintStatus, Mode, ValidationConfig};
use specgate_pipeline::Orchestrator;
use specgate_tests::{
    CountingExecutor, FOO_SPEC, OfflineFetcher, Project, UNSUMMARISED_SPEC, VIOLATING_SPEC,
    init_test_logging,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Each run gets a fresh orchestrator, as each build is a fresh process.
async fn run(project: &Project, config: &ValidationConfig) -> (specgate_core::ValidationOutcome, Arc<CountingExecutor>) {
    init_test_logging();
    let executor = Arc::new(CountingExecutor::new());
    let orchestrator =
        Orchestrator::new(config.clone(), executor.clone(), Arc::new(OfflineFetcher::new()));
    project
        .tools
        .preinstall(&orchestrator.toolchain())
        .expect("Failed to preinstall tools");
    let outcome = orchestrator.run(&CancellationToken::new()).await;
    (outcome, executor)
}

fn report(project: &Project) -> PathBuf {
    project.reports_dir().join("spectral-openapi-v1.txt")
}

#[tokio::test]
async fn test_unchanged_inputs_skip_every_subprocess() {
    let project = Project::new();
    project.commit_baseline("v1", VIOLATING_SPEC);
    let config = project.config(Mode::ValidateFirst);

    let (first, executor) = run(&project, &config).await;
    assert_eq!(executor.calls_to("spectral"), 1);
    assert_eq!(
        first.documents["v1"].lint,
        Some(LintStatus::Violations { problems: 1 })
    );

    let (second, executor) = run(&project, &config).await;
    assert_eq!(executor.total(), 0);
    assert_eq!(
        second.documents["v1"].lint,
        Some(LintStatus::Cached { problems: 1 })
    );
    assert!(second.has_advisories());
    assert!(
        second
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Lint skipped"))
    );
}

#[tokio::test]
async fn test_strict_policy_still_fails_a_skipped_run_with_prior_warnings() {
    let project = Project::new();
    project.commit_baseline("v1", VIOLATING_SPEC);
    let mut config = project.config(Mode::ValidateFirst);
    config.treat_warnings_as_errors = true;

    let (first, _) = run(&project, &config).await;
    assert_eq!(first.exit_code(), 1);

    let (second, executor) = run(&project, &config).await;
    assert_eq!(executor.total(), 0);
    assert_eq!(second.exit_code(), 1);
}

#[tokio::test]
async fn test_strict_policy_fails_a_skipped_run_whose_report_has_no_result_line() {
    let project = Project::new();
    project.commit_baseline("v1", UNSUMMARISED_SPEC);
    let mut config = project.config(Mode::ValidateFirst);
    config.treat_warnings_as_errors = true;

    let (first, _) = run(&project, &config).await;
    assert_eq!(
        first.documents["v1"].lint,
        Some(LintStatus::Violations { problems: 1 })
    );
    assert_eq!(first.exit_code(), 1);

    let (second, executor) = run(&project, &config).await;
    assert_eq!(executor.total(), 0);
    assert_eq!(
        second.documents["v1"].lint,
        Some(LintStatus::Cached { problems: 1 })
    );
    assert_eq!(second.exit_code(), 1);
}

#[tokio::test]
async fn test_ruleset_change_forces_a_run() {
    let project = Project::new();
    project.commit_baseline("v1", FOO_SPEC);
    let config = project.config(Mode::ValidateFirst);
    run(&project, &config).await;

    let mut ruleset = std::fs::read(project.ruleset()).unwrap();
    ruleset.push(b'\n');
    std::fs::write(project.ruleset(), ruleset).unwrap();

    let (_, executor) = run(&project, &config).await;
    assert_eq!(executor.calls_to("spectral"), 1);
}

#[tokio::test]
async fn test_document_change_forces_a_run() {
    let project = Project::new();
    let baseline = project.commit_baseline("v1", FOO_SPEC);
    let config = project.config(Mode::ValidateFirst);
    run(&project, &config).await;

    std::fs::write(&baseline, FOO_SPEC.replace("3.0.1", "3.0.2")).unwrap();

    let (_, executor) = run(&project, &config).await;
    assert_eq!(executor.calls_to("spectral"), 1);
}

#[tokio::test]
async fn test_missing_report_forces_a_run() {
    let project = Project::new();
    project.commit_baseline("v1", FOO_SPEC);
    let config = project.config(Mode::ValidateFirst);
    run(&project, &config).await;

    std::fs::remove_file(report(&project)).unwrap();

    let (outcome, executor) = run(&project, &config).await;
    assert_eq!(executor.calls_to("spectral"), 1);
    assert!(report(&project).is_file());
    assert_eq!(outcome.documents["v1"].lint, Some(LintStatus::Passed));
}

#[tokio::test]
async fn test_failed_run_keeps_the_previous_checksum() {
    let project = Project::new();
    let baseline = project.commit_baseline("v1", FOO_SPEC);
    let config = project.config(Mode::ValidateFirst);
    run(&project, &config).await;

    std::fs::write(&baseline, "openapi: 3.0.1\nx-lint-crash: true\n").unwrap();
    let (failed, _) = run(&project, &config).await;
    assert!(failed.is_fatal());

    let (again, executor) = run(&project, &config).await;
    assert!(again.is_fatal());
    assert_eq!(executor.calls_to("spectral"), 1);
}

#[tokio::test]
async fn test_checksum_reports_the_skip_decision() {
    let project = Project::new();
    project.commit_baseline("v1", FOO_SPEC);
    let config = project.config(Mode::ValidateFirst);
    let orchestrator = Orchestrator::new(
        config.clone(),
        Arc::new(CountingExecutor::new()),
        Arc::new(OfflineFetcher::new()),
    );
    let cancel = CancellationToken::new();

    let before = orchestrator.checksum(&cancel).await.unwrap();
    assert_eq!(before.reason, ChangeReason::NoPriorChecksum);

    run(&project, &config).await;

    let after = orchestrator.checksum(&cancel).await.unwrap();
    assert_eq!(after.reason, ChangeReason::Unchanged);
    assert_eq!(after.fingerprint, before.fingerprint);
    assert!(!after.must_run());
}
