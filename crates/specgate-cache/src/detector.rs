//! Decides whether a lint run must happen.

use crate::fingerprint::compute_fingerprint;
use crate::keys::state_key;
use crate::store::ChecksumStore;
use crate::types::{ChangeDecision, ChangeReason, ChecksumRecord};
use specgate_core::{DocumentSet, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Compares the current ruleset and documents with the last successful run.
pub struct ChangeDetector {
    store: Arc<dyn ChecksumStore>,
    ruleset_location: String,
    key: String,
}

impl ChangeDetector {
    /// `ruleset_location` is the configured path or URL; it identifies the
    /// state, while the bytes hashed come from the resolved local copy.
    pub fn new(store: Arc<dyn ChecksumStore>, ruleset_location: impl Into<String>) -> Self {
        let ruleset_location = ruleset_location.into();
        let key = state_key(&ruleset_location);
        Self {
            store,
            ruleset_location,
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Compute the current fingerprint and decide whether to run.
    ///
    /// Must run when there is no prior checksum, when it differs, or when
    /// any of `expected_reports` is missing on disk.
    pub async fn evaluate(
        &self,
        ruleset: &Path,
        documents: &DocumentSet,
        expected_reports: &[PathBuf],
    ) -> Result<ChangeDecision> {
        let fingerprint = compute_fingerprint(ruleset, documents).await?;
        let previous = self.store.load(&self.key).await?;

        let reason = match &previous {
            None => ChangeReason::NoPriorChecksum,
            Some(record) if record.fingerprint != fingerprint => ChangeReason::ChecksumChanged,
            Some(record) => {
                let unrecorded = documents
                    .names()
                    .find(|name| !record.problems.contains_key(*name));
                match (expected_reports.iter().find(|p| !p.is_file()), unrecorded) {
                    (Some(missing), _) => ChangeReason::MissingReport(missing.clone()),
                    (None, Some(name)) => ChangeReason::MissingResult(name.to_string()),
                    (None, None) => ChangeReason::Unchanged,
                }
            }
        };

        debug!(key = %self.key, fingerprint = %fingerprint, reason = %reason, "Change detection");

        Ok(ChangeDecision {
            key: self.key.clone(),
            fingerprint,
            reason,
            recorded_problems: previous.map(|r| r.problems).unwrap_or_default(),
        })
    }

    /// Persist the decision's fingerprint with the problem count of every
    /// document. Call only after the run succeeded, so a crashed run keeps
    /// the old checksum and runs again next time.
    pub async fn persist(
        &self,
        decision: &ChangeDecision,
        problems: BTreeMap<String, u32>,
    ) -> Result<()> {
        let record = ChecksumRecord {
            ruleset: self.ruleset_location.clone(),
            fingerprint: decision.fingerprint.clone(),
            recorded_at: chrono::Utc::now(),
            problems,
        };
        self.store.save(&decision.key, &record).await?;
        info!(key = %decision.key, "Lint checksum updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilesystemChecksumStore;

    struct Fixture {
        dir: tempfile::TempDir,
        ruleset: PathBuf,
        documents: DocumentSet,
        report: PathBuf,
        detector: ChangeDetector,
    }

    fn v1_clean() -> BTreeMap<String, u32> {
        BTreeMap::from([("v1".to_string(), 0)])
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ruleset = dir.path().join(".spectral.yaml");
        std::fs::write(&ruleset, "extends: spectral:oas\n").unwrap();
        let spec = dir.path().join("openapi-v1.yaml");
        std::fs::write(&spec, "openapi: 3.0.1\n").unwrap();
        let documents = DocumentSet::from_pairs([("v1", spec)]).unwrap();
        let report = dir.path().join("spectral-openapi-v1.txt");
        let store = Arc::new(FilesystemChecksumStore::new(dir.path().join("state")));
        let detector = ChangeDetector::new(store, ruleset.to_string_lossy());
        Fixture {
            dir,
            ruleset,
            documents,
            report,
            detector,
        }
    }

    #[tokio::test]
    async fn test_first_run_must_run() {
        let f = fixture();
        let decision = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &[f.report.clone()])
            .await
            .unwrap();
        assert!(decision.must_run());
        assert_eq!(decision.reason, ChangeReason::NoPriorChecksum);
    }

    #[tokio::test]
    async fn test_unchanged_after_persist() {
        let f = fixture();
        let reports = [f.report.clone()];
        let decision = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        std::fs::write(&f.report, "No results\n").unwrap();
        f.detector.persist(&decision, v1_clean()).await.unwrap();

        let again = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert!(!again.must_run());
    }

    #[tokio::test]
    async fn test_not_persisting_keeps_forcing_runs() {
        let f = fixture();
        let reports = [f.report.clone()];
        let first = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        f.detector.persist(&first, v1_clean()).await.unwrap();
        std::fs::write(&f.report, "No results\n").unwrap();

        // A run computes a new fingerprint but crashes before persisting it.
        std::fs::write(f.documents.get("v1").unwrap(), "openapi: 3.1.0\n").unwrap();
        let crashed = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert!(crashed.must_run());

        let next = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert_eq!(next.reason, ChangeReason::ChecksumChanged);
    }

    #[tokio::test]
    async fn test_missing_report_forces_run() {
        let f = fixture();
        let reports = [f.report.clone()];
        let decision = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        f.detector.persist(&decision, v1_clean()).await.unwrap();

        let again = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert_eq!(again.reason, ChangeReason::MissingReport(f.report.clone()));
        assert!(f.dir.path().join("state").exists());
    }

    #[tokio::test]
    async fn test_recorded_problems_come_back_with_the_decision() {
        let f = fixture();
        let reports = [f.report.clone()];
        let decision = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        std::fs::write(&f.report, "openapi-v1.yaml\n  1:1  error  oops\n").unwrap();
        f.detector
            .persist(&decision, BTreeMap::from([("v1".to_string(), 4)]))
            .await
            .unwrap();

        let again = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert!(!again.must_run());
        assert_eq!(again.recorded_problems("v1"), 4);
    }

    #[tokio::test]
    async fn test_record_without_document_result_forces_run() {
        let f = fixture();
        let reports = [f.report.clone()];
        let decision = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        std::fs::write(&f.report, "No results\n").unwrap();
        f.detector.persist(&decision, BTreeMap::new()).await.unwrap();

        let again = f
            .detector
            .evaluate(&f.ruleset, &f.documents, &reports)
            .await
            .unwrap();
        assert_eq!(again.reason, ChangeReason::MissingResult("v1".into()));
    }
}
