//! Checksum state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hex-encoded SHA-256 over a ruleset and a document set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted state of the last successful lint run for one ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    /// Ruleset location the fingerprint was computed for.
    pub ruleset: String,
    pub fingerprint: Fingerprint,
    pub recorded_at: DateTime<Utc>,
    /// Problems the run found, by document name. Replayed when the next run
    /// is skipped.
    #[serde(default)]
    pub problems: BTreeMap<String, u32>,
}

/// Why a lint run must happen, or that it may be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    NoPriorChecksum,
    ChecksumChanged,
    /// A report from the previous run is gone.
    MissingReport(std::path::PathBuf),
    /// The stored record has no result for this document.
    MissingResult(String),
    Unchanged,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeReason::NoPriorChecksum => write!(f, "no previous checksum"),
            ChangeReason::ChecksumChanged => write!(f, "ruleset or documents changed"),
            ChangeReason::MissingReport(path) => {
                write!(f, "report {} is missing", path.display())
            }
            ChangeReason::MissingResult(name) => {
                write!(f, "no recorded result for document '{}'", name)
            }
            ChangeReason::Unchanged => write!(f, "nothing changed since the last run"),
        }
    }
}

/// Result of comparing the current inputs against the stored checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDecision {
    pub key: String,
    pub fingerprint: Fingerprint,
    pub reason: ChangeReason,
    /// Per-document problem counts from the stored record.
    pub recorded_problems: BTreeMap<String, u32>,
}

impl ChangeDecision {
    pub fn must_run(&self) -> bool {
        self.reason != ChangeReason::Unchanged
    }

    /// Problems the last run recorded for `document`.
    pub fn recorded_problems(&self, document: &str) -> u32 {
        self.recorded_problems.get(document).copied().unwrap_or(0)
    }
}
