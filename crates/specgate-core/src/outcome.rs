//! Aggregated result of a validation run.

use crate::Error;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LintStatus {
    Passed,
    Violations { problems: u32 },
    /// Lint was skipped because nothing changed; counts are the ones the
    /// previous run recorded.
    Cached { problems: u32 },
}

impl LintStatus {
    pub fn problems(&self) -> u32 {
        match self {
            LintStatus::Passed => 0,
            LintStatus::Violations { problems } | LintStatus::Cached { problems } => *problems,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiffStatus {
    NoBreakingChanges,
    BreakingChanges,
    /// The diff tool wrote to stderr; the file counts as neither pass nor fail.
    ToolError { message: String },
    /// No generated document with the baseline's file name.
    MissingCounterpart,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentOutcome {
    pub spec_path: Option<PathBuf>,
    pub lint: Option<LintStatus>,
    pub lint_report: Option<PathBuf>,
    pub diff: Option<DiffStatus>,
    pub diff_report: Option<PathBuf>,
}

impl DocumentOutcome {
    pub fn has_lint_violations(&self) -> bool {
        self.lint.as_ref().is_some_and(|l| l.problems() > 0)
    }

    pub fn has_breaking_changes(&self) -> bool {
        matches!(self.diff, Some(DiffStatus::BreakingChanges))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Per-document results plus run-level diagnostics.
///
/// Advisory findings (lint violations, breaking changes) only fail the run
/// when `treat_warnings_as_errors` is set; a fatal error always does.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub treat_warnings_as_errors: bool,
    pub documents: IndexMap<String, DocumentOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub fatal: Option<String>,
}

impl ValidationOutcome {
    pub fn new(treat_warnings_as_errors: bool) -> Self {
        Self {
            treat_warnings_as_errors,
            documents: IndexMap::new(),
            diagnostics: Vec::new(),
            fatal: None,
        }
    }

    pub fn document_mut(&mut self, name: &str) -> &mut DocumentOutcome {
        self.documents.entry(name.to_string()).or_default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    /// Record the error that stopped the pipeline. Only the first one is kept.
    pub fn record_fatal(&mut self, error: &Error) {
        let message = error.to_string();
        self.push(Severity::Error, message.clone());
        if self.fatal.is_none() {
            self.fatal = Some(message);
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    /// Whether any lint violation or breaking change was found.
    pub fn has_advisories(&self) -> bool {
        self.documents
            .values()
            .any(|d| d.has_lint_violations() || d.has_breaking_changes())
    }

    pub fn passed(&self) -> bool {
        !self.is_fatal() && !(self.treat_warnings_as_errors && self.has_advisories())
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// Human-readable pointers to the artifacts that need attention.
    pub fn attention_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        for (name, doc) in &self.documents {
            if doc.has_breaking_changes() {
                items.push(match &doc.diff_report {
                    Some(report) => format!(
                        "breaking changes detected in '{}', see report at {}",
                        name,
                        report.display()
                    ),
                    None => format!("breaking changes detected in '{}'", name),
                });
            }
            if let Some(lint) = &doc.lint
                && lint.problems() > 0
            {
                let report = doc
                    .lint_report
                    .as_ref()
                    .map(|p| format!(", see report at {}", p.display()))
                    .unwrap_or_default();
                items.push(format!(
                    "{} lint problem(s) in '{}'{}",
                    lint.problems(),
                    name,
                    report
                ));
            }
        }
        items
    }
}
