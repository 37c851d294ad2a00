//! The specgate validation pipeline.
//!
//! [`Orchestrator`] installs the tools, then sequences the generator, lint
//! and diff runners according to the configured [`specgate_core::Mode`].

pub mod diff;
pub mod generator;
pub mod lint;
pub mod orchestrator;
pub mod ruleset;
pub mod summary;

pub use diff::{DiffRunner, DiffSummary, diff_report_path};
pub use generator::{GENERATED_MARKER, GeneratedDocument, GeneratorRunner};
pub use lint::{LintRun, LintRunner, lint_report_path, lint_report_paths};
pub use orchestrator::Orchestrator;
pub use ruleset::{ResolvedRuleset, resolve_ruleset};
pub use summary::LintSummary;
