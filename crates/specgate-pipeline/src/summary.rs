//! Parsing of the linter's result line from a stylish report.

use regex::Regex;
use std::sync::LazyLock;

static PROBLEMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+) problems? \((\d+) errors?, (\d+) warnings?, (\d+) infos?, (\d+) hints?\)",
    )
    .expect("valid regex")
});

/// Totals from a report's result line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LintSummary {
    pub problems: u32,
    pub errors: u32,
    pub warnings: u32,
    pub infos: u32,
    pub hints: u32,
}

impl LintSummary {
    /// Parse `✖ 3 problems (1 error, 2 warnings, 0 infos, 0 hints)`.
    /// A "No results" report is a clean summary. Anything else is `None`.
    pub fn parse(report: &str) -> Option<Self> {
        if let Some(caps) = PROBLEMS.captures(report) {
            let n = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
            return Some(Self {
                problems: n(1),
                errors: n(2),
                warnings: n(3),
                infos: n(4),
                hints: n(5),
            });
        }
        report.contains("No results").then(Self::default)
    }

    pub fn is_clean(&self) -> bool {
        self.problems == 0
    }
}

impl std::fmt::Display for LintSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} problems ({} errors, {} warnings, {} infos, {} hints)",
            self.problems, self.errors, self.warnings, self.infos, self.hints
        )
    }
}
