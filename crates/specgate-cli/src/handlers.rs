//! Command handlers.
//!
//! Each handler returns the process exit code.

use crate::config::{DEFAULT_CONFIG_FILE, STARTER_CONFIG};
use console::style;
use specgate_core::{DiffStatus, LintStatus, Severity, ValidationConfig, ValidationOutcome};
use specgate_pipeline::Orchestrator;
use specgate_runner::TokioProcessExecutor;
use specgate_tools::HttpFetcher;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type HandlerResult = Result<i32, Box<dyn std::error::Error>>;

const TOKEN_VARIABLE: &str = "SPECGATE_DOWNLOAD_TOKEN";

fn orchestrator(config: ValidationConfig) -> Orchestrator {
    let mut fetcher = HttpFetcher::new();
    if let Ok(token) = std::env::var(TOKEN_VARIABLE) {
        fetcher = fetcher.with_auth_token(token);
    }
    Orchestrator::new(
        config,
        Arc::new(TokioProcessExecutor::new()),
        Arc::new(fetcher),
    )
}

/// Run the validation pipeline.
pub async fn validate(
    config: ValidationConfig,
    json: bool,
    cancel: &CancellationToken,
) -> HandlerResult {
    let outcome = orchestrator(config).run(cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &ValidationOutcome) {
    for (name, doc) in &outcome.documents {
        let lint = match &doc.lint {
            Some(LintStatus::Passed) => style("lint passed".to_string()).green(),
            Some(LintStatus::Violations { problems }) => {
                style(format!("{} lint problem(s)", problems)).yellow()
            }
            Some(LintStatus::Cached { problems: 0 }) => {
                style("lint unchanged".to_string()).dim()
            }
            Some(LintStatus::Cached { problems }) => {
                style(format!("lint unchanged, {} problem(s)", problems)).yellow()
            }
            None => style("not linted".to_string()).dim(),
        };
        let diff = match &doc.diff {
            Some(DiffStatus::NoBreakingChanges) => style("no breaking changes".to_string()).green(),
            Some(DiffStatus::BreakingChanges) => style("breaking changes".to_string()).red(),
            Some(DiffStatus::ToolError { .. }) => style("diff error".to_string()).yellow(),
            Some(DiffStatus::MissingCounterpart) => style("no counterpart".to_string()).yellow(),
            None => style("not compared".to_string()).dim(),
        };
        println!("  {} {}, {}", style(name).bold(), lint, diff);
    }

    for diagnostic in &outcome.diagnostics {
        match diagnostic.severity {
            Severity::Info => println!("{} {}", style("i").blue(), diagnostic.message),
            Severity::Warning => println!("{} {}", style("!").yellow(), diagnostic.message),
            Severity::Error => {}
        }
    }

    let attention = outcome.attention_items();
    if let Some(fatal) = &outcome.fatal {
        println!("{} Validation failed: {}", style("✗").red(), fatal);
    } else if outcome.passed() {
        println!("{} Validation passed", style("✓").green());
    } else {
        println!(
            "{} Validation failed: warnings are treated as errors",
            style("✗").red()
        );
    }
    for item in attention {
        println!("    - {}", item);
    }
}

/// Install the tools the configuration needs.
pub async fn install(config: ValidationConfig, cancel: &CancellationToken) -> HandlerResult {
    config.validate()?;
    let orchestrator = orchestrator(config);
    let tools = orchestrator.install(cancel).await?;

    for tool in [tools.generator.as_ref(), Some(&tools.linter), tools.diff.as_ref()]
        .into_iter()
        .flatten()
    {
        println!(
            "{} {} {}",
            style("✓").green(),
            style(tool).bold(),
            style(tool.executable.display()).dim()
        );
    }
    Ok(0)
}

/// Print the current lint fingerprint and the skip decision.
pub async fn checksum(config: ValidationConfig, cancel: &CancellationToken) -> HandlerResult {
    let decision = orchestrator(config).checksum(cancel).await?;

    println!("Fingerprint: {}", style(&decision.fingerprint).bold());
    println!("State key:   {}", decision.key);
    if decision.must_run() {
        println!("{} Lint will run: {}", style("▶").cyan(), decision.reason);
    } else {
        println!("{} Lint will be skipped: {}", style("✓").green(), decision.reason);
    }
    Ok(0)
}

/// Write a starter configuration file.
pub fn init(force: bool) -> HandlerResult {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        println!("{} {} already exists", style("!").yellow(), DEFAULT_CONFIG_FILE);
        return Ok(0);
    }

    std::fs::write(path, STARTER_CONFIG)?;
    println!("{} Created {}", style("✓").green(), DEFAULT_CONFIG_FILE);
    Ok(0)
}
