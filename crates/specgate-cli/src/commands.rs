//! CLI command definitions.

use clap::{Args, Subcommand, ValueEnum};
use specgate_core::Mode;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate, lint and diff OpenAPI specifications
    Validate {
        #[command(flatten)]
        overrides: Overrides,

        /// Print the outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Install the external tools without validating
    Install {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the lint fingerprint and whether the next run would lint
    Checksum {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Write a starter specgate.yaml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Which artifact gets linted
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Compiled service assembly
    #[arg(long)]
    pub assembly: Option<PathBuf>,

    /// Ruleset path or URL
    #[arg(long)]
    pub ruleset: Option<String>,

    /// Tools directory
    #[arg(long)]
    pub tools_dir: Option<PathBuf>,

    /// Reports directory
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Fail the run on lint violations or breaking changes
    #[arg(long)]
    pub strict: bool,

    /// Skip the baseline comparison
    #[arg(long)]
    pub no_diff: bool,

    /// Force CI output formatting on or off
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub ci: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    GenerateFirst,
    ValidateFirst,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::GenerateFirst => Mode::GenerateFirst,
            ModeArg::ValidateFirst => Mode::ValidateFirst,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
