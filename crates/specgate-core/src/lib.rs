//! specgate core
//!
//! Core domain types, traits, and error handling for specgate.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the runner, cache, tools and pipeline crates.

pub mod config;
pub mod document;
pub mod error;
pub mod outcome;
pub mod platform;
pub mod ports;
pub mod process;
pub mod tool;

pub use config::{Mode, ToolSources, ToolVersions, ValidationConfig};
pub use document::DocumentSet;
pub use error::{Error, Result};
pub use outcome::{Diagnostic, DiffStatus, DocumentOutcome, LintStatus, Severity, ValidationOutcome};
pub use platform::{Arch, Os, Platform};
pub use ports::{ArtifactFetcher, ProcessExecutor};
pub use process::{ProcessInvocation, ProcessResult};
pub use tool::{ToolDescriptor, ToolKind};
