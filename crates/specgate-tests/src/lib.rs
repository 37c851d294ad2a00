//! Integration test infrastructure for specgate.
//!
//! Fake `spectral`, `oasdiff`, `swagger` and `dotnet` executables are shell
//! scripts written into a temporary project, so the pipeline runs real
//! subprocesses without any network or .NET SDK.
//!
//! # Usage
//!
//! ```ignore
//! use specgate_tests::Project;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let project = Project::new();
//!     let config = project.config(Mode::GenerateFirst);
//!     // Build an Orchestrator over config and run it.
//! }
//! ```

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,specgate_pipeline=debug")),
        )
        .with_test_writer()
        .try_init();
}
