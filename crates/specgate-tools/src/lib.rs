//! Installation of the external tools specgate drives.
//!
//! Each tool has a descriptor resolved once from configuration and an
//! installer that makes the descriptor's executable exist on disk.

pub mod archive;
pub mod diff;
pub mod fetcher;
pub mod generator;
pub mod installer;
pub mod linter;
pub mod toolchain;
pub mod version;

pub use archive::{ArchiveKind, extract_archive};
pub use fetcher::HttpFetcher;
pub use installer::{InstallContext, InstallState, Installation, ToolInstaller, ensure_installed};
pub use toolchain::{InstalledTools, Toolchain};
pub use version::{detect_generator_version, resolve_generator_version};
