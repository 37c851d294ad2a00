//! Change detection for specgate lint runs.
//!
//! A fingerprint over the ruleset and the linted documents is persisted after
//! every successful lint run. The next run compares against it to decide
//! whether the linter needs to be invoked at all.

pub mod detector;
pub mod fingerprint;
pub mod keys;
pub mod store;
pub mod types;

pub use detector::ChangeDetector;
pub use fingerprint::compute_fingerprint;
pub use keys::{sanitize_key, state_key};
pub use store::{ChecksumStore, FilesystemChecksumStore};
pub use types::{ChangeDecision, ChangeReason, ChecksumRecord, Fingerprint};
