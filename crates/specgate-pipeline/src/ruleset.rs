//! Lint ruleset resolution.

use specgate_cache::state_key;
use specgate_core::{ArtifactFetcher, Error, Result};
use specgate_runner::{RetryPolicy, retry};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A ruleset available as a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuleset {
    /// Configured path or URL. Identifies the checksum state.
    pub location: String,
    /// Local file handed to the linter and hashed for change detection.
    pub path: PathBuf,
    pub remote: bool,
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Where a remote ruleset is cached under the tools directory.
pub fn cached_ruleset_path(tools_dir: &Path, url: &str) -> PathBuf {
    tools_dir
        .join("rulesets")
        .join(format!("{}.yaml", state_key(url)))
}

/// Make the ruleset available locally.
///
/// Remote rulesets are downloaded on every run. When the download fails
/// and an earlier copy exists, that copy is used instead.
pub async fn resolve_ruleset(
    location: &str,
    tools_dir: &Path,
    fetcher: &dyn ArtifactFetcher,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<ResolvedRuleset> {
    if !is_remote(location) {
        let path = PathBuf::from(location);
        if !path.is_file() {
            return Err(Error::Config(format!(
                "ruleset {} does not exist",
                path.display()
            )));
        }
        return Ok(ResolvedRuleset {
            location: location.to_string(),
            path,
            remote: false,
        });
    }

    let path = cached_ruleset_path(tools_dir, location);
    info!(url = %location, "Downloading ruleset");
    let downloaded = retry(policy, "download ruleset", cancel, |_| {
        fetcher.download(location, &path, cancel)
    })
    .await;

    match downloaded {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) if path.is_file() => {
            warn!(url = %location, error = %e, cached = %path.display(), "Using previously downloaded ruleset");
        }
        Err(e) => return Err(e),
    }

    Ok(ResolvedRuleset {
        location: location.to_string(),
        path,
        remote: true,
    })
}
