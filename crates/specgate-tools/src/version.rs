//! Generator version detection from the service's build output.

use specgate_core::config::DEFAULT_GENERATOR_VERSION;
use std::path::Path;
use tracing::debug;

const SWAGGER_PACKAGE: &str = "Swashbuckle.AspNetCore.Swagger";

/// Look for the Swashbuckle package version the service was built against.
///
/// Reads every `*.deps.json` in `assembly_dir` and returns the version of the
/// first `Swashbuckle.AspNetCore.Swagger/<version>` library entry. Unreadable
/// or malformed files are ignored.
pub fn detect_generator_version(assembly_dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(assembly_dir).ok()?;

    let mut manifests: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".deps.json"))
        })
        .collect();
    manifests.sort();

    manifests.iter().find_map(|path| {
        let content = std::fs::read_to_string(path).ok()?;
        let json: serde_json::Value = serde_json::from_str(&content).ok()?;
        let version = json
            .get("libraries")?
            .as_object()?
            .keys()
            .find_map(|key| {
                let (name, version) = key.split_once('/')?;
                (name == SWAGGER_PACKAGE && !version.is_empty()).then(|| version.to_string())
            });
        if let Some(v) = &version {
            debug!(manifest = %path.display(), version = %v, "Detected generator version");
        }
        version
    })
}

/// Pick the generator version for a run: an explicit setting wins, then the
/// version detected next to the assembly, then the pinned default.
pub fn resolve_generator_version(configured: Option<&str>, assembly: Option<&Path>) -> String {
    if let Some(version) = configured {
        return version.to_string();
    }
    assembly
        .and_then(Path::parent)
        .and_then(detect_generator_version)
        .unwrap_or_else(|| DEFAULT_GENERATOR_VERSION.to_string())
}
