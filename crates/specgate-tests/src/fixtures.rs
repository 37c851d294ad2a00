//! Fake tools, sample specifications and throwaway projects.

use specgate_core::{DocumentSet, Mode, ValidationConfig};
use specgate_tools::Toolchain;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes a report; a document containing `x-lint-violation` yields one
/// warning and exit 1, `x-lint-crash` exits without a report.
const SPECTRAL: &str = r#"#!/bin/sh
echo "spectral $*" >> "@LOG@"
doc="$2"
report=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then report="$arg"; fi
  prev="$arg"
done
if [ -z "$report" ]; then echo "missing --output" >&2; exit 2; fi
if grep -q "x-lint-crash" "$doc"; then
  echo "Error running Spectral: ruleset could not be loaded" >&2
  exit 2
fi
if grep -q "x-lint-unsummarised" "$doc"; then
  printf '%s\n  1:1  error  oas3-schema  Schema is invalid.\n' "$doc" > "$report"
  exit 1
fi
if grep -q "x-lint-violation" "$doc"; then
  printf '%s\n  1:1  warning  info-contact  Info object must have "contact" object.\n\n' "$doc" > "$report"
  printf '\342\234\226 1 problem (0 errors, 1 warning, 0 infos, 0 hints)\n' >> "$report"
  exit 1
fi
echo "No results with a severity of 'warn' or higher found!" > "$report"
"#;

/// Line-based stand-in for `oasdiff breaking`: comments, blank lines and
/// excluded elements are dropped, then any baseline line missing from the
/// generated file counts as an error-level change. Added lines are never
/// breaking, as with the real command; plain `oasdiff diff --fail-on-diff`
/// would fail on those too.
const OASDIFF: &str = r#"#!/bin/sh
echo "oasdiff $*" >> "@LOG@"
[ "$1" = "breaking" ] || { echo "unknown command $1" >&2; exit 2; }
base="$2"
gen="$3"
shift 3
exclude=""
fail_on_err=0
while [ $# -gt 0 ]; do
  case "$1" in
    --exclude-elements) exclude="$2"; shift 2 ;;
    --fail-on) [ "$2" = "ERR" ] && fail_on_err=1; shift 2 ;;
    --format) shift 2 ;;
    *) shift ;;
  esac
done
for f in "$base" "$gen"; do
  [ -f "$f" ] || { echo "Error: failed to load spec from $f" >&2; exit 2; }
done
tmp=$(mktemp -d)
normalize() {
  grep -v '^[[:space:]]*#' "$1" | grep -v '^[[:space:]]*$' > "$2"
  for element in $(echo "$exclude" | tr ',' ' '); do
    grep -v "^[[:space:]]*${element}:" "$2" > "$2.tmp"
    mv "$2.tmp" "$2"
  done
}
normalize "$base" "$tmp/base"
normalize "$gen" "$tmp/gen"
removed=$(grep -vxFf "$tmp/gen" "$tmp/base")
rm -rf "$tmp"
if [ -z "$removed" ]; then
  echo "{}"
  exit 0
fi
echo "removed:"
echo "$removed" | sed 's/^/  - "/; s/$/"/'
if [ "$fail_on_err" = 1 ]; then exit 1; fi
"#;

/// Copies `<assembly dir>/openapi-<doc>.source.yaml` to the output path.
/// While `swagger.failures` holds a positive count it fails instead.
const SWAGGER: &str = r#"#!/bin/sh
echo "swagger $*" >> "@LOG@"
[ "$1" = "tofile" ] || exit 2
out="$3"
assembly="$5"
doc="$6"
failures="@DIR@/swagger.failures"
if [ -f "$failures" ]; then
  n=$(cat "$failures")
  if [ "$n" -gt 0 ]; then
    echo $((n - 1)) > "$failures"
    echo "Unhandled exception. System.InvalidOperationException: host failed to start" >&2
    exit 134
  fi
fi
source="$(dirname "$assembly")/openapi-$doc.source.yaml"
[ -f "$source" ] || { echo "Unknown Swagger document $doc" >&2; exit 1; }
cp "$source" "$out"
"#;

/// `dotnet tool install <package> --tool-path <dir> --version <v>`
const DOTNET: &str = r#"#!/bin/sh
echo "dotnet $*" >> "@LOG@"
if [ "$1" != "tool" ] || [ "$2" != "install" ]; then exit 2; fi
mkdir -p "$5"
cp "@DIR@/swagger" "$5/swagger"
chmod +x "$5/swagger"
"#;

/// Baseline exposing `GET /Foo` returning `{ id: integer }`.
pub const FOO_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API
  version: v1
paths:
  /Foo:
    get:
      summary: Gets a foo
      responses:
        '200':
          description: Success
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: integer
"#;

/// [`FOO_SPEC`] plus an optional `name` property.
pub const FOO_WITH_NAME_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API
  version: v1
paths:
  /Foo:
    get:
      summary: Gets a foo
      responses:
        '200':
          description: Success
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: integer
                  name:
                    type: string
"#;

/// [`FOO_SPEC`] with only cosmetic text changed.
pub const FOO_COSMETIC_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API (renamed)
  version: v1
paths:
  /Foo:
    get:
      summary: Fetch a single foo by its identifier
      responses:
        '200':
          description: The foo was found
          content:
            application/json:
              examples: [ { id: 1 } ]
              schema:
                type: object
                properties:
                  id:
                    type: integer
"#;

/// [`FOO_SPEC`] with `/Foo` removed.
pub const NO_FOO_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API
  version: v1
paths: {}
"#;

/// A document the fake linter flags with one warning.
pub const VIOLATING_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API
  version: v1
  x-lint-violation: true
paths: {}
"#;

/// The fake linter fails on this one without writing a result line.
pub const UNSUMMARISED_SPEC: &str = r#"openapi: 3.0.1
info:
  title: Sample API
  version: v1
  x-lint-unsummarised: true
paths: {}
"#;

pub const RULESET: &str = "extends: [[spectral:oas, recommended]]\n";

/// Shell scripts standing in for the external tools.
pub struct FakeTools {
    pub bin_dir: PathBuf,
}

impl FakeTools {
    pub fn write(root: &Path) -> io::Result<Self> {
        let bin_dir = root.join("fake-bin");
        std::fs::create_dir_all(&bin_dir)?;
        let log = bin_dir.join("calls.log");
        std::fs::write(&log, "")?;

        for (name, template) in [
            ("spectral", SPECTRAL),
            ("oasdiff", OASDIFF),
            ("swagger", SWAGGER),
            ("dotnet", DOTNET),
        ] {
            let script = template
                .replace("@LOG@", &log.to_string_lossy())
                .replace("@DIR@", &bin_dir.to_string_lossy());
            write_executable(&bin_dir.join(name), &script)?;
        }
        Ok(Self { bin_dir })
    }

    pub fn path(&self, tool: &str) -> PathBuf {
        self.bin_dir.join(tool)
    }

    pub fn script(&self, tool: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path(tool))
    }

    /// Every recorded invocation, oldest first.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.bin_dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_to(&self, tool: &str) -> usize {
        let prefix = format!("{} ", tool);
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn clear_calls(&self) -> io::Result<()> {
        std::fs::write(self.bin_dir.join("calls.log"), "")
    }

    /// Make the next `times` generator runs fail.
    pub fn fail_generator(&self, times: u32) -> io::Result<()> {
        std::fs::write(self.bin_dir.join("swagger.failures"), times.to_string())
    }

    /// Put the linter and diff scripts where the toolchain expects its
    /// downloaded executables. The generator is left to the fake `dotnet`.
    pub fn preinstall(&self, toolchain: &Toolchain) -> io::Result<()> {
        let mut targets = vec![("spectral", &toolchain.linter)];
        if let Some(diff) = &toolchain.diff {
            targets.push(("oasdiff", diff));
        }
        for (name, tool) in targets {
            std::fs::create_dir_all(&tool.install_dir)?;
            std::fs::copy(self.path(name), &tool.executable)?;
        }
        Ok(())
    }
}

pub fn write_executable(path: &Path, content: &str) -> io::Result<()> {
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// A throwaway service checkout with a ruleset, a fake build output and
/// fake tools.
pub struct Project {
    pub dir: TempDir,
    pub tools: FakeTools,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let tools = FakeTools::write(dir.path()).expect("Failed to write fake tools");
        let project = Self { dir, tools };

        std::fs::write(project.ruleset(), RULESET).expect("Failed to write ruleset");
        std::fs::create_dir_all(project.root().join("bin")).expect("Failed to create bin");
        std::fs::write(project.assembly(), b"MZ").expect("Failed to write assembly");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn assembly(&self) -> PathBuf {
        self.root().join("bin").join("Api.dll")
    }

    pub fn ruleset(&self) -> PathBuf {
        self.root().join(".spectral.yaml")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root().join("reports")
    }

    /// What the service will expose as document `name`.
    pub fn serve(&self, name: &str, spec: &str) {
        std::fs::write(
            self.root().join("bin").join(format!("openapi-{}.source.yaml", name)),
            spec,
        )
        .expect("Failed to write service spec");
    }

    /// Commit a baseline specification for document `name`.
    pub fn commit_baseline(&self, name: &str, spec: &str) -> PathBuf {
        let dir = self.root().join("openapi");
        std::fs::create_dir_all(&dir).expect("Failed to create baseline dir");
        let path = dir.join(format!("openapi-{}.yaml", name));
        std::fs::write(&path, spec).expect("Failed to write baseline");
        path
    }

    /// Configuration pointing at this project and its fake tools. Every
    /// committed baseline is included.
    pub fn config(&self, mode: Mode) -> ValidationConfig {
        let mut baseline = DocumentSet::new();
        if let Ok(entries) = std::fs::read_dir(self.root().join("openapi")) {
            let mut paths: Vec<_> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            paths.sort();
            for path in paths {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.strip_prefix("openapi-"))
                    .unwrap_or_default()
                    .to_string();
                baseline.insert(name, path).expect("Duplicate baseline");
            }
        }

        ValidationConfig {
            mode,
            service_assembly: Some(self.assembly()),
            baseline,
            generated_dir: self.root().join("obj").join("openapi"),
            ruleset: self.ruleset().to_string_lossy().into_owned(),
            tools_dir: self.root().join("tools"),
            reports_dir: self.reports_dir(),
            dotnet: self.tools.path("dotnet"),
            retry_delay_ms: 0,
            ..Default::default()
        }
    }
}
