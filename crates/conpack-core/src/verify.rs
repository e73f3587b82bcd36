use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::ExportError;

/// Outcome of the advisory bundled-output check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The bundle loaded and exposed a callable factory export.
    Verified,
    /// The probe could not run or the bundle faulted while loading. Load-time
    /// faults are often environment-dependent side effects irrelevant to
    /// manifest correctness, so they do not abort packaging.
    Inconclusive,
}

/// Seam for bundled-output verification; tests substitute a stub.
pub trait Verifier {
    fn verify(&self, bundle: &Path) -> impl Future<Output = Result<Verification, ExportError>> + Send;
}

/// Probe script evaluated by node. Imports the bundle as an ES module and
/// inspects its primary export; exit 2 is reserved for the missing/
/// non-callable factory case, exit 3 for load-time faults.
const PROBE_SCRIPT: &str = r#"
const { pathToFileURL } = await import('node:url');
const target = pathToFileURL(process.argv[1]).href;
let mod;
try {
  mod = await import(target);
} catch (err) {
  console.error(String((err && err.stack) || err));
  process.exit(3);
}
const factory = mod.default ?? mod.factory;
if (typeof factory !== 'function') {
  console.error(`no callable factory export in ${target}`);
  process.exit(2);
}
"#;

const EXIT_MISSING_EXPORT: i32 = 2;

/// Verifies a produced bundle by dynamically loading it in a node subprocess.
#[derive(Debug, Clone)]
pub struct NodeVerifier {
    binary: PathBuf,
}

impl NodeVerifier {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("node"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for NodeVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier for NodeVerifier {
    async fn verify(&self, bundle: &Path) -> Result<Verification, ExportError> {
        let absolute = tokio::fs::canonicalize(bundle)
            .await
            .unwrap_or_else(|_| bundle.to_path_buf());
        let output = Command::new(&self.binary)
            .arg("--input-type=module")
            .arg("-e")
            .arg(PROBE_SCRIPT)
            .arg(&absolute)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    bundle = %absolute.display(),
                    error = %err,
                    "could not launch node to verify the bundle; skipping verification"
                );
                return Ok(Verification::Inconclusive);
            }
        };

        if output.status.success() {
            return Ok(Verification::Verified);
        }
        if output.status.code() == Some(EXIT_MISSING_EXPORT) {
            return Err(ExportError::MissingFactoryExport { path: absolute });
        }
        tracing::warn!(
            bundle = %absolute.display(),
            diagnostic = %String::from_utf8_lossy(&output.stderr).trim(),
            "bundle faulted while loading; continuing without verification"
        );
        Ok(Verification::Inconclusive)
    }
}
