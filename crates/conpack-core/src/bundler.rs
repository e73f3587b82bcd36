use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::BundleError;

/// Fixed profile applied to every connector artifact: node platform, ESM
/// output, inlined dependencies, legal comments stripped.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub minify: bool,
    pub sourcemap: bool,
    pub target: String,
    pub format: String,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            minify: false,
            sourcemap: true,
            target: "node18".into(),
            format: "esm".into(),
        }
    }
}

/// Seam for the external code bundler. The production implementation shells
/// out to esbuild; tests substitute a stub.
pub trait Bundler {
    fn bundle(
        &self,
        entry: &Path,
        outfile: &Path,
        options: &BundleOptions,
    ) -> impl Future<Output = Result<(), BundleError>> + Send;
}

/// Invokes the esbuild binary found on `PATH` (or at an explicit location).
/// Failures are fatal and never retried; esbuild's stderr is carried verbatim.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    binary: PathBuf,
}

impl EsbuildBundler {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("esbuild"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for EsbuildBundler {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundler for EsbuildBundler {
    async fn bundle(
        &self,
        entry: &Path,
        outfile: &Path,
        options: &BundleOptions,
    ) -> Result<(), BundleError> {
        let mut command = Command::new(&self.binary);
        command
            .arg(entry)
            .arg("--bundle")
            .arg("--platform=node")
            .arg(format!("--format={}", options.format))
            .arg(format!("--target={}", options.target))
            .arg("--legal-comments=none")
            .arg(format!("--outfile={}", outfile.display()))
            .stdin(Stdio::null());
        if options.sourcemap {
            command.arg("--sourcemap");
        }
        if options.minify {
            command.arg("--minify");
        }

        tracing::debug!(entry = %entry.display(), outfile = %outfile.display(), "invoking esbuild");
        let output = command.output().await.map_err(|err| BundleError {
            entry: entry.to_path_buf(),
            diagnostic: format!("failed to launch esbuild: {err}"),
        })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostic = if stderr.is_empty() {
                format!("esbuild exited with {}", output.status)
            } else {
                stderr
            };
            Err(BundleError {
                entry: entry.to_path_buf(),
                diagnostic,
            })
        }
    }
}
