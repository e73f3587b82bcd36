use std::path::PathBuf;

use thiserror::Error;

/// Fatal input-validation failures. Each variant names the offending field or
/// value so the CLI can report it without extra context.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} `{value}`: must contain only letters, digits, `_` and `-` (128 chars max)")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("invalid semantic version `{value}`")]
    InvalidVersion {
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("{role} not found at {path}")]
    MissingFile { role: &'static str, path: PathBuf },

    #[error("instances file must be a JSON array of {{id, config?}} objects or {{\"instances\": [...]}}")]
    MalformedInstanceFile,

    #[error("instance #{index} is missing required field `id`")]
    MissingInstanceId { index: usize },
}

/// Fatal bundler failure, carrying the external bundler's diagnostic verbatim.
#[derive(Debug, Error)]
#[error("bundling {entry} failed: {diagnostic}")]
pub struct BundleError {
    pub entry: PathBuf,
    pub diagnostic: String,
}

/// The one hard failure mode of bundled-output verification. Every other
/// load-time finding is advisory and surfaces as a warning instead.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("bundle {path} does not expose a callable factory export")]
    MissingFactoryExport { path: PathBuf },
}

/// Umbrella error for a packaging run.
#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("packaging i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Umbrella error for a scaffold generation run.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("scaffold i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
