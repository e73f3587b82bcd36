use std::{path::Path, sync::OnceLock};

use regex::Regex;
use semver::Version;
use tokio::fs;

use crate::error::ValidationError;

const MAX_IDENTIFIER_LEN: usize = 128;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

fn validate_identifier<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    if value.len() <= MAX_IDENTIFIER_LEN && identifier_regex().is_match(value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// Validates a connector name; returns the input unchanged on success.
pub fn validate_name(value: &str) -> Result<&str, ValidationError> {
    validate_identifier("name", value)
}

/// Validates a connector type token; returns the input unchanged on success.
pub fn validate_type(value: &str) -> Result<&str, ValidationError> {
    validate_identifier("type", value)
}

/// Parses `value` as a semantic version and returns its canonical form.
/// A leading `=` or `v` and surrounding whitespace are tolerated, so the
/// function is idempotent over its own output.
pub fn validate_version(value: &str) -> Result<String, ValidationError> {
    let mut cleaned = value.trim();
    if let Some(rest) = cleaned.strip_prefix('=') {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_prefix('v') {
        cleaned = rest;
    }
    Version::parse(cleaned)
        .map(|version| version.to_string())
        .map_err(|source| ValidationError::InvalidVersion {
            value: value.to_string(),
            source,
        })
}

/// Requires `path` to be a regular file and warns when its source text has no
/// recognizable export marker. The marker scan is a heuristic sanity check,
/// not a semantic guarantee; the bundled-output verifier has the final word.
pub async fn validate_entry_point(path: &Path) -> Result<(), ValidationError> {
    require_file("entry point", path).await?;
    if let Ok(source) = fs::read_to_string(path).await {
        if !has_export_marker(&source) {
            tracing::warn!(
                path = %path.display(),
                "entry point has no recognizable export; the bundle may not expose a factory"
            );
        }
    }
    Ok(())
}

/// Requires `path` to be a regular file.
pub async fn validate_config_file(path: &Path) -> Result<(), ValidationError> {
    require_file("config module", path).await
}

/// Requires the optional instances input to be a regular file.
pub async fn validate_instances_file(path: &Path) -> Result<(), ValidationError> {
    require_file("instances file", path).await
}

async fn require_file(role: &'static str, path: &Path) -> Result<(), ValidationError> {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        _ => Err(ValidationError::MissingFile {
            role,
            path: path.to_path_buf(),
        }),
    }
}

fn has_export_marker(source: &str) -> bool {
    source.contains("export default")
        || source.contains("module.exports")
        || source.contains("export ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_identifier_grammar() {
        assert_eq!(validate_name("my-connector_1").unwrap(), "my-connector_1");
        assert!(matches!(
            validate_name("my connector"),
            Err(ValidationError::InvalidIdentifier { field: "name", .. })
        ));
        assert!(validate_name("").is_err());
        let overlong = "a".repeat(129);
        assert!(validate_name(&overlong).is_err());
        assert!(validate_name(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn type_errors_name_the_type_field() {
        assert!(matches!(
            validate_type("no/slashes"),
            Err(ValidationError::InvalidIdentifier { field: "type", .. })
        ));
    }

    #[test]
    fn version_is_canonicalized_and_idempotent() {
        assert_eq!(validate_version("1.0.0").unwrap(), "1.0.0");
        assert_eq!(validate_version("v1.2.3").unwrap(), "1.2.3");
        assert_eq!(validate_version(" 1.2.3-rc.1 ").unwrap(), "1.2.3-rc.1");
        let once = validate_version("v2.0.0").unwrap();
        assert_eq!(validate_version(&once).unwrap(), once);
    }

    #[test]
    fn unparseable_versions_are_rejected() {
        assert!(matches!(
            validate_version("bad"),
            Err(ValidationError::InvalidVersion { .. })
        ));
        assert!(validate_version("1.2").is_err());
    }

    #[tokio::test]
    async fn entry_point_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("index.ts");
        assert!(matches!(
            validate_entry_point(&missing).await,
            Err(ValidationError::MissingFile { role: "entry point", .. })
        ));
        std::fs::write(&missing, "export default async function factory() {}").unwrap();
        assert!(validate_entry_point(&missing).await.is_ok());
    }

    #[tokio::test]
    async fn config_and_instances_probes_require_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_config_file(dir.path()).await,
            Err(ValidationError::MissingFile { role: "config module", .. })
        ));
        let file = dir.path().join("instances.json");
        std::fs::write(&file, "[]").unwrap();
        assert!(validate_instances_file(&file).await.is_ok());
    }

    #[test]
    fn export_marker_heuristic_recognizes_common_shapes() {
        assert!(has_export_marker("export default factory;"));
        assert!(has_export_marker("module.exports = factory;"));
        assert!(has_export_marker("export const factory = 1;"));
        assert!(!has_export_marker("const factory = 1;"));
    }
}
