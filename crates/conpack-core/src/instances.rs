use conpack_manifest::{InstanceSpec, InstancesFile};
use serde_json::Value;

use crate::error::ValidationError;
use crate::validate::validate_version;

/// Defaults and validates the per-tenant instance list.
///
/// `raw` is the parsed instances input (bare array or `{instances: [...]}`);
/// `None` or an empty list yields a single synthetic instance keyed by
/// `fallback_id`. Instance order follows the source list; entries are carried
/// through verbatim apart from version canonicalization.
pub fn normalize_instances(
    raw: Option<Value>,
    fallback_id: &str,
) -> Result<Vec<InstanceSpec>, ValidationError> {
    let items = match raw {
        None => Vec::new(),
        Some(value) => serde_json::from_value::<InstancesFile>(value)
            .map_err(|_| ValidationError::MalformedInstanceFile)?
            .into_items(),
    };

    if items.is_empty() {
        return Ok(vec![InstanceSpec::synthetic(fallback_id)]);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut spec: InstanceSpec = serde_json::from_value(item)
                .map_err(|_| ValidationError::MalformedInstanceFile)?;
            if spec.id.trim().is_empty() {
                return Err(ValidationError::MissingInstanceId { index });
            }
            if let Some(version) = &spec.connector_version {
                spec.connector_version = Some(validate_version(version)?);
            }
            Ok(spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_input_yields_one_synthetic_instance() {
        let instances = normalize_instances(None, "hr").unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "hr");
        assert_eq!(instances[0].config, Some(json!({})));
        assert!(instances[0].connector_version.is_none());
    }

    #[test]
    fn empty_list_also_yields_the_synthetic_instance() {
        let instances = normalize_instances(Some(json!([])), "x").unwrap();
        assert_eq!(instances, vec![InstanceSpec::synthetic("x")]);
    }

    #[test]
    fn instances_pass_through_in_order() {
        let raw = json!([{"id": "a"}, {"id": "b", "connectorVersion": "2.0.0"}]);
        let instances = normalize_instances(Some(raw), "x").unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].id, "a");
        assert_eq!(instances[1].id, "b");
        assert_eq!(instances[1].connector_version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn wrapped_shape_is_unwrapped() {
        let raw = json!({"instances": [{"id": "tenant-1", "config": {"url": "x"}}]});
        let instances = normalize_instances(Some(raw), "x").unwrap();
        assert_eq!(instances[0].id, "tenant-1");
        assert_eq!(instances[0].config, Some(json!({"url": "x"})));
    }

    #[test]
    fn missing_id_reports_the_offending_index() {
        let err = normalize_instances(Some(json!([{"id": "ok"}, {}])), "x").unwrap_err();
        assert!(matches!(err, ValidationError::MissingInstanceId { index: 1 }));
        let err = normalize_instances(Some(json!([{}])), "x").unwrap_err();
        assert!(matches!(err, ValidationError::MissingInstanceId { index: 0 }));
    }

    #[test]
    fn unknown_instance_fields_are_carried_verbatim() {
        let raw = json!([{"id": "acme", "config": {}, "region": "eu"}]);
        let instances = normalize_instances(Some(raw), "x").unwrap();
        let out = serde_json::to_value(&instances).unwrap();
        assert_eq!(out[0]["region"], "eu");
        assert_eq!(out[0]["id"], "acme");
        assert_eq!(out[0]["config"], json!({}));
    }

    #[test]
    fn connector_version_override_is_canonicalized() {
        let raw = json!([{"id": "a", "connectorVersion": "v3.1.0"}]);
        let instances = normalize_instances(Some(raw), "x").unwrap();
        assert_eq!(instances[0].connector_version.as_deref(), Some("3.1.0"));
    }

    #[test]
    fn bad_connector_version_fails_as_invalid_version() {
        let raw = json!([{"id": "a", "connectorVersion": "not-semver"}]);
        assert!(matches!(
            normalize_instances(Some(raw), "x"),
            Err(ValidationError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn other_shapes_are_malformed() {
        assert!(matches!(
            normalize_instances(Some(json!("nope")), "x"),
            Err(ValidationError::MalformedInstanceFile)
        ));
        assert!(matches!(
            normalize_instances(Some(json!({"tenants": []})), "x"),
            Err(ValidationError::MalformedInstanceFile)
        ));
        assert!(matches!(
            normalize_instances(Some(json!(["not-an-object"])), "x"),
            Err(ValidationError::MalformedInstanceFile)
        ));
    }
}
