use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk JSON manifest written next to each packaged connector bundle.
///
/// Field order is a compatibility contract with the host runtime:
/// `id, type, version, entry, config?, instances`. The `config` key is
/// present iff a config module was bundled alongside the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    #[serde(rename = "type")]
    pub connector_type: String,
    pub version: String,
    pub entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub instances: Vec<InstanceSpec>,
}

/// One named activation of a connector package. Fields beyond the known
/// three are carried through verbatim so the host sees exactly what the
/// instances file declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSpec {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(rename = "connectorVersion", skip_serializing_if = "Option::is_none")]
    pub connector_version: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl InstanceSpec {
    /// Synthetic instance used when a package declares no instances of its own.
    pub fn synthetic(id: &str) -> Self {
        Self {
            id: id.to_string(),
            config: Some(Value::Object(serde_json::Map::new())),
            connector_version: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Accepted shapes for an instances input file: either a bare JSON array of
/// instance objects or an object wrapping them under an `instances` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InstancesFile {
    Bare(Vec<Value>),
    Wrapped { instances: Vec<Value> },
}

impl InstancesFile {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            InstancesFile::Bare(items) => items,
            InstancesFile::Wrapped { instances } => instances,
        }
    }
}

impl Manifest {
    /// Exact bytes persisted to `manifest.json`: pretty JSON plus a trailing
    /// newline.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        Ok(format!("{}\n", serde_json::to_string_pretty(self)?))
    }

    pub fn instance(&self, id: &str) -> Option<&InstanceSpec> {
        self.instances.iter().find(|instance| instance.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_serializes_fields_in_host_order() {
        let manifest = Manifest {
            id: "hr".into(),
            connector_type: "hr".into(),
            version: "1.2.3".into(),
            entry: "./index.js".into(),
            config: None,
            instances: vec![InstanceSpec::synthetic("hr")],
        };
        let expected = r#"{
  "id": "hr",
  "type": "hr",
  "version": "1.2.3",
  "entry": "./index.js",
  "instances": [
    {
      "id": "hr",
      "config": {}
    }
  ]
}
"#;
        assert_eq!(manifest.to_json_pretty().unwrap(), expected);
    }

    #[test]
    fn config_key_appears_between_entry_and_instances() {
        let manifest = Manifest {
            id: "crm".into(),
            connector_type: "crm".into(),
            version: "2.0.0".into(),
            entry: "./index.js".into(),
            config: Some("./config.js".into()),
            instances: vec![InstanceSpec::synthetic("crm")],
        };
        let json = manifest.to_json_pretty().unwrap();
        let entry_pos = json.find("\"entry\"").unwrap();
        let config_pos = json.find("\"config\": \"./config.js\"").unwrap();
        let instances_pos = json.find("\"instances\"").unwrap();
        assert!(entry_pos < config_pos && config_pos < instances_pos);
    }

    #[test]
    fn instances_file_accepts_both_shapes() {
        let bare: InstancesFile = serde_json::from_str(r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(bare.into_items().len(), 1);
        let wrapped: InstancesFile =
            serde_json::from_str(r#"{"instances":[{"id":"a"},{"id":"b"}]}"#).unwrap();
        assert_eq!(wrapped.into_items().len(), 2);
        assert!(serde_json::from_str::<InstancesFile>(r#""nope""#).is_err());
    }

    #[test]
    fn unknown_instance_fields_round_trip() {
        let spec: InstanceSpec =
            serde_json::from_str(r#"{"id":"acme","config":{},"region":"eu"}"#).unwrap();
        assert_eq!(spec.extra.get("region"), Some(&Value::String("eu".into())));
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["region"], "eu");
        assert_eq!(value["id"], "acme");
        assert_eq!(value["config"], serde_json::json!({}));
    }

    #[test]
    fn instances_are_looked_up_by_id() {
        let manifest = Manifest {
            id: "hr".into(),
            connector_type: "hr".into(),
            version: "1.0.0".into(),
            entry: "./index.js".into(),
            config: None,
            instances: vec![InstanceSpec::synthetic("a"), InstanceSpec::synthetic("b")],
        };
        assert_eq!(manifest.instance("b").map(|i| i.id.as_str()), Some("b"));
        assert!(manifest.instance("c").is_none());
    }

    #[test]
    fn instance_spec_roundtrips_connector_version() {
        let spec: InstanceSpec =
            serde_json::from_str(r#"{"id":"b","connectorVersion":"2.0.0"}"#).unwrap();
        assert_eq!(spec.connector_version.as_deref(), Some("2.0.0"));
        assert!(spec.config.is_none());
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"connectorVersion\":\"2.0.0\""));
        assert!(!json.contains("\"config\""));
    }
}
