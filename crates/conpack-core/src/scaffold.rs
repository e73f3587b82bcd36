use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use conpack_manifest::{InstanceSpec, Manifest};
use serde::Serialize;
use serde_json::Value;
use tokio::fs;

use crate::error::ScaffoldError;
use crate::package::{build_manifest, ConnectorIdentity};
use crate::template::{render, TemplateContext, TemplateValue};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.ts.tmpl");
const CONFIG_TEMPLATE: &str = include_str!("../templates/config.ts.tmpl");

/// Inputs for one scaffold generation run. Operation and object-class order
/// is preserved into the generated code and manifest.
#[derive(Debug, Clone)]
pub struct ScaffoldSpec {
    pub name: String,
    pub version: String,
    pub connector_type: String,
    pub directory: PathBuf,
    pub operations: Vec<String>,
    pub object_classes: Vec<String>,
}

/// Generated package descriptor; field order matches what connector authors
/// expect to see in `package.json`.
#[derive(Debug, Serialize)]
struct PackageDescriptor<'a> {
    name: String,
    version: &'a str,
    #[serde(rename = "type")]
    module_type: &'static str,
    main: &'static str,
    dependencies: serde_json::Map<String, Value>,
}

/// Generates a brand-new connector source tree: index module, config module,
/// package descriptor and manifest. Writes are independent; a failure leaves
/// earlier artifacts in place.
pub async fn generate_scaffold(spec: &ScaffoldSpec) -> Result<Vec<PathBuf>, ScaffoldError> {
    let identity = ConnectorIdentity::new(&spec.name, &spec.connector_type, &spec.version)?;
    let operations = cleaned(&spec.operations);
    let object_classes = cleaned(&spec.object_classes);

    fs::create_dir_all(&spec.directory).await?;

    let index = render_index(&identity.name, &operations, &object_classes);
    let config = render_config(&identity.name);
    let package = package_descriptor(&identity)?;
    let manifest = scaffold_manifest(&identity)
        .to_json_pretty()
        .map_err(|source| ScaffoldError::Serialize {
            artifact: "manifest.json",
            source,
        })?;

    let mut written = Vec::new();
    for (file, contents) in [
        ("index.ts", index),
        ("config.ts", config),
        ("package.json", package),
        ("manifest.json", manifest),
    ] {
        let path = spec.directory.join(file);
        fs::write(&path, contents).await?;
        tracing::info!(path = %path.display(), "wrote scaffold artifact");
        written.push(path);
    }
    Ok(written)
}

/// The manifest a fresh scaffold ships with: entry and config point at the
/// source modules (packaging rewrites them to bundle paths later) and a
/// single default instance is declared.
pub fn scaffold_manifest(identity: &ConnectorIdentity) -> Manifest {
    build_manifest(
        identity,
        "./index.ts",
        Some("./config.ts"),
        vec![InstanceSpec::synthetic(&identity.name)],
    )
}

fn package_descriptor(identity: &ConnectorIdentity) -> Result<String, ScaffoldError> {
    let descriptor = PackageDescriptor {
        name: format!("{}-connector", identity.name),
        version: &identity.version,
        module_type: "module",
        main: "./index.ts",
        dependencies: serde_json::Map::new(),
    };
    serde_json::to_string_pretty(&descriptor)
        .map(|json| format!("{json}\n"))
        .map_err(|source| ScaffoldError::Serialize {
            artifact: "package.json",
            source,
        })
}

fn render_index(name: &str, operations: &[String], object_classes: &[String]) -> String {
    let supports = operations
        .iter()
        .map(|op| format!("\"{}\"", op.to_uppercase()))
        .collect::<Vec<_>>()
        .join(", ");

    let definitions = object_classes
        .iter()
        .map(|oc| {
            let mut fields = BTreeMap::new();
            fields.insert("objectClass".to_string(), oc.clone());
            fields.insert("supports".to_string(), supports.clone());
            fields
        })
        .collect();

    let mut methods = Vec::new();
    let mut generated_ops = Vec::new();
    for op in operations {
        if let Some(code) = render_operation(op, object_classes) {
            methods.push(code);
            generated_ops.push(op.as_str());
        }
    }
    let methods = methods.join("\n");

    // Only operations that produced a method are wired into the SPI object.
    let exports = generated_ops
        .iter()
        .map(|op| {
            let verb = op.to_lowercase();
            // `delete` is a reserved word; the template names the function `del`.
            if verb == "delete" {
                "delete: del".to_string()
            } else {
                verb
            }
        })
        .collect::<Vec<_>>()
        .join(",\n    ");

    let mut ctx = TemplateContext::new();
    ctx.insert(
        "connectorName".into(),
        TemplateValue::scalar(capitalize(name)),
    );
    ctx.insert("objectClassDefinition".into(), TemplateValue::List(definitions));
    ctx.insert("operationMethods".into(), TemplateValue::scalar(methods));
    ctx.insert("operationExports".into(), TemplateValue::scalar(exports));
    render(INDEX_TEMPLATE, &ctx)
}

fn render_config(name: &str) -> String {
    let mut ctx = TemplateContext::new();
    ctx.insert(
        "connectorName".into(),
        TemplateValue::scalar(capitalize(name)),
    );
    render(CONFIG_TEMPLATE, &ctx)
}

/// Renders one operation body, expanding its object-class block once per
/// class. Unknown verbs are skipped with a warning; scaffold generation is
/// best-effort per operation.
fn render_operation(operation: &str, object_classes: &[String]) -> Option<String> {
    let Some(template) = operation_template(operation) else {
        tracing::warn!(
            operation,
            "no template for operation; it will not be generated"
        );
        return None;
    };
    let cases = object_classes
        .iter()
        .map(|oc| {
            let mut fields = BTreeMap::new();
            fields.insert("objectClass".to_string(), oc.clone());
            fields
        })
        .collect();
    let mut ctx = TemplateContext::new();
    ctx.insert("objectClassCase".into(), TemplateValue::List(cases));
    Some(render(template, &ctx))
}

fn operation_template(operation: &str) -> Option<&'static str> {
    match operation.to_lowercase().as_str() {
        "create" => Some(include_str!("../templates/operation_create.ts.tmpl")),
        "get" => Some(include_str!("../templates/operation_get.ts.tmpl")),
        "update" => Some(include_str!("../templates/operation_update.ts.tmpl")),
        "delete" => Some(include_str!("../templates/operation_delete.ts.tmpl")),
        "search" => Some(include_str!("../templates/operation_search.ts.tmpl")),
        "sync" => Some(include_str!("../templates/operation_sync.ts.tmpl")),
        _ => None,
    }
}

fn cleaned(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default scaffold directory mirroring the generator's prompt default.
pub fn default_directory(name: &str, version: &str) -> PathBuf {
    Path::new("src").join(format!("{name}-{version}"))
}
