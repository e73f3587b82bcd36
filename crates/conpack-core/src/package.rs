use std::path::{Path, PathBuf};

use conpack_manifest::{InstanceSpec, Manifest};
use serde_json::Value;
use tokio::fs;

use crate::bundler::{BundleOptions, Bundler, EsbuildBundler};
use crate::error::{PackError, ValidationError};
use crate::instances::normalize_instances;
use crate::validate;
use crate::verify::{NodeVerifier, Verification, Verifier};

pub const ENTRY_ARTIFACT: &str = "./index.js";
pub const CONFIG_ARTIFACT: &str = "./config.js";

/// Validated `{name, type, version}` triple; constructed once per packaging
/// run and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ConnectorIdentity {
    pub name: String,
    pub connector_type: String,
    pub version: String,
}

impl ConnectorIdentity {
    pub fn new(name: &str, connector_type: &str, version: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validate::validate_name(name)?.to_string(),
            connector_type: validate::validate_type(connector_type)?.to_string(),
            version: validate::validate_version(version)?,
        })
    }
}

/// Inputs to one packaging run. `entry` and `config` are relative to `src`.
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub src: PathBuf,
    pub name: String,
    pub connector_type: String,
    pub version: String,
    pub entry: PathBuf,
    pub config: Option<PathBuf>,
    pub instances: Option<PathBuf>,
    pub minify: bool,
}

/// Artifacts produced by a successful run, for CLI reporting.
#[derive(Debug)]
pub struct PackReport {
    pub out_dir: PathBuf,
    pub artifacts: Vec<PathBuf>,
    pub manifest: Manifest,
}

/// Assembles the manifest document from validated inputs. Pure; instance
/// entries are carried through verbatim.
pub fn build_manifest(
    identity: &ConnectorIdentity,
    entry: &str,
    config: Option<&str>,
    instances: Vec<InstanceSpec>,
) -> Manifest {
    Manifest {
        id: identity.name.clone(),
        connector_type: identity.connector_type.clone(),
        version: identity.version.clone(),
        entry: entry.to_string(),
        config: config.map(str::to_string),
        instances,
    }
}

/// Runs the packaging pipeline: validate inputs, bundle, verify, normalize
/// instances, emit the manifest. Fail-fast; the manifest is only written once
/// every fatal check has passed.
pub struct Packager<B, V> {
    bundler: B,
    verifier: V,
}

impl Packager<EsbuildBundler, NodeVerifier> {
    /// Production toolchain: esbuild for bundling, node for verification.
    pub fn with_default_toolchain() -> Self {
        Self::new(EsbuildBundler::new(), NodeVerifier::new())
    }
}

impl<B: Bundler, V: Verifier> Packager<B, V> {
    pub fn new(bundler: B, verifier: V) -> Self {
        Self { bundler, verifier }
    }

    pub async fn pack(
        &self,
        request: &PackRequest,
        dist_root: &Path,
    ) -> Result<PackReport, PackError> {
        let identity =
            ConnectorIdentity::new(&request.name, &request.connector_type, &request.version)?;

        let entry_src = request.src.join(&request.entry);
        validate::validate_entry_point(&entry_src).await?;
        let config_src = request.config.as_ref().map(|rel| request.src.join(rel));
        if let Some(path) = &config_src {
            validate::validate_config_file(path).await?;
        }
        if let Some(path) = &request.instances {
            validate::validate_instances_file(path).await?;
        }

        let out_dir = dist_root.join(&identity.name);
        fs::create_dir_all(&out_dir).await?;

        let options = BundleOptions {
            minify: request.minify,
            ..BundleOptions::default()
        };

        let entry_out = out_dir.join("index.js");
        self.bundler.bundle(&entry_src, &entry_out, &options).await?;
        tracing::info!(artifact = %entry_out.display(), "bundled entry module");
        let mut artifacts = vec![entry_out.clone()];

        let mut config_rel = None;
        if let Some(path) = &config_src {
            let config_out = out_dir.join("config.js");
            self.bundler.bundle(path, &config_out, &options).await?;
            tracing::info!(artifact = %config_out.display(), "bundled config module");
            artifacts.push(config_out);
            config_rel = Some(CONFIG_ARTIFACT);
        }

        match self.verifier.verify(&entry_out).await? {
            Verification::Verified => {
                tracing::debug!("bundle exposes a callable factory export");
            }
            Verification::Inconclusive => {}
        }

        let raw = self.load_instances(request).await?;
        let instances = normalize_instances(raw, &identity.name)?;

        let manifest = build_manifest(&identity, ENTRY_ARTIFACT, config_rel, instances);
        let manifest_path = out_dir.join("manifest.json");
        fs::write(&manifest_path, manifest.to_json_pretty()?).await?;
        tracing::info!(path = %manifest_path.display(), "wrote manifest");
        artifacts.push(manifest_path);

        Ok(PackReport {
            out_dir,
            artifacts,
            manifest,
        })
    }

    async fn load_instances(&self, request: &PackRequest) -> Result<Option<Value>, PackError> {
        let Some(path) = &request.instances else {
            return Ok(None);
        };
        let data = fs::read_to_string(path).await?;
        let value = serde_json::from_str(&data)
            .map_err(|_| ValidationError::MalformedInstanceFile)?;
        Ok(Some(value))
    }
}
