//! Create and destroy
//!
//! ```text
//! create:  materialize -> init -> [import ip] -> [import storage] -> apply
//!          -> [patch manager_ip] -> [persist storage id]
//! destroy: materialize -> init -> [detach ip] -> [detach storage] -> destroy
//! ```
//!
//! Neither operation is transactional. A failure after `apply` leaves cloud
//! resources provisioned; the working directory is kept so Terraform's own
//! state can be inspected or reused by a retry.

use crate::context::WorkingContext;
use crate::error::{LifecycleError, Result};
use crate::materialize::Materializer;
use crate::oplog::OperationLog;
use crate::outputs::{ApplyOutputs, OutputSet};
use crate::resources::{ExternalResources, ResourceKind};
use crate::runner::{Invocation, ProcessRunner};
use crate::version::{check_version, default_requirement, parse_version_output};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use polygon_core::{ClusterSpec, CredentialBundle};
use semver::{Version, VersionReq};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const MANAGER_IP_OUTPUT: &str = "manager_ip";
pub const MANAGER_DNS_OUTPUT: &str = "manager_dns";
pub const SHARED_STORAGE_OUTPUT: &str = "block_storage";
pub const VPC_OUTPUT: &str = "main_vpc_id";

/// Log key for commands not tied to a cluster
const TOOL_LOG_KEY: &str = "terraform";

/// Template tree shipped with this crate
pub fn bundled_template_root() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/terraform"))
}

#[derive(Debug, Clone)]
pub struct TerraformConfig {
    /// Terraform executable
    pub binary: PathBuf,
    /// Parent of every cluster working directory
    pub cache_root: PathBuf,
    /// Parent of the per-provider template trees
    pub template_root: PathBuf,
    pub supported_versions: VersionReq,
}

impl TerraformConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("terraform"),
            cache_root: cache_root.into(),
            template_root: bundled_template_root(),
            supported_versions: default_requirement(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_template_root(mut self, template_root: impl Into<PathBuf>) -> Self {
        self.template_root = template_root.into();
        self
    }

    pub fn with_supported_versions(mut self, supported_versions: VersionReq) -> Self {
        self.supported_versions = supported_versions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub tf_path: PathBuf,
    pub outputs: OutputSet,
    pub name: String,
}

impl CreateOutcome {
    pub fn manager_ip(&self) -> Option<&str> {
        self.outputs.get(MANAGER_IP_OUTPUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyOutcome {
    pub tf_path: PathBuf,
}

/// Terraform driver for node clusters
///
/// Owns its [`OperationLog`]; separate drivers never share captured output.
/// Concurrent operations must target distinct cluster names.
#[derive(Debug, Clone)]
pub struct Terraform {
    config: TerraformConfig,
    pub(crate) runner: ProcessRunner,
    materializer: Materializer,
}

impl Terraform {
    pub fn new(config: TerraformConfig) -> Self {
        let runner = ProcessRunner::new(config.binary.clone(), OperationLog::new());
        let materializer = Materializer::new(config.template_root.clone());
        Self {
            config,
            runner,
            materializer,
        }
    }

    pub fn config(&self) -> &TerraformConfig {
        &self.config
    }

    pub fn log(&self) -> &OperationLog {
        self.runner.log()
    }

    pub fn context(&self, name: &str) -> Result<WorkingContext> {
        WorkingContext::new(&self.config.cache_root, name)
    }

    /// Installed Terraform version
    pub async fn version(&self) -> Result<Version> {
        let output = self
            .runner
            .run(TOOL_LOG_KEY, &Invocation::version(), Path::new("."))
            .await?;
        parse_version_output(&output.stdout)
    }

    /// Fail unless the installed version is supported.
    pub async fn check_version(&self) -> Result<Version> {
        let version = self.version().await?;
        check_version(&version, &self.config.supported_versions)?;
        tracing::debug!("Terraform {} satisfies {}", version, self.config.supported_versions);
        Ok(version)
    }

    /// Provision (or update) the cluster described by `spec`.
    ///
    /// Invalid requests fail with [`TerraformError::Validation`] before any
    /// process is spawned; everything later is wrapped in a
    /// [`LifecycleError`] naming the working directory.
    ///
    /// [`TerraformError::Validation`]: crate::TerraformError::Validation
    pub async fn create(&self, spec: &ClusterSpec, credentials: &CredentialBundle) -> Result<CreateOutcome> {
        spec.validate()?;
        credentials.node_keys()?.ensure_matching()?;
        let ctx = self.context(&spec.name)?;

        self.run_create(&ctx, spec, credentials)
            .await
            .map_err(|cause| LifecycleError::new(ctx.dir(), cause).into())
    }

    /// Tear the cluster down, keeping referenced resources alive.
    pub async fn destroy(&self, spec: &ClusterSpec, credentials: &CredentialBundle) -> Result<DestroyOutcome> {
        spec.validate()?;
        let ctx = self.context(&spec.name)?;

        self.run_destroy(&ctx, spec, credentials)
            .await
            .map_err(|cause| LifecycleError::new(ctx.dir(), cause).into())
    }

    async fn run_create(
        &self,
        ctx: &WorkingContext,
        spec: &ClusterSpec,
        credentials: &CredentialBundle,
    ) -> Result<CreateOutcome> {
        let name = ctx.name();
        let vars = apply_variables(credentials).await?;

        self.materializer.materialize(ctx, spec, credentials).await?;

        tracing::info!("Terraform initialize ({})", name);
        self.runner.run(name, &Invocation::init(), ctx.dir()).await?;

        let state = ctx.load_state().await?;
        let resources = ExternalResources::for_create(spec, &state);
        for (kind, id) in resources.referenced() {
            tracing::info!("Importing {} {}", kind.address(), id);
            self.runner
                .run(name, &kind.import_invocation(id), ctx.dir())
                .await?;

            if kind == ResourceKind::StaticIp {
                let ip = id.to_string();
                ctx.update_state(|s| s.static_ip = Some(ip)).await?;
            }
        }

        tracing::info!("Creating node {} on {}", name, spec.provider);
        let apply = Invocation::apply(vars.iter().map(|(k, v)| (*k, v.as_str())));
        let mut outputs = self
            .runner
            .run_with(name, &apply, ctx.dir(), &ApplyOutputs)
            .await?
            .outputs;

        // the provider may report an intermediate address for an imported IP
        if let Some(ip) = &spec.ip {
            outputs.set(MANAGER_IP_OUTPUT, ip.as_str());
        }

        if !spec.ephemeral_storage {
            match outputs.require(SHARED_STORAGE_OUTPUT) {
                Ok(id) => {
                    let id = id.to_string();
                    ctx.update_state(|s| s.shared_storage_id = Some(id)).await?;
                }
                Err(e) => tracing::warn!("Shared storage id not persisted: {}", e),
            }
        }

        Ok(CreateOutcome {
            tf_path: ctx.dir().to_path_buf(),
            outputs,
            name: name.to_string(),
        })
    }

    async fn run_destroy(
        &self,
        ctx: &WorkingContext,
        spec: &ClusterSpec,
        credentials: &CredentialBundle,
    ) -> Result<DestroyOutcome> {
        let name = ctx.name();

        self.materializer.materialize(ctx, spec, credentials).await?;

        tracing::info!("Terraform initialize ({})", name);
        self.runner.run(name, &Invocation::init(), ctx.dir()).await?;

        let state = ctx.load_state().await?;
        let resources = ExternalResources::for_destroy(spec, &state);
        for (kind, id) in resources.referenced() {
            tracing::info!("Detaching {} ({}) from Terraform state", kind.address(), id);
            self.runner
                .run(name, &kind.detach_invocation(), ctx.dir())
                .await?;

            if kind == ResourceKind::StaticIp {
                ctx.update_state(|s| s.static_ip = None).await?;
            }
        }

        tracing::info!("Destroying node {} resources", name);
        self.runner
            .run(name, &Invocation::destroy(), ctx.dir())
            .await?;

        Ok(DestroyOutcome {
            tf_path: ctx.dir().to_path_buf(),
        })
    }
}

/// Secret `-var` values passed to `apply` instead of being written to disk
async fn apply_variables(credentials: &CredentialBundle) -> Result<Vec<(&'static str, String)>> {
    let key_pair = serde_json::to_string(&credentials.node_keys()?.key_pair_json())?;
    let mut vars = vec![("node_key_pair", STANDARD.encode(key_pair))];

    if let Some(path) = &credentials.ssl.certificate_path {
        vars.push(("ssl_certificate", STANDARD.encode(fs::read(path).await?)));
    }
    if let Some(path) = &credentials.ssl.private_key_path {
        vars.push(("ssl_private_key", STANDARD.encode(fs::read(path).await?)));
    }

    Ok(vars)
}
