//! Project materialization
//!
//! Turns a [`ClusterSpec`] into a runnable Terraform project inside the
//! cluster's [`WorkingContext`]:
//!
//! 1. create the working directory
//! 2. write `terraform.tfvars`
//! 3. copy the provider template tree, minus the opt-in files
//! 4. re-add `eip.tf` when a static IP is requested
//! 5. record a caller-supplied shared storage id
//! 6. drop `backend.tf`, or fill in its `__region__`/`__name__` tokens
//!
//! Not safe to run concurrently for the same cluster name.

use crate::context::{BACKEND_FILE, WorkingContext};
use crate::error::{Result, TerraformError};
use glob::Pattern;
use polygon_core::{ClusterSpec, CredentialBundle, render_variables};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

pub const STATIC_IP_TEMPLATE: &str = "eip.tf";

/// Disk templates only used by storage layouts this tool does not provision
const STORAGE_DISK_TEMPLATES: &str = "ethereum-ebs*";

const REGION_TOKEN: &str = "__region__";
const NAME_TOKEN: &str = "__name__";

#[derive(Debug, Clone)]
pub struct Materializer {
    template_root: PathBuf,
}

impl Materializer {
    /// `template_root` holds one template tree per provider (`aws/`, ...)
    pub fn new(template_root: impl Into<PathBuf>) -> Self {
        Self {
            template_root: template_root.into(),
        }
    }

    pub fn template_root(&self) -> &Path {
        &self.template_root
    }

    pub async fn materialize(
        &self,
        ctx: &WorkingContext,
        spec: &ClusterSpec,
        credentials: &CredentialBundle,
    ) -> Result<()> {
        let dir = ctx.dir();
        let template_dir = self.template_root.join(spec.provider.as_str());
        tracing::info!("Materializing {} from {}", dir.display(), template_dir.display());

        fs::create_dir_all(dir)
            .await
            .map_err(|e| TerraformError::materialization(format!("create {}", dir.display()), e))?;

        fs::write(ctx.variables_path(), render_variables(spec, credentials))
            .await
            .map_err(|e| TerraformError::materialization("write variables file", e))?;

        copy_tree(&template_dir, dir).await?;
        remove_opt_in_templates(dir).await?;

        if spec.ip.is_some() {
            let from = template_dir.join(STATIC_IP_TEMPLATE);
            fs::copy(&from, dir.join(STATIC_IP_TEMPLATE))
                .await
                .map_err(|e| TerraformError::materialization(format!("copy {}", from.display()), e))?;
        }

        if let (false, Some(id)) = (spec.ephemeral_storage, spec.efs_id.as_deref()) {
            let id = id.to_string();
            ctx.update_state(|state| state.shared_storage_id = Some(id))
                .await?;
        }

        if spec.backend {
            fill_backend(&ctx.backend_path(), &spec.region, &spec.backend_state_name()).await?;
        } else {
            remove_if_exists(&ctx.backend_path()).await?;
        }

        Ok(())
    }
}

/// Copy every file under `from` into `to`, preserving relative paths.
async fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let step = |what: String| move |e: std::io::Error| TerraformError::materialization(what, e);

    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry
            .map_err(std::io::Error::from)
            .map_err(step(format!("read template tree {}", from.display())))?;

        let relative = entry.path().strip_prefix(from).map_err(|e| {
            TerraformError::materialization("resolve template path", std::io::Error::other(e))
        })?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .await
                .map_err(step(format!("create {}", target.display())))?;
        } else {
            fs::copy(entry.path(), &target)
                .await
                .map_err(step(format!("copy {}", entry.path().display())))?;
        }
    }

    Ok(())
}

async fn remove_opt_in_templates(dir: &Path) -> Result<()> {
    remove_if_exists(&dir.join(STATIC_IP_TEMPLATE)).await?;

    let pattern = Pattern::new(STORAGE_DISK_TEMPLATES).map_err(|e| {
        TerraformError::materialization("compile template pattern", std::io::Error::other(e))
    })?;

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| TerraformError::materialization(format!("list {}", dir.display()), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TerraformError::materialization(format!("list {}", dir.display()), e))?
    {
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            remove_if_exists(&entry.path()).await?;
        }
    }

    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TerraformError::materialization(
            format!("remove {}", path.display()),
            e,
        )),
    }
}

async fn fill_backend(path: &Path, region: &str, name: &str) -> Result<()> {
    let step = |e| TerraformError::materialization(format!("rewrite {}", BACKEND_FILE), e);

    let content = fs::read_to_string(path).await.map_err(step)?;
    let content = content.replace(REGION_TOKEN, region).replace(NAME_TOKEN, name);
    fs::write(path, content).await.map_err(step)?;
    Ok(())
}
