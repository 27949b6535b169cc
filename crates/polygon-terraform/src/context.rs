//! Per-cluster working directory and its sidecar state
//!
//! Each cluster owns `<cache-root>/<name>/`. Besides the Terraform project
//! itself the directory holds `.polygon-state.json`, which remembers the
//! externally owned resources currently imported into Terraform's state so
//! that later `destroy`/`status` calls find them without being told again.

use crate::error::{Result, TerraformError};
use chrono::{DateTime, Utc};
use polygon_core::{VARIABLES_FILE, validate_name};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_FILE: &str = ".polygon-state.json";
const STATE_TMP: &str = ".polygon-state.json.tmp";
pub const BACKEND_FILE: &str = "backend.tf";

/// Externally owned resources tracked for one working directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingState {
    /// Static IP currently imported into Terraform state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_ip: Option<String>,

    /// Shared storage volume that outlives the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_storage_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A cluster's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingContext {
    name: String,
    dir: PathBuf,
}

impl WorkingContext {
    /// `name` must be a single path segment.
    pub fn new(cache_root: &Path, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: cache_root.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn variables_path(&self) -> PathBuf {
        self.dir.join(VARIABLES_FILE)
    }

    pub fn backend_path(&self) -> PathBuf {
        self.dir.join(BACKEND_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// A variables file is written on every create, so its absence means
    /// the cluster was never provisioned from this cache root.
    pub async fn is_provisioned(&self) -> bool {
        fs::try_exists(self.variables_path()).await.unwrap_or(false)
    }

    /// Load the sidecar state; a missing file is an empty state.
    pub async fn load_state(&self) -> Result<WorkingState> {
        let path = self.state_path();
        if !fs::try_exists(&path).await? {
            return Ok(WorkingState::default());
        }

        let content = fs::read_to_string(&path).await?;
        let state = serde_json::from_str(&content).map_err(|e| {
            TerraformError::InvalidState(format!("{}: {}", path.display(), e))
        })?;
        Ok(state)
    }

    /// Write the sidecar state atomically.
    pub async fn save_state(&self, state: &WorkingState) -> Result<()> {
        let mut state = state.clone();
        state.updated_at = Some(Utc::now());

        let tmp = self.dir.join(STATE_TMP);
        let content = serde_json::to_string_pretty(&state)?;
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, self.state_path()).await?;

        tracing::debug!("Saved working state for {}", self.name);
        Ok(())
    }

    /// Load, modify and save the sidecar state in one step.
    pub async fn update_state<F>(&self, f: F) -> Result<WorkingState>
    where
        F: FnOnce(&mut WorkingState),
    {
        let mut state = self.load_state().await?;
        f(&mut state);
        self.save_state(&state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let ctx = WorkingContext::new(Path::new("/cache"), "mumbai-node4").unwrap();
        assert_eq!(ctx.dir(), Path::new("/cache/mumbai-node4"));
        assert_eq!(ctx.variables_path(), Path::new("/cache/mumbai-node4/terraform.tfvars"));
        assert_eq!(ctx.state_path(), Path::new("/cache/mumbai-node4/.polygon-state.json"));
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(WorkingContext::new(Path::new("/cache"), "../etc").is_err());
        assert!(WorkingContext::new(Path::new("/cache"), "").is_err());
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let temp = tempdir().unwrap();
        let ctx = WorkingContext::new(temp.path(), "node1").unwrap();
        std::fs::create_dir_all(ctx.dir()).unwrap();

        assert_eq!(ctx.load_state().await.unwrap(), WorkingState::default());

        ctx.update_state(|s| s.shared_storage_id = Some("fs-1234".to_string()))
            .await
            .unwrap();

        let loaded = ctx.load_state().await.unwrap();
        assert_eq!(loaded.shared_storage_id.as_deref(), Some("fs-1234"));
        assert!(loaded.static_ip.is_none());
        assert!(loaded.updated_at.is_some());
        assert!(!ctx.dir().join(STATE_TMP).exists());
    }

    #[tokio::test]
    async fn test_corrupt_state() {
        let temp = tempdir().unwrap();
        let ctx = WorkingContext::new(temp.path(), "node1").unwrap();
        std::fs::create_dir_all(ctx.dir()).unwrap();
        std::fs::write(ctx.state_path(), "{not json").unwrap();

        assert!(matches!(
            ctx.load_state().await,
            Err(TerraformError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_is_provisioned() {
        let temp = tempdir().unwrap();
        let ctx = WorkingContext::new(temp.path(), "node1").unwrap();
        assert!(!ctx.is_provisioned().await);

        std::fs::create_dir_all(ctx.dir()).unwrap();
        std::fs::write(ctx.variables_path(), "name = \"node1\"\n").unwrap();
        assert!(ctx.is_provisioned().await);
    }
}
