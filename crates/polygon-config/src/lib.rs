//! Polygon configuration
//!
//! Resolves where things live (cache root, templates, the terraform binary)
//! and turns a node request, from a JSON file or command-line flags, into a
//! validated [`ClusterSpec`](polygon_core::ClusterSpec) and
//! [`CredentialBundle`](polygon_core::CredentialBundle).
//!
//! Environment overrides:
//! - `POLYGON_CACHE_PATH`: cache root when the request names none
//! - `POLYGON_TEMPLATE_PATH`: Terraform template root
//! - `POLYGON_TERRAFORM_BIN`: terraform executable

pub mod boyar;
pub mod error;
pub mod request;

pub use boyar::{DEFAULT_BOYAR_VERSION, boyar_target_url};
pub use error::{ConfigError, Result};
pub use request::{NodeRequest, PreparedRequest, load_json_file};

use std::path::{Component, Path, PathBuf};

pub const CACHE_PATH_ENV: &str = "POLYGON_CACHE_PATH";
pub const TEMPLATE_PATH_ENV: &str = "POLYGON_TEMPLATE_PATH";
pub const TERRAFORM_BIN_ENV: &str = "POLYGON_TERRAFORM_BIN";

const DEFAULT_CACHE_DIR: &str = "~/.polygon";

/// Cache root used when the request does not name one
pub fn default_cache_root() -> Result<PathBuf> {
    match std::env::var(CACHE_PATH_ENV) {
        Ok(path) if !path.is_empty() => resolve_path(&path, &std::env::current_dir()?),
        _ => expand_home(DEFAULT_CACHE_DIR),
    }
}

pub fn template_root_override() -> Option<PathBuf> {
    std::env::var_os(TEMPLATE_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// The terraform executable: `POLYGON_TERRAFORM_BIN`, else `terraform` on `PATH`
pub fn terraform_binary() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(TERRAFORM_BIN_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    which::which("terraform").map_err(|_| ConfigError::TerraformNotFound)
}

/// Expand `~` and resolve relative paths against `base`.
pub fn resolve_path(path: &str, base: &Path) -> Result<PathBuf> {
    let expanded = expand_home(path)?;
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    Ok(normalize(&joined))
}

fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };

    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
