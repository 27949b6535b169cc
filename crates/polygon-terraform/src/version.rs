//! Terraform version gate
//!
//! The bundled templates target one Terraform line; any other installed
//! version is rejected before an operation starts.

use crate::error::{Result, TerraformError};
use semver::{Comparator, Op, Version, VersionReq};

/// Templates are written for the 0.12 syntax and state format
pub const DEFAULT_SUPPORTED_VERSIONS: &str = ">=0.12.0, <0.13.0";

pub fn default_requirement() -> VersionReq {
    VersionReq::parse(DEFAULT_SUPPORTED_VERSIONS).unwrap_or(VersionReq::STAR)
}

/// Parse the first line of `terraform -version`, e.g. `Terraform v0.12.29`.
pub fn parse_version_output(output: &str) -> Result<Version> {
    let first = output.lines().next().unwrap_or_default().trim();
    let raw = first
        .split_once(" v")
        .map(|(_, v)| v.trim())
        .ok_or_else(|| TerraformError::VersionUnavailable(format!("unexpected output: {:?}", first)))?;

    Version::parse(raw)
        .map_err(|e| TerraformError::VersionUnavailable(format!("{}: {}", raw, e)))
}

pub fn check_version(found: &Version, required: &VersionReq) -> Result<()> {
    if required.matches(found) {
        return Ok(());
    }

    Err(TerraformError::VersionMismatch {
        found: found.clone(),
        required: required.clone(),
        suggested: minimum_version(required),
    })
}

/// Lowest version admitted by the requirement's lower bounds
fn minimum_version(required: &VersionReq) -> String {
    required
        .comparators
        .iter()
        .filter(|c| matches!(c.op, Op::GreaterEq | Op::Exact | Op::Caret | Op::Tilde | Op::Wildcard))
        .map(comparator_floor)
        .max()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "latest".to_string())
}

fn comparator_floor(c: &Comparator) -> Version {
    Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0))
}
