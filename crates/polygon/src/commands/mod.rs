pub mod create;
pub mod destroy;
pub mod status;
pub mod version;

use crate::NodeArgs;
use colored::Colorize;
use polygon_config::PreparedRequest;
use polygon_terraform::{Terraform, TerraformConfig, TerraformError};
use std::path::PathBuf;

/// Flags shared by every subcommand
pub struct Options {
    pub skip_version_check: bool,
    pub verbose: bool,
}

/// Load and validate the request; nothing external runs before this succeeds.
pub fn prepare(args: &NodeArgs) -> anyhow::Result<PreparedRequest> {
    let (request, base) = args.to_request()?;
    Ok(request.prepare(&base)?)
}

/// Build the driver and check the installed terraform.
pub async fn terraform(cache_root: PathBuf, options: &Options) -> anyhow::Result<Terraform> {
    let mut config =
        TerraformConfig::new(cache_root).with_binary(polygon_config::terraform_binary()?);
    if let Some(root) = polygon_config::template_root_override() {
        config = config.with_template_root(root);
    }

    let terraform = Terraform::new(config);
    if !options.skip_version_check {
        let version = terraform.check_version().await?;
        tracing::debug!("terraform {} is supported", version);
    }
    Ok(terraform)
}

/// Print where a failed operation left its files and what terraform said.
pub fn report_failure(err: &TerraformError) {
    let TerraformError::Lifecycle(failure) = err else {
        return;
    };

    eprintln!();
    eprintln!(
        "{} {}",
        "Terraform working directory:".red().bold(),
        failure.tf_path.display()
    );
    if let Some(stderr) = failure.stderr().filter(|s| !s.trim().is_empty()) {
        eprintln!("{}", "Terraform output:".yellow());
        for line in stderr.lines() {
            eprintln!("  {}", line);
        }
    }
    eprintln!();
}
