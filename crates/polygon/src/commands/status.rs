use super::Options;
use crate::NodeArgs;
use crate::progress::Spinner;
use colored::Colorize;
use polygon_cloud::HttpHealthProbe;
use polygon_cloud_aws::Ec2Instances;
use polygon_terraform::StatusReport;

pub async fn handle(args: &NodeArgs, options: &Options) -> anyhow::Result<()> {
    let prepared = super::prepare(args)?;
    let terraform = super::terraform(prepared.cache_root.clone(), options).await?;

    let instances = Ec2Instances::new();
    let health = HttpHealthProbe::default();

    let spinner = Spinner::start(
        format!("Checking node {}...", prepared.spec.name),
        options.verbose,
    );
    let report = match terraform
        .status(&prepared.spec, &prepared.credentials, &instances, &health)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_error("Status check failed");
            return Err(e.into());
        }
    };
    spinner.finish_success("Status check completed");

    println!();
    match report {
        StatusReport::NeverProvisioned => {
            println!(
                "{}",
                "This node was never provisioned, run `polygon create` first".yellow()
            );
        }
        StatusReport::Unhealthy(failure) => {
            eprintln!("{} {}", "Node is unhealthy:".red().bold(), failure);
            eprintln!();
            eprintln!(
                "{}",
                "Try `polygon destroy` followed by `polygon create` with the same request".yellow()
            );
            std::process::exit(1);
        }
        StatusReport::Healthy { instance, health } => {
            if health.is_ok() {
                println!("{}", "Your node is live on AWS".green().bold());
            } else {
                println!(
                    "{} {}",
                    "Node reports status:".yellow(),
                    health.status
                );
            }
            println!(
                "  instance {} ({})",
                instance.instance_id,
                instance.public_ip_address.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
