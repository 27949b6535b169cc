use super::Options;
use crate::NodeArgs;
use crate::progress::Spinner;
use colored::Colorize;

pub async fn handle(args: &NodeArgs, options: &Options) -> anyhow::Result<()> {
    let prepared = super::prepare(args)?;
    let spec = &prepared.spec;
    let terraform = super::terraform(prepared.cache_root.clone(), options).await?;

    println!(
        "{} {} ({} workers, {}) in {}",
        "Creating node".blue(),
        spec.name.cyan(),
        spec.instance_count(),
        spec.instance_type,
        spec.region
    );
    let spinner = Spinner::start("Running terraform apply...", options.verbose);

    let outcome = match terraform.create(spec, &prepared.credentials).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_error("Create failed");
            super::report_failure(&e);
            return Err(e.into());
        }
    };
    spinner.finish_success("Create completed");

    println!();
    match spec.ip.as_deref().or(outcome.manager_ip()) {
        Some(ip) => println!("{} {}", "Manager IP:".green().bold(), ip),
        None => println!("{}", "Terraform reported no manager IP".yellow()),
    }
    println!("{} {}", "Node name:".green().bold(), outcome.name);
    println!("{} {}", "Working directory:".dimmed(), outcome.tf_path.display());
    println!();
    println!("To destroy this node run:");
    match &args.file {
        Some(file) => println!("  polygon destroy -f {}", file.display()),
        None => {
            let mut hint = format!(
                "  polygon destroy --name {} --region {}",
                outcome.name, spec.region
            );
            if let Some(cache_path) = &args.cache_path {
                hint.push_str(&format!(" --cache-path {}", cache_path));
            }
            println!("{}", hint);
        }
    }

    Ok(())
}
