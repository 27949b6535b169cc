use super::Options;
use crate::NodeArgs;
use crate::progress::Spinner;
use colored::Colorize;

pub async fn handle(args: &NodeArgs, options: &Options) -> anyhow::Result<()> {
    let prepared = super::prepare(args)?;
    let terraform = super::terraform(prepared.cache_root.clone(), options).await?;

    println!("{} {}", "Destroying node".yellow(), prepared.spec.name.cyan());
    let spinner = Spinner::start("Running terraform destroy...", options.verbose);

    match terraform.destroy(&prepared.spec, &prepared.credentials).await {
        Ok(outcome) => {
            spinner.finish_success("Destroy completed");
            println!(
                "{} {}",
                "Working directory:".dimmed(),
                outcome.tf_path.display()
            );
            Ok(())
        }
        Err(e) => {
            spinner.finish_error("Destroy failed");
            super::report_failure(&e);
            Err(e.into())
        }
    }
}
