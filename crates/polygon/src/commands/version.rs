use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    println!("polygon {}", env!("CARGO_PKG_VERSION"));
    println!(
        "supported terraform: {}",
        polygon_terraform::DEFAULT_SUPPORTED_VERSIONS
    );

    let Ok(binary) = polygon_config::terraform_binary() else {
        println!("{}", "terraform: not found".yellow());
        return Ok(());
    };

    let terraform = polygon_terraform::Terraform::new(
        polygon_terraform::TerraformConfig::new(std::env::temp_dir()).with_binary(binary.clone()),
    );
    match terraform.version().await {
        Ok(version) => println!("terraform {} ({})", version, binary.display()),
        Err(e) => println!("{} {}", "terraform:".yellow(), e),
    }
    Ok(())
}
