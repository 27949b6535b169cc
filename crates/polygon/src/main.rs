mod commands;
mod progress;

use clap::{Args, Parser, Subcommand};
use polygon_config::NodeRequest;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polygon")]
#[command(about = "Provision Orbs node clusters on AWS with Terraform", long_about = None)]
struct Cli {
    /// Stream terraform output and debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not check the installed terraform version
    #[arg(long, global = true)]
    skip_version_check: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or update) a node cluster
    Create(NodeArgs),
    /// Destroy a node cluster, keeping static IPs and shared storage
    Destroy(NodeArgs),
    /// Check whether a node cluster is up and healthy
    Status(NodeArgs),
    /// Show version information
    Version,
}

/// Node request, either from a JSON file or from flags
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// JSON request file; when given, the other request flags are ignored
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Node name (defaults to `<address prefix>-<region>`)
    #[arg(long, default_value = "")]
    name: String,

    #[arg(long, default_value = "default")]
    aws_profile: String,

    /// Pre-allocated Elastic IP to attach to the manager
    #[arg(long)]
    public_ip: Option<String>,

    #[arg(long, default_value = "")]
    orbs_address: String,

    #[arg(long, default_value = "")]
    orbs_private_key: String,

    #[arg(long, default_value_t = polygon_core::DEFAULT_INSTANCE_COUNT)]
    node_count: u32,

    /// EC2 instance type
    #[arg(long, default_value = "t2.medium")]
    node_size: String,

    #[arg(long, default_value = "us-east-1")]
    region: String,

    #[arg(long, default_value = "~/.ssh/id_rsa.pub")]
    ssh_public_key: String,

    /// Comma separated CIDR blocks allowed to reach port 22
    #[arg(long, value_delimiter = ',')]
    incoming_ssh_cidr_blocks: Vec<String>,

    #[arg(long)]
    bootstrap_url: Option<String>,

    #[arg(long)]
    ssl_certificate_path: Option<String>,

    #[arg(long)]
    ssl_private_key_path: Option<String>,

    /// Where working directories are kept
    #[arg(long)]
    cache_path: Option<String>,

    /// Keep Terraform state in S3
    #[arg(long)]
    backend: bool,

    /// Do not keep shared storage between create/destroy cycles
    #[arg(long)]
    ephemeral_storage: bool,

    /// Existing EFS file system to attach
    #[arg(long)]
    efs_id: Option<String>,

    #[arg(long)]
    ethereum_endpoint: Option<String>,

    #[arg(long)]
    ethereum_topology_contract_address: Option<String>,

    /// JSON file with the management configuration
    #[arg(long)]
    management_config: Option<PathBuf>,

    #[arg(long)]
    boyar_version: Option<String>,

    #[arg(long)]
    boyar_url: Option<String>,

    #[arg(long)]
    boyar_commit: Option<String>,
}

impl NodeArgs {
    /// The request plus the directory its relative paths resolve against
    pub fn to_request(&self) -> anyhow::Result<(NodeRequest, PathBuf)> {
        if let Some(file) = &self.file {
            return Ok(NodeRequest::from_file(file)?);
        }

        let management_config = match &self.management_config {
            Some(path) => polygon_config::load_json_file(path)?,
            None => serde_json::Value::Null,
        };

        let request = NodeRequest {
            name: self.name.clone(),
            aws_profile: self.aws_profile.clone(),
            public_ip: self.public_ip.clone(),
            orbs_address: self.orbs_address.clone(),
            orbs_private_key: self.orbs_private_key.clone(),
            node_count: serde_json::Value::from(self.node_count),
            node_size: self.node_size.clone(),
            region: self.region.clone(),
            ssh_public_key: self.ssh_public_key.clone(),
            incoming_ssh_cidr_blocks: self.incoming_ssh_cidr_blocks.clone(),
            bootstrap_url: self.bootstrap_url.clone(),
            ssl_certificate_path: self.ssl_certificate_path.clone(),
            ssl_private_key_path: self.ssl_private_key_path.clone(),
            cache_path: self.cache_path.clone(),
            backend: self.backend,
            ephemeral_storage: self.ephemeral_storage,
            efs_id: self.efs_id.clone(),
            ethereum_endpoint: self.ethereum_endpoint.clone(),
            ethereum_topology_contract_address: self.ethereum_topology_contract_address.clone(),
            management_config,
            boyar_version: self.boyar_version.clone(),
            boyar_url: self.boyar_url.clone(),
            boyar_commit: self.boyar_commit.clone(),
            boyar_auto_update: false,
        };

        Ok((request, std::env::current_dir()?))
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = commands::Options {
        skip_version_check: cli.skip_version_check,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Create(args) => commands::create::handle(&args, &options).await,
        Commands::Destroy(args) => commands::destroy::handle(&args, &options).await,
        Commands::Status(args) => commands::status::handle(&args, &options).await,
        Commands::Version => commands::version::handle().await,
    }
}
