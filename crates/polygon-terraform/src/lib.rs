//! Polygon Terraform engine
//!
//! Drives the `terraform` binary to create, destroy and inspect Orbs node
//! clusters on AWS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Terraform                         │
//! │        create / destroy / status / check_version        │
//! └───────┬──────────────────┬──────────────────┬───────────┘
//!         │                  │                  │
//! ┌───────▼──────┐  ┌────────▼────────┐  ┌──────▼─────────┐
//! │ Materializer │  │  ProcessRunner  │  │ InstanceQuery  │
//! │ tfvars,      │  │  OperationLog   │  │ HealthProbe    │
//! │ templates    │  │  OutputSet      │  │ (polygon-cloud)│
//! └───────┬──────┘  └─────────────────┘  └────────────────┘
//!         │
//! ┌───────▼─────────────────────┐
//! │ WorkingContext              │
//! │ <cache-root>/<name>/        │
//! │   .polygon-state.json       │
//! └─────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use polygon_terraform::{Terraform, TerraformConfig};
//!
//! let terraform = Terraform::new(TerraformConfig::new("/home/me/.polygon"));
//! terraform.check_version().await?;
//! let created = terraform.create(&spec, &credentials).await?;
//! println!("manager ip: {:?}", created.manager_ip());
//! ```

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod materialize;
pub mod oplog;
pub mod outputs;
pub mod resources;
pub mod runner;
pub mod status;
pub mod version;

// Re-exports
pub use context::{WorkingContext, WorkingState};
pub use error::{LifecycleError, Result, TerraformError};
pub use lifecycle::{
    CreateOutcome, DestroyOutcome, Terraform, TerraformConfig, bundled_template_root,
};
pub use materialize::Materializer;
pub use oplog::{OperationLog, Phase, PhaseLog, Stream};
pub use outputs::{ApplyOutputs, Output, OutputSet, parse_outputs, strip_ansi};
pub use resources::{ExternalResources, ResourceKind, ResourceSlot};
pub use runner::{Invocation, OutputExtractor, ProcessOutput, ProcessRunner};
pub use status::{StatusFailure, StatusReport, evaluate_health, parse_state_outputs};
pub use version::{DEFAULT_SUPPORTED_VERSIONS, check_version, parse_version_output};
