//! AWS provider for Polygon
//!
//! Implements [`InstanceQuery`](polygon_cloud::InstanceQuery) with the EC2
//! SDK. Each query loads the named profile from the shared AWS config, so the
//! same profiles the operator uses for Terraform are honored.
//!
//! # Example
//!
//! ```ignore
//! use polygon_cloud::InstanceQuery;
//! use polygon_cloud_aws::Ec2Instances;
//!
//! let instances = Ec2Instances::new()
//!     .describe_instances("default", "us-east-1")
//!     .await?;
//! ```

pub mod ec2;
pub mod error;

pub use ec2::{Ec2Instances, instance_info};
pub use error::{AwsError, Result};
