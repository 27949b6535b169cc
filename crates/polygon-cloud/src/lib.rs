//! Polygon cloud collaborators
//!
//! The orchestration engine never talks to a cloud API directly. It reads
//! live instance data through [`InstanceQuery`] and the node application's
//! status endpoint through [`HealthProbe`], so both can be swapped for
//! fakes in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              polygon-terraform                  │
//! │          (status reconciliation)                │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼────────────┐   ┌────────▼──────────────┐
//! │  trait             │   │  trait                │
//! │  InstanceQuery     │   │  HealthProbe          │
//! └───────┬────────────┘   └────────┬──────────────┘
//!         │                         │
//! ┌───────▼────────────┐   ┌────────▼──────────────┐
//! │ polygon-cloud-aws  │   │  HttpHealthProbe      │
//! │ (aws CLI)          │   │  (reqwest)            │
//! └────────────────────┘   └───────────────────────┘
//! ```

pub mod error;
pub mod health;
pub mod instance;

// Re-exports
pub use error::{CloudError, Result};
pub use health::{DEFAULT_APP, HealthPayload, HealthProbe, HttpHealthProbe};
pub use instance::{
    InstanceInfo, InstanceQuery, InstanceState, RUNNING_STATE_CODE, find_by_public_dns,
};
