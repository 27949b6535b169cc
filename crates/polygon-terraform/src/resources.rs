//! Externally owned resources
//!
//! A static IP and a shared storage volume may exist before the cluster and
//! must survive it. Such a resource is *referenced* by the cluster: it is
//! imported into Terraform state before `apply` so it is reconciled rather
//! than recreated, and removed from state before `destroy` so it is not
//! released.

use crate::context::WorkingState;
use crate::oplog::Phase;
use crate::runner::Invocation;
use polygon_core::ClusterSpec;

pub const STATIC_IP_ADDRESS: &str = "aws_eip.eip_manager";
pub const SHARED_STORAGE_ADDRESS: &str = "aws_efs_file_system.block_storage";

/// Lifecycle ownership of an optional resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSlot {
    /// Created and destroyed together with the cluster
    Owned,
    /// Pre-existing; only attached to Terraform state
    Referenced(String),
}

impl ResourceSlot {
    fn from_id(id: Option<&str>) -> Self {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => ResourceSlot::Referenced(id.to_string()),
            None => ResourceSlot::Owned,
        }
    }

    pub fn referenced_id(&self) -> Option<&str> {
        match self {
            ResourceSlot::Referenced(id) => Some(id),
            ResourceSlot::Owned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    StaticIp,
    SharedStorage,
}

impl ResourceKind {
    pub fn address(&self) -> &'static str {
        match self {
            ResourceKind::StaticIp => STATIC_IP_ADDRESS,
            ResourceKind::SharedStorage => SHARED_STORAGE_ADDRESS,
        }
    }

    pub fn import_invocation(&self, id: &str) -> Invocation {
        let phase = match self {
            ResourceKind::StaticIp => Phase::ImportIp,
            ResourceKind::SharedStorage => Phase::ImportStorage,
        };
        Invocation::import(phase, self.address(), id)
    }

    pub fn detach_invocation(&self) -> Invocation {
        let phase = match self {
            ResourceKind::StaticIp => Phase::DetachIp,
            ResourceKind::SharedStorage => Phase::DetachStorage,
        };
        Invocation::state_rm(phase, self.address())
    }
}

/// Ownership of both optional resources for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalResources {
    pub static_ip: ResourceSlot,
    pub shared_storage: ResourceSlot,
}

impl ExternalResources {
    /// Only what the request asks for is imported on create.
    pub fn for_create(spec: &ClusterSpec, state: &WorkingState) -> Self {
        Self {
            static_ip: ResourceSlot::from_id(spec.ip.as_deref()),
            shared_storage: Self::storage_slot(spec, state),
        }
    }

    /// A static IP imported by an earlier create is detached even when the
    /// destroy request no longer names it.
    pub fn for_destroy(spec: &ClusterSpec, state: &WorkingState) -> Self {
        let ip = spec.ip.as_deref().or(state.static_ip.as_deref());
        Self {
            static_ip: ResourceSlot::from_id(ip),
            shared_storage: Self::storage_slot(spec, state),
        }
    }

    fn storage_slot(spec: &ClusterSpec, state: &WorkingState) -> ResourceSlot {
        if spec.ephemeral_storage {
            return ResourceSlot::Owned;
        }
        ResourceSlot::from_id(
            spec.efs_id
                .as_deref()
                .or(state.shared_storage_id.as_deref()),
        )
    }

    /// Referenced resources, static IP first
    pub fn referenced(&self) -> impl Iterator<Item = (ResourceKind, &str)> {
        [
            (ResourceKind::StaticIp, &self.static_ip),
            (ResourceKind::SharedStorage, &self.shared_storage),
        ]
        .into_iter()
        .filter_map(|(kind, slot)| slot.referenced_id().map(|id| (kind, id)))
    }
}
