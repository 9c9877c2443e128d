//! Compute tier definitions
//!
//! The hierarchy has three tiers:
//! - Device: the IoT endpoint that generated the task
//! - Edge: an intermediary node whose capacity is partitioned into slices
//! - Cloud: a centralized, high-capacity backend

use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::node::NodeId;
use crate::slice::SliceIndex;

/// Compute tier in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComputeTier {
    /// Local execution on the generating device
    Device,
    /// Edge node slice
    Edge,
    /// Cloud datacenter
    Cloud,
}

impl std::fmt::Display for ComputeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeTier::Device => write!(f, "Device"),
            ComputeTier::Edge => write!(f, "Edge"),
            ComputeTier::Cloud => write!(f, "Cloud"),
        }
    }
}

/// Where a task executes
///
/// Typed handles replace string location tags; the slice index is stable for
/// the lifetime of the edge node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionSite {
    /// On the generating device
    Device(DeviceId),
    /// On a slice of an edge node
    EdgeSlice {
        /// Edge node
        node: NodeId,
        /// Slice within that node
        slice: SliceIndex,
    },
    /// On the cloud datacenter
    Cloud(NodeId),
}

impl ExecutionSite {
    /// Returns the tier of this site
    pub fn tier(&self) -> ComputeTier {
        match self {
            ExecutionSite::Device(_) => ComputeTier::Device,
            ExecutionSite::EdgeSlice { .. } => ComputeTier::Edge,
            ExecutionSite::Cloud(_) => ComputeTier::Cloud,
        }
    }
}

impl std::fmt::Display for ExecutionSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionSite::Device(id) => write!(f, "{id}"),
            ExecutionSite::EdgeSlice { node, slice } => write!(f, "{node}/{slice}"),
            ExecutionSite::Cloud(id) => write!(f, "cloud-{}", id.value()),
        }
    }
}
