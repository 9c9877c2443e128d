//! Service slicing and admission control
//!
//! An edge node's capacity is partitioned into named slices. Each slice owns a
//! quota fraction of the node's compute, memory and bandwidth, a priority rank
//! (lower is preferred) and a set of eligible task types.
//!
//! Admission keeps 10% headroom: a slice accepts work only while its assigned
//! demand is below 90% of its compute rate, and never accepts a task whose
//! demand would push the assigned total past that limit.

use serde::{Deserialize, Serialize};
use tracing::trace;

use edgeslice_common::config::{SliceConfig, SlicingConfig};
use edgeslice_common::TaskType;

use crate::resource::ResourceCapacity;
use crate::task::{Task, TaskId};

/// Fraction of a slice's compute rate that may be assigned
pub const SLICE_HEADROOM: f64 = 0.9;

/// Stable index of a slice within its edge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceIndex(usize);

impl SliceIndex {
    /// Creates a new slice index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the inner index
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SliceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slice-{}", self.0)
    }
}

/// A capacity partition of an edge node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSlice {
    /// Slice name
    pub name: String,
    /// Quota fraction of the node
    pub quota: f64,
    /// Priority rank, lower is preferred
    pub priority: u32,
    /// Eligible task types
    pub task_types: Vec<TaskType>,
    /// Quota-derived capacity
    pub capacity: ResourceCapacity,
    assigned_demand: u64,
    assigned: Vec<TaskId>,
}

impl ServiceSlice {
    /// Creates a slice holding `quota` of `node_capacity`
    pub fn new(
        name: impl Into<String>,
        quota: f64,
        priority: u32,
        task_types: Vec<TaskType>,
        node_capacity: &ResourceCapacity,
    ) -> Self {
        Self {
            name: name.into(),
            quota,
            priority,
            task_types,
            capacity: node_capacity.scaled(quota),
            assigned_demand: 0,
            assigned: Vec::new(),
        }
    }

    /// Creates a slice from its descriptor
    pub fn from_config(config: &SliceConfig, node_capacity: &ResourceCapacity) -> Self {
        Self::new(
            config.name.clone(),
            config.resource_percentage,
            config.priority,
            config.task_types.clone(),
            node_capacity,
        )
    }

    /// Compute rate of this slice
    pub fn compute_rate(&self) -> f64 {
        self.capacity.compute_rate
    }

    /// Demand that may be assigned before the slice saturates
    pub fn admission_limit(&self) -> f64 {
        self.capacity.compute_rate * SLICE_HEADROOM
    }

    /// Sum of demand of the tasks currently assigned
    pub fn assigned_demand(&self) -> u64 {
        self.assigned_demand
    }

    /// Number of tasks currently assigned
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    /// Returns true if the slice accepts the task type
    pub fn supports(&self, task_type: TaskType) -> bool {
        self.task_types.contains(&task_type)
    }

    /// Returns true while assigned demand is below the admission limit
    pub fn has_capacity(&self) -> bool {
        (self.assigned_demand as f64) < self.admission_limit()
    }

    /// Returns true if `demand` can be admitted without crossing the limit
    pub fn can_admit(&self, demand: u64) -> bool {
        self.has_capacity() && (self.assigned_demand + demand) as f64 <= self.admission_limit()
    }

    /// Service time of a task on this slice
    pub fn service_time(&self, task: &Task) -> f64 {
        task.compute_demand as f64 / self.capacity.compute_rate
    }

    /// Fraction of the admission limit in use
    pub fn utilization(&self) -> f64 {
        let limit = self.admission_limit();
        if limit <= 0.0 {
            return 0.0;
        }
        (self.assigned_demand as f64 / limit).min(1.0)
    }

    /// Assigns a task. Returns false, leaving the slice untouched, if it does not fit.
    pub fn admit(&mut self, task: &Task) -> bool {
        if !self.can_admit(task.compute_demand) {
            trace!(
                slice = %self.name,
                task_id = %task.id,
                assigned = self.assigned_demand,
                demand = task.compute_demand,
                "slice rejected task"
            );
            return false;
        }
        self.assigned_demand += task.compute_demand;
        self.assigned.push(task.id);
        true
    }

    /// Releases a previously admitted task. Returns false if it was not assigned here.
    pub fn release(&mut self, task: &Task) -> bool {
        match self.assigned.iter().position(|id| *id == task.id) {
            Some(pos) => {
                self.assigned.swap_remove(pos);
                self.assigned_demand = self.assigned_demand.saturating_sub(task.compute_demand);
                true
            }
            None => false,
        }
    }
}

/// Slice layout applied to every edge node
#[derive(Debug, Clone, Default)]
pub struct SlicingPolicy {
    slices: Vec<SliceConfig>,
}

impl SlicingPolicy {
    /// Creates a policy from slice descriptors, keeping their configured order
    pub fn new(config: &SlicingConfig) -> Self {
        Self {
            slices: config.slices.clone(),
        }
    }

    /// Number of slice descriptors
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns true if no slices are configured
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Sum of quota fractions; may exceed 1.0
    pub fn total_quota(&self) -> f64 {
        self.slices.iter().map(|s| s.resource_percentage).sum()
    }

    /// Builds the slices of a node with the given capacity
    pub fn build_slices(&self, node_capacity: &ResourceCapacity) -> Vec<ServiceSlice> {
        self.slices
            .iter()
            .map(|config| ServiceSlice::from_config(config, node_capacity))
            .collect()
    }
}

/// Chooses the slice that should take `task`.
///
/// Among the type-eligible slices that can admit the task, the one with the
/// lowest priority value wins (configured order breaks ties). When no eligible
/// slice can admit it, the first slice in configured order that can is used
/// regardless of type eligibility. `None` means every slice is saturated.
pub fn select_slice(slices: &[ServiceSlice], task: &Task) -> Option<SliceIndex> {
    let eligible = slices
        .iter()
        .enumerate()
        .filter(|(_, slice)| {
            slice.supports(task.task_type) && slice.can_admit(task.compute_demand)
        })
        .min_by_key(|(index, slice)| (slice.priority, *index))
        .map(|(index, _)| index);

    eligible
        .or_else(|| {
            slices
                .iter()
                .position(|slice| slice.can_admit(task.compute_demand))
        })
        .map(SliceIndex::new)
}

/// Returns true if any slice accepts the task type
pub fn has_eligible_slice(slices: &[ServiceSlice], task_type: TaskType) -> bool {
    slices.iter().any(|slice| slice.supports(task_type))
}
