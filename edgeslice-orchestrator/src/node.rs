//! Edge nodes and the cloud datacenter
//!
//! Both accept tasks by taking ownership of them. A rejected task is handed
//! back unchanged in the `Err` variant so the caller can try the next tier.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use edgeslice_common::config::{CloudConfig, EdgeNodeTemplate};
use edgeslice_common::Position;

use crate::device::BYTES_PER_SEC_PER_MBPS;
use crate::resource::{
    ResourceCapacity, ResourceUtilization, CLOUD_TASK_MEMORY_MB, EDGE_TASK_MEMORY_MB,
};
use crate::slice::{select_slice, ServiceSlice, SliceIndex};
use crate::task::Task;
use crate::tier::ExecutionSite;

/// Unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the inner ID value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edge-{}", self.0)
    }
}

/// Outcome of a successful admission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// Where the task runs
    pub site: ExecutionSite,
    /// Start time
    pub start_time: f64,
    /// Scheduled completion time
    pub completion_time: f64,
}

/// An intermediary compute node with sliced capacity
#[derive(Debug, Clone)]
pub struct EdgeNode {
    id: NodeId,
    name: String,
    position: Position,
    capacity: ResourceCapacity,
    cost_per_unit: f64,
    slices: Vec<ServiceSlice>,
    active: Vec<(Task, SliceIndex)>,
    total_processed: u64,
    utilization: ResourceUtilization,
}

impl EdgeNode {
    /// Creates an edge node with the given slices.
    ///
    /// Quota fractions are not required to sum to 1; oversubscription is
    /// reported but allowed.
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        position: Position,
        capacity: ResourceCapacity,
        cost_per_unit: f64,
        slices: Vec<ServiceSlice>,
    ) -> Self {
        let name = name.into();
        let total_quota: f64 = slices.iter().map(|s| s.quota).sum();
        if total_quota > 1.0 + f64::EPSILON {
            warn!(
                node = %id,
                total_quota,
                "slice quotas oversubscribe node capacity"
            );
        }

        Self {
            id,
            name,
            position,
            capacity,
            cost_per_unit,
            slices,
            active: Vec::new(),
            total_processed: 0,
            utilization: ResourceUtilization::default(),
        }
    }

    /// Creates an edge node from a template
    pub fn from_template(
        id: NodeId,
        name: impl Into<String>,
        template: &EdgeNodeTemplate,
        position: Position,
        slices: impl FnOnce(&ResourceCapacity) -> Vec<ServiceSlice>,
    ) -> Self {
        let capacity = ResourceCapacity::new(
            template.mips as f64,
            template.ram as f64,
            template.storage as f64,
            template.bw as f64,
        );
        let slices = slices(&capacity);
        Self::new(id, name, position, capacity, template.cost_per_mips, slices)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn capacity(&self) -> &ResourceCapacity {
        &self.capacity
    }

    /// Compute units per second of the whole node
    pub fn compute_rate(&self) -> f64 {
        self.capacity.compute_rate
    }

    /// Cost per compute unit
    pub fn cost_per_unit(&self) -> f64 {
        self.cost_per_unit
    }

    pub fn slices(&self) -> &[ServiceSlice] {
        &self.slices
    }

    /// Number of tasks currently executing
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Tasks completed so far
    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn utilization(&self) -> ResourceUtilization {
        self.utilization
    }

    /// Weighted load in `[0, 1]` used for node ranking
    pub fn load_score(&self) -> f64 {
        self.utilization.load_score()
    }

    /// Tries to place `task` on a slice.
    ///
    /// On rejection the task is returned untouched.
    pub fn admit(&mut self, mut task: Task, now: f64, energy: f64) -> Result<Admission, Task> {
        let Some(index) = select_slice(&self.slices, &task) else {
            debug!(node = %self.id, task_id = %task.id, "no slice with capacity");
            return Err(task);
        };
        let slice = &mut self.slices[index.value()];
        if !slice.admit(&task) {
            return Err(task);
        }

        let service_time = slice.service_time(&task);
        let site = ExecutionSite::EdgeSlice {
            node: self.id,
            slice: index,
        };
        task.mark_running(site, now, service_time, energy);
        trace!(
            node = %self.id,
            slice = %slice.name,
            task_id = %task.id,
            service_time,
            "admitted task"
        );

        self.active.push((task, index));
        self.refresh_utilization();

        Ok(Admission {
            site,
            start_time: now,
            completion_time: now + service_time,
        })
    }

    /// Releases and returns tasks whose completion time has passed
    pub fn collect_completed(&mut self, now: f64) -> Vec<Task> {
        let (due, still_running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|(task, _)| task.is_due(now));
        self.active = still_running;

        let mut done = Vec::with_capacity(due.len());
        for (mut task, index) in due {
            if let Some(slice) = self.slices.get_mut(index.value()) {
                slice.release(&task);
            }
            task.mark_completed();
            self.total_processed += 1;
            done.push(task);
        }
        if !done.is_empty() {
            self.refresh_utilization();
        }
        done
    }

    fn refresh_utilization(&mut self) {
        self.utilization = ResourceUtilization::from_tasks(
            self.active.iter().map(|(task, _)| task),
            &self.capacity,
            EDGE_TASK_MEMORY_MB,
        );
    }
}

impl std::fmt::Display for EdgeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' [load {:.2}, at ({:.1}, {:.1}), {} slices]",
            self.id,
            self.name,
            self.load_score(),
            self.position.x,
            self.position.y,
            self.slices.len()
        )
    }
}

/// Centralized high-capacity backend
#[derive(Debug, Clone)]
pub struct CloudNode {
    id: NodeId,
    capacity: ResourceCapacity,
    cost_per_unit: f64,
    latency_to_edge_ms: f64,
    max_concurrent: Option<usize>,
    active: Vec<Task>,
    total_processed: u64,
    utilization: ResourceUtilization,
}

impl CloudNode {
    /// Creates the cloud from its descriptor
    pub fn from_config(id: NodeId, config: &CloudConfig) -> Self {
        Self {
            id,
            capacity: ResourceCapacity::new(
                config.mips as f64,
                config.ram as f64,
                config.storage as f64,
                config.bw as f64,
            ),
            cost_per_unit: config.cost_per_mips,
            latency_to_edge_ms: config.latency_to_edge_ms,
            max_concurrent: config.max_concurrent_tasks,
            active: Vec::new(),
            total_processed: 0,
            utilization: ResourceUtilization::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn capacity(&self) -> &ResourceCapacity {
        &self.capacity
    }

    pub fn cost_per_unit(&self) -> f64 {
        self.cost_per_unit
    }

    /// Number of tasks currently executing
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Tasks completed so far
    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn utilization(&self) -> ResourceUtilization {
        self.utilization
    }

    /// Returns true if the concurrency limit, when set, is reached
    pub fn is_full(&self) -> bool {
        self.max_concurrent
            .is_some_and(|limit| self.active.len() >= limit)
    }

    /// Latency to edge plus transfer over the cloud link plus execution
    pub fn service_time(&self, task: &Task) -> f64 {
        self.latency_to_edge_ms / 1000.0
            + task.input_size as f64 / (self.capacity.bandwidth_mbps * BYTES_PER_SEC_PER_MBPS)
            + task.compute_demand as f64 / self.capacity.compute_rate
    }

    /// Accepts `task` unless the concurrency limit is reached
    pub fn admit(&mut self, mut task: Task, now: f64, energy: f64) -> Result<Admission, Task> {
        if self.is_full() {
            debug!(task_id = %task.id, active = self.active.len(), "cloud at concurrency limit");
            return Err(task);
        }

        let service_time = self.service_time(&task);
        let site = ExecutionSite::Cloud(self.id);
        task.mark_running(site, now, service_time, energy);
        self.active.push(task);
        self.refresh_utilization();

        Ok(Admission {
            site,
            start_time: now,
            completion_time: now + service_time,
        })
    }

    /// Returns tasks whose completion time has passed
    pub fn collect_completed(&mut self, now: f64) -> Vec<Task> {
        let (mut done, still_running): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|task| task.is_due(now));
        self.active = still_running;

        for task in &mut done {
            task.mark_completed();
        }
        self.total_processed += done.len() as u64;
        if !done.is_empty() {
            self.refresh_utilization();
        }
        done
    }

    fn refresh_utilization(&mut self) {
        self.utilization =
            ResourceUtilization::from_tasks(&self.active, &self.capacity, CLOUD_TASK_MEMORY_MB);
    }
}
