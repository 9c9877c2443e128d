//! Resource capacity and utilization tracking
//!
//! Utilization is recomputed from the active task set after every admit and
//! release, so it never drifts from the tasks actually held by an entity.

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Memory footprint assumed per task on edge nodes and devices, in MB
pub const EDGE_TASK_MEMORY_MB: f64 = 512.0;

/// Memory footprint assumed per task on the cloud, in MB
pub const CLOUD_TASK_MEMORY_MB: f64 = 1024.0;

/// Fraction of its input size a task keeps in flight on the link
const BANDWIDTH_SHARE_DIVISOR: f64 = 10.0;

/// Resource capacity of an entity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceCapacity {
    /// Compute units per second
    pub compute_rate: f64,
    /// Memory in MB
    pub memory_mb: f64,
    /// Storage in MB
    pub storage_mb: f64,
    /// Bandwidth in Mbps
    pub bandwidth_mbps: f64,
}

impl ResourceCapacity {
    /// Creates a new capacity
    pub fn new(compute_rate: f64, memory_mb: f64, storage_mb: f64, bandwidth_mbps: f64) -> Self {
        Self {
            compute_rate,
            memory_mb,
            storage_mb,
            bandwidth_mbps,
        }
    }

    /// Returns this capacity scaled by a quota fraction
    pub fn scaled(&self, fraction: f64) -> Self {
        Self {
            compute_rate: self.compute_rate * fraction,
            memory_mb: self.memory_mb * fraction,
            storage_mb: self.storage_mb * fraction,
            bandwidth_mbps: self.bandwidth_mbps * fraction,
        }
    }
}

impl std::fmt::Display for ResourceCapacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.0} units/s, {:.0} MB, {:.0} Mbps",
            self.compute_rate, self.memory_mb, self.bandwidth_mbps
        )
    }
}

/// Utilization ratios, each clamped to `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceUtilization {
    /// Compute utilization
    pub compute: f64,
    /// Memory utilization
    pub memory: f64,
    /// Bandwidth utilization
    pub bandwidth: f64,
}

impl ResourceUtilization {
    /// Weight of compute in the load score
    pub const COMPUTE_WEIGHT: f64 = 0.6;
    /// Weight of memory in the load score
    pub const MEMORY_WEIGHT: f64 = 0.3;
    /// Weight of bandwidth in the load score
    pub const BANDWIDTH_WEIGHT: f64 = 0.1;

    /// Computes utilization of `tasks` against `capacity`.
    ///
    /// Compute is the summed demand over the compute rate, memory a fixed
    /// per-task footprint over memory capacity, and bandwidth a tenth of each
    /// input size over link bandwidth.
    pub fn from_tasks<'a, I>(tasks: I, capacity: &ResourceCapacity, task_memory_mb: f64) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut demand = 0.0;
        let mut link = 0.0;
        let mut count = 0usize;
        for task in tasks {
            demand += task.compute_demand as f64;
            link += task.input_size as f64 / BANDWIDTH_SHARE_DIVISOR;
            count += 1;
        }

        Self {
            compute: ratio(demand, capacity.compute_rate),
            memory: ratio(count as f64 * task_memory_mb, capacity.memory_mb),
            bandwidth: ratio(link, capacity.bandwidth_mbps),
        }
    }

    /// Weighted blend used to rank edge nodes; compute dominates
    pub fn load_score(&self) -> f64 {
        self.compute * Self::COMPUTE_WEIGHT
            + self.memory * Self::MEMORY_WEIGHT
            + self.bandwidth * Self::BANDWIDTH_WEIGHT
    }
}

impl std::fmt::Display for ResourceUtilization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "compute: {:.1}%, memory: {:.1}%, bandwidth: {:.1}%",
            self.compute * 100.0,
            self.memory * 100.0,
            self.bandwidth * 100.0
        )
    }
}

fn ratio(used: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return if used > 0.0 { 1.0 } else { 0.0 };
    }
    (used / capacity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;
    use crate::task::TaskId;
    use edgeslice_common::TaskType;

    fn tasks(n: u64, task_type: TaskType) -> Vec<Task> {
        (0..n)
            .map(|i| Task::from_profile(TaskId::new(DeviceId::new(0), i), task_type, 0.0))
            .collect()
    }

    #[test]
    fn test_capacity_scaled() {
        let cap = ResourceCapacity::new(5000.0, 8192.0, 1000.0, 1000.0).scaled(0.5);
        assert_eq!(cap.compute_rate, 2500.0);
        assert_eq!(cap.memory_mb, 4096.0);
        assert_eq!(cap.storage_mb, 500.0);
        assert_eq!(cap.bandwidth_mbps, 500.0);
    }

    #[test]
    fn test_utilization_from_tasks() {
        let cap = ResourceCapacity::new(10000.0, 2048.0, 0.0, 1000.0);
        let active = tasks(2, TaskType::Medium);
        let util = ResourceUtilization::from_tasks(&active, &cap, EDGE_TASK_MEMORY_MB);

        assert!((util.compute - 0.4).abs() < 1e-12);
        assert!((util.memory - 0.5).abs() < 1e-12);
        // 2 * 5120 / 10 = 1024 over 1000
        assert_eq!(util.bandwidth, 1.0);
    }

    #[test]
    fn test_utilization_clamped() {
        let cap = ResourceCapacity::new(1000.0, 512.0, 0.0, 10.0);
        let active = tasks(5, TaskType::Intensive);
        let util = ResourceUtilization::from_tasks(&active, &cap, CLOUD_TASK_MEMORY_MB);
        assert_eq!(util.compute, 1.0);
        assert_eq!(util.memory, 1.0);
        assert_eq!(util.bandwidth, 1.0);
        assert!((util.load_score() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_utilization_empty() {
        let cap = ResourceCapacity::new(1000.0, 512.0, 0.0, 10.0);
        let util = ResourceUtilization::from_tasks(std::iter::empty(), &cap, EDGE_TASK_MEMORY_MB);
        assert_eq!(util, ResourceUtilization::default());
    }

    #[test]
    fn test_load_score_weights() {
        let util = ResourceUtilization {
            compute: 0.5,
            memory: 0.5,
            bandwidth: 1.0,
        };
        assert!((util.load_score() - 0.55).abs() < 1e-12);
    }
}
