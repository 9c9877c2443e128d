//! Aggregate statistics over completed tasks

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::tier::ComputeTier;

/// Scheduler-wide statistics; all means are zero when nothing has completed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatistics {
    /// Completed tasks
    pub total_completed: usize,
    /// Mean of completion minus creation, in seconds
    pub mean_response_time: f64,
    /// Mean of completion minus start, in seconds
    pub mean_service_time: f64,
    /// Mean energy attributed per task
    pub mean_energy: f64,
    /// Completed on the generating device
    pub device_count: usize,
    /// Completed on an edge slice
    pub edge_count: usize,
    /// Completed on the cloud
    pub cloud_count: usize,
    /// Percentage of completed tasks that met their deadline
    pub deadline_met_percentage: f64,
}

impl TaskStatistics {
    /// Computes statistics over `completed`
    pub fn from_completed(completed: &[Task]) -> Self {
        let mut acc = StatisticsAccumulator::default();
        for task in completed {
            acc.add(task);
        }
        acc.snapshot()
    }

    /// Tasks completed off-device
    pub fn offloaded_count(&self) -> usize {
        self.edge_count + self.cloud_count
    }

    /// Completed count for one tier
    pub fn count_for(&self, tier: ComputeTier) -> usize {
        match tier {
            ComputeTier::Device => self.device_count,
            ComputeTier::Edge => self.edge_count,
            ComputeTier::Cloud => self.cloud_count,
        }
    }
}

/// Running sums over completed tasks
#[derive(Debug, Clone, Default)]
pub struct StatisticsAccumulator {
    count: usize,
    response: f64,
    service: f64,
    energy: f64,
    deadline_met: usize,
    device: usize,
    edge: usize,
    cloud: usize,
}

impl StatisticsAccumulator {
    /// Adds one completed task
    pub fn add(&mut self, task: &Task) {
        self.count += 1;
        self.response += task.response_time().unwrap_or_default();
        self.service += task.service_time().unwrap_or_default();
        self.energy += task.energy();
        if task.met_deadline() {
            self.deadline_met += 1;
        }
        match task.site().map(|site| site.tier()) {
            Some(ComputeTier::Device) => self.device += 1,
            Some(ComputeTier::Edge) => self.edge += 1,
            Some(ComputeTier::Cloud) => self.cloud += 1,
            None => {}
        }
    }

    /// Current statistics
    pub fn snapshot(&self) -> TaskStatistics {
        if self.count == 0 {
            return TaskStatistics::default();
        }
        let n = self.count as f64;
        TaskStatistics {
            total_completed: self.count,
            mean_response_time: self.response / n,
            mean_service_time: self.service / n,
            mean_energy: self.energy / n,
            device_count: self.device,
            edge_count: self.edge,
            cloud_count: self.cloud,
            deadline_met_percentage: self.deadline_met as f64 / n * 100.0,
        }
    }
}

impl std::fmt::Display for TaskStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} completed (device {}, edge {}, cloud {}), mean response {:.3}s, mean service {:.3}s, mean energy {:.4}, deadlines met {:.1}%",
            self.total_completed,
            self.device_count,
            self.edge_count,
            self.cloud_count,
            self.mean_response_time,
            self.mean_service_time,
            self.mean_energy,
            self.deadline_met_percentage
        )
    }
}
