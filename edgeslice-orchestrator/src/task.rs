//! Task definitions
//!
//! A task is the unit of work generated by a device. Its demand is fixed at
//! creation; its lifecycle fields are written once when an entity accepts it
//! and frozen when it completes.

use serde::{Deserialize, Serialize};

use edgeslice_common::TaskType;

use crate::device::DeviceId;
use crate::tier::ExecutionSite;

/// Unique task identifier: generating device plus per-device sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    /// Generating device
    pub device: DeviceId,
    /// Per-device sequence number, starting at 0
    pub sequence: u64,
}

impl TaskId {
    /// Creates a new task ID
    pub fn new(device: DeviceId, sequence: u64) -> Self {
        Self { device, sequence }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.device.value(), self.sequence)
    }
}

/// Task lifecycle status
///
/// Transitions are monotonic: `Pending -> Running -> Completed`. A task no
/// entity accepts stays `Pending` and is retried on the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting for placement
    Pending,
    /// Accepted by an entity
    Running,
    /// Finished; terminal
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "Pending"),
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Demand profile of a task type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskProfile {
    /// Compute units required
    pub compute_demand: u64,
    /// Input size in bytes
    pub input_size: u64,
    /// Output size in bytes
    pub output_size: u64,
    /// Relative deadline in seconds
    pub deadline: f64,
}

impl TaskProfile {
    /// Returns the fixed profile for a task type
    pub fn for_type(task_type: TaskType) -> Self {
        match task_type {
            TaskType::Lightweight => Self {
                compute_demand: 500,
                input_size: 1024,
                output_size: 512,
                deadline: 2.0,
            },
            TaskType::Medium => Self {
                compute_demand: 2000,
                input_size: 5120,
                output_size: 1024,
                deadline: 5.0,
            },
            TaskType::Intensive => Self {
                compute_demand: 8000,
                input_size: 10240,
                output_size: 2048,
                deadline: 10.0,
            },
        }
    }
}

/// A unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Task category
    pub task_type: TaskType,
    /// Simulated creation time in seconds
    pub creation_time: f64,
    /// Compute units required
    pub compute_demand: u64,
    /// Input size in bytes
    pub input_size: u64,
    /// Output size in bytes
    pub output_size: u64,
    /// Relative deadline in seconds
    pub deadline: f64,
    status: TaskStatus,
    start_time: Option<f64>,
    completion_time: Option<f64>,
    site: Option<ExecutionSite>,
    energy: f64,
}

impl Task {
    /// Creates a pending task with explicit demand
    pub fn new(
        id: TaskId,
        task_type: TaskType,
        creation_time: f64,
        compute_demand: u64,
        input_size: u64,
        output_size: u64,
        deadline: f64,
    ) -> Self {
        Self {
            id,
            task_type,
            creation_time,
            compute_demand,
            input_size,
            output_size,
            deadline,
            status: TaskStatus::Pending,
            start_time: None,
            completion_time: None,
            site: None,
            energy: 0.0,
        }
    }

    /// Creates a pending task using the standard profile of its type
    pub fn from_profile(id: TaskId, task_type: TaskType, creation_time: f64) -> Self {
        let profile = TaskProfile::for_type(task_type);
        Self::new(
            id,
            task_type,
            creation_time,
            profile.compute_demand,
            profile.input_size,
            profile.output_size,
            profile.deadline,
        )
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Start time, once running
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Scheduled completion time, once running
    pub fn completion_time(&self) -> Option<f64> {
        self.completion_time
    }

    /// Execution site, once running
    pub fn site(&self) -> Option<ExecutionSite> {
        self.site
    }

    /// Energy attributed to this task
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Returns true if the task has completed
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Returns true once `now` has reached the scheduled completion time
    pub fn is_due(&self, now: f64) -> bool {
        self.completion_time.is_some_and(|done| now >= done)
    }

    /// Completion minus creation
    pub fn response_time(&self) -> Option<f64> {
        self.completion_time.map(|done| done - self.creation_time)
    }

    /// Completion minus start
    pub fn service_time(&self) -> Option<f64> {
        match (self.start_time, self.completion_time) {
            (Some(start), Some(done)) => Some(done - start),
            _ => None,
        }
    }

    /// Returns true if the task finished within its relative deadline
    pub fn met_deadline(&self) -> bool {
        self.response_time()
            .is_some_and(|response| response <= self.deadline)
    }

    /// Transitions `Pending -> Running`.
    ///
    /// Called by the accepting entity; ownership of the task moves with it.
    pub(crate) fn mark_running(
        &mut self,
        site: ExecutionSite,
        now: f64,
        service_time: f64,
        energy: f64,
    ) {
        debug_assert_eq!(self.status, TaskStatus::Pending, "task {} started twice", self.id);
        self.status = TaskStatus::Running;
        self.site = Some(site);
        self.start_time = Some(now);
        self.completion_time = Some(now + service_time);
        self.energy = energy;
    }

    /// Transitions `Running -> Completed`
    pub(crate) fn mark_completed(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Running, "task {} not running", self.id);
        self.status = TaskStatus::Completed;
    }
}
