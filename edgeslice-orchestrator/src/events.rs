//! Structured scheduler event stream

use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::node::NodeId;
use crate::task::TaskId;
use crate::tier::ExecutionSite;

/// Branch of the placement chain that accepted a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementBranch {
    /// The decision engine kept the task local
    Local,
    /// The selected edge node admitted it
    Edge,
    /// The cloud admitted it
    Cloud,
    /// Offloading was decided but nobody remote accepted
    LocalFallback,
}

impl std::fmt::Display for PlacementBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementBranch::Local => write!(f, "local"),
            PlacementBranch::Edge => write!(f, "edge"),
            PlacementBranch::Cloud => write!(f, "cloud"),
            PlacementBranch::LocalFallback => write!(f, "local-fallback"),
        }
    }
}

/// Entity that turned a task away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectedBy {
    /// Every slice of this edge node is saturated
    Edge(NodeId),
    /// The cloud reached its concurrency limit
    Cloud(NodeId),
}

/// Scheduler event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    /// A task started running
    Admitted {
        task: TaskId,
        site: ExecutionSite,
        branch: PlacementBranch,
        time: f64,
        completion_time: f64,
    },
    /// A candidate refused the task
    Rejected { task: TaskId, by: RejectedBy, time: f64 },
    /// No candidate accepted; the task returns to the pending pool
    Deferred { task: TaskId, time: f64 },
    /// A task finished
    Completed {
        task: TaskId,
        site: ExecutionSite,
        time: f64,
    },
    /// The owning device could not be resolved
    Dropped {
        task: TaskId,
        device: DeviceId,
        time: f64,
    },
}

impl SchedulerEvent {
    /// Task the event refers to
    pub fn task(&self) -> TaskId {
        match self {
            SchedulerEvent::Admitted { task, .. }
            | SchedulerEvent::Rejected { task, .. }
            | SchedulerEvent::Deferred { task, .. }
            | SchedulerEvent::Completed { task, .. }
            | SchedulerEvent::Dropped { task, .. } => *task,
        }
    }

    /// Simulated time of the event
    pub fn time(&self) -> f64 {
        match self {
            SchedulerEvent::Admitted { time, .. }
            | SchedulerEvent::Rejected { time, .. }
            | SchedulerEvent::Deferred { time, .. }
            | SchedulerEvent::Completed { time, .. }
            | SchedulerEvent::Dropped { time, .. } => *time,
        }
    }
}

impl std::fmt::Display for SchedulerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerEvent::Admitted {
                task, site, branch, ..
            } => write!(f, "task {task} admitted on {site} ({branch})"),
            SchedulerEvent::Rejected { task, by, .. } => match by {
                RejectedBy::Edge(node) => write!(f, "task {task} rejected by {node}"),
                RejectedBy::Cloud(node) => write!(f, "task {task} rejected by cloud-{}", node.value()),
            },
            SchedulerEvent::Deferred { task, .. } => write!(f, "task {task} deferred"),
            SchedulerEvent::Completed { task, site, .. } => write!(f, "task {task} completed on {site}"),
            SchedulerEvent::Dropped { task, device, .. } => {
                write!(f, "task {task} dropped, {device} unknown")
            }
        }
    }
}
