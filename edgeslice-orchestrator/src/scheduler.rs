//! Task scheduler
//!
//! Owns the pending, running and completed task sets. Devices, edge nodes and
//! the cloud are borrowed for the duration of a pass only.
//!
//! Placement chain for a pending task:
//!
//! ```text
//!   decide ──local──> device
//!     │
//!   offload
//!     │
//!     ├──> selected edge node (slice admission) ──ok──> edge
//!     ├──> cloud, if configured ──────────────────ok──> cloud
//!     ├──> device, if local fallback is allowed
//!     └──> deferred back to pending
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace, warn};

use edgeslice_common::config::OffloadingPolicyConfig;

use crate::device::IoTDevice;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::{PlacementBranch, RejectedBy, SchedulerEvent};
use crate::node::{Admission, CloudNode, EdgeNode};
use crate::policy::OffloadingStrategy;
use crate::stats::{StatisticsAccumulator, TaskStatistics};
use crate::task::{Task, TaskId};
use crate::tier::ExecutionSite;

/// Task scheduler
#[derive(Debug)]
pub struct TaskScheduler {
    strategy: OffloadingStrategy,
    allow_local_fallback: bool,
    pending: Vec<Task>,
    running: BTreeMap<TaskId, ExecutionSite>,
    completed: Vec<Task>,
    statistics: StatisticsAccumulator,
    events: Vec<SchedulerEvent>,
    branch_counts: HashMap<PlacementBranch, u64>,
    deferred_total: u64,
    dropped_total: u64,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(OffloadingStrategy::default(), true)
    }
}

impl TaskScheduler {
    /// Creates a scheduler with the given strategy
    pub fn new(strategy: OffloadingStrategy, allow_local_fallback: bool) -> Self {
        Self {
            strategy,
            allow_local_fallback,
            pending: Vec::new(),
            running: BTreeMap::new(),
            completed: Vec::new(),
            statistics: StatisticsAccumulator::default(),
            events: Vec::new(),
            branch_counts: HashMap::new(),
            deferred_total: 0,
            dropped_total: 0,
        }
    }

    /// Creates a scheduler from the offloading policy section
    pub fn from_config(config: &OffloadingPolicyConfig) -> Self {
        Self::new(
            OffloadingStrategy::from_config(config),
            config.allow_local_fallback,
        )
    }

    pub fn strategy(&self) -> &OffloadingStrategy {
        &self.strategy
    }

    /// Adds a newly generated task to the pending pool
    pub fn submit(&mut self, task: Task) {
        trace!(task_id = %task.id, task_type = %task.task_type, "submitted task");
        self.pending.push(task);
    }

    /// Attempts to place every pending task.
    ///
    /// Returns the number of tasks that started running in this pass. Tasks
    /// nobody accepted remain pending in their original order.
    pub fn schedule_pending_tasks(
        &mut self,
        devices: &mut [IoTDevice],
        edges: &mut [EdgeNode],
        mut cloud: Option<&mut CloudNode>,
        now: f64,
    ) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut placed = 0;

        for task in pending {
            let device_index = match resolve_device(devices, &task) {
                Ok(index) => index,
                Err(err) => {
                    warn!(error = %err, "dropping task");
                    self.dropped_total += 1;
                    self.events.push(SchedulerEvent::Dropped {
                        task: task.id,
                        device: task.id.device,
                        time: now,
                    });
                    continue;
                }
            };

            match self.place(task, &mut devices[device_index], edges, cloud.as_deref_mut(), now) {
                Ok(()) => placed += 1,
                Err(task) => {
                    debug!(task_id = %task.id, "no entity accepted task, deferring");
                    self.deferred_total += 1;
                    self.events.push(SchedulerEvent::Deferred {
                        task: task.id,
                        time: now,
                    });
                    self.pending.push(task);
                }
            }
        }

        placed
    }

    /// Runs the placement chain for one task. Returns the task if it was deferred.
    fn place(
        &mut self,
        task: Task,
        device: &mut IoTDevice,
        edges: &mut [EdgeNode],
        cloud: Option<&mut CloudNode>,
        now: f64,
    ) -> Result<(), Task> {
        let decision = self.strategy.decide(&task, device, edges);
        trace!(
            task_id = %task.id,
            offload = decision.offload,
            reason = %decision.reason,
            "offloading decision"
        );

        if !decision.offload {
            self.run_locally(task, device, PlacementBranch::Local, now);
            return Ok(());
        }

        let task_id = task.id;
        let transfer_energy = device.network().transfer_energy(task.input_size);
        let mut task = task;

        let target = decision
            .target
            .and_then(|id| edges.iter().position(|node| node.id() == id));
        if let Some(index) = target {
            let node = &mut edges[index];
            let node_id = node.id();
            match node.admit(task, now, transfer_energy) {
                Ok(admission) => {
                    device.record_offload(transfer_energy);
                    self.record_admission(task_id, admission, PlacementBranch::Edge);
                    return Ok(());
                }
                Err(returned) => {
                    self.events.push(SchedulerEvent::Rejected {
                        task: task_id,
                        by: RejectedBy::Edge(node_id),
                        time: now,
                    });
                    task = returned;
                }
            }
        }

        if let Some(cloud) = cloud {
            let cloud_id = cloud.id();
            match cloud.admit(task, now, transfer_energy) {
                Ok(admission) => {
                    device.record_offload(transfer_energy);
                    self.record_admission(task_id, admission, PlacementBranch::Cloud);
                    return Ok(());
                }
                Err(returned) => {
                    self.events.push(SchedulerEvent::Rejected {
                        task: task_id,
                        by: RejectedBy::Cloud(cloud_id),
                        time: now,
                    });
                    task = returned;
                }
            }
        }

        if self.allow_local_fallback {
            self.run_locally(task, device, PlacementBranch::LocalFallback, now);
            Ok(())
        } else {
            Err(task)
        }
    }

    fn run_locally(&mut self, task: Task, device: &mut IoTDevice, branch: PlacementBranch, now: f64) {
        let task_id = task.id;
        let completion_time = device.execute_locally(task, now);
        let admission = Admission {
            site: ExecutionSite::Device(device.id()),
            start_time: now,
            completion_time,
        };
        self.record_admission(task_id, admission, branch);
    }

    fn record_admission(&mut self, task: TaskId, admission: Admission, branch: PlacementBranch) {
        debug!(task_id = %task, site = %admission.site, %branch, "task admitted");
        self.running.insert(task, admission.site);
        *self.branch_counts.entry(branch).or_insert(0) += 1;
        self.events.push(SchedulerEvent::Admitted {
            task,
            site: admission.site,
            branch,
            time: admission.start_time,
            completion_time: admission.completion_time,
        });
    }

    /// Collects tasks every entity reports as finished at `now`.
    ///
    /// Returns the number of tasks that completed.
    pub fn update_task_status(
        &mut self,
        devices: &mut [IoTDevice],
        edges: &mut [EdgeNode],
        cloud: Option<&mut CloudNode>,
        now: f64,
    ) -> usize {
        let mut finished = Vec::new();
        for device in devices.iter_mut() {
            finished.extend(device.collect_completed(now));
        }
        for node in edges.iter_mut() {
            finished.extend(node.collect_completed(now));
        }
        if let Some(cloud) = cloud {
            finished.extend(cloud.collect_completed(now));
        }

        let count = finished.len();
        for task in finished {
            let site = self.running.remove(&task.id).or(task.site());
            if let Some(site) = site {
                self.events.push(SchedulerEvent::Completed {
                    task: task.id,
                    site,
                    time: now,
                });
            }
            self.statistics.add(&task);
            self.completed.push(task);
        }
        count
    }

    /// Aggregate statistics over completed tasks; does not modify state
    pub fn statistics(&self) -> TaskStatistics {
        self.statistics.snapshot()
    }

    /// Hands buffered events to the caller
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_tasks(&self) -> &[Task] {
        &self.pending
    }

    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Site of a running task
    pub fn running_site(&self, task: &TaskId) -> Option<ExecutionSite> {
        self.running.get(task).copied()
    }

    /// How often a placement branch was taken
    pub fn branch_count(&self, branch: PlacementBranch) -> u64 {
        self.branch_counts.get(&branch).copied().unwrap_or(0)
    }

    /// Total deferrals; a task deferred on several passes counts each time
    pub fn deferred_total(&self) -> u64 {
        self.deferred_total
    }

    /// Tasks dropped because their device could not be resolved
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}

fn resolve_device(devices: &[IoTDevice], task: &Task) -> OrchestratorResult<usize> {
    devices
        .iter()
        .position(|device| device.id() == task.id.device)
        .ok_or(OrchestratorError::DeviceNotFound {
            task_id: task.id,
            device: task.id.device,
        })
}
