//! IoT devices
//!
//! A device generates tasks, executes the ones kept local and pays the
//! battery cost of both local execution and uplink transfers.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use edgeslice_common::config::{DeviceTemplate, NetworkTechnologyConfig};
use edgeslice_common::{Position, TaskType, WirelessTechnology};

use crate::resource::{ResourceCapacity, ResourceUtilization, EDGE_TASK_MEMORY_MB};
use crate::task::{Task, TaskId};
use crate::tier::ExecutionSite;

/// Bytes per second carried by one Mbps
pub const BYTES_PER_SEC_PER_MBPS: f64 = 125_000.0;

/// Battery drain multiplier while a task executes locally
const LOCAL_EXECUTION_DRAIN_FACTOR: f64 = 2.0;

/// Unique device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Creates a new device ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the inner ID value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device-{}", self.0)
    }
}

/// Uplink characteristics derived from the device's wireless technology
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub technology: WirelessTechnology,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    pub reliability: f64,
    pub energy_per_bit: f64,
}

impl NetworkProfile {
    /// Builds a profile from the technology map entry
    pub fn new(technology: WirelessTechnology, params: &NetworkTechnologyConfig) -> Self {
        Self {
            technology,
            latency_ms: params.latency_ms,
            bandwidth_mbps: params.bandwidth,
            reliability: params.reliability,
            energy_per_bit: params.energy_per_bit,
        }
    }

    /// Link quality normalised against a 100 Mbps reference
    pub fn quality(&self) -> f64 {
        self.reliability * (self.bandwidth_mbps / 100.0)
    }

    /// Seconds needed to push `bytes` over the link
    pub fn transfer_time(&self, bytes: u64) -> f64 {
        bytes as f64 / (self.bandwidth_mbps * BYTES_PER_SEC_PER_MBPS)
    }

    /// Battery spent pushing `bytes` over the link
    pub fn transfer_energy(&self, bytes: u64) -> f64 {
        self.transfer_time(bytes) * self.energy_per_bit
    }
}

/// A compute-constrained endpoint
#[derive(Debug, Clone)]
pub struct IoTDevice {
    id: DeviceId,
    name: String,
    capacity: ResourceCapacity,
    battery_capacity: f64,
    battery_level: f64,
    drain_rate: f64,
    generation_rate: f64,
    mobile: bool,
    speed: f64,
    supported_types: Vec<TaskType>,
    position: Position,
    network: NetworkProfile,
    next_sequence: u64,
    local_count: u64,
    offloaded_count: u64,
    energy_consumed: f64,
    running: Vec<Task>,
    utilization: ResourceUtilization,
}

impl IoTDevice {
    /// Creates a device from a template
    pub fn from_template(
        id: DeviceId,
        name: impl Into<String>,
        template: &DeviceTemplate,
        network: NetworkProfile,
        position: Position,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            capacity: ResourceCapacity::new(
                template.mips as f64,
                template.ram as f64,
                0.0,
                network.bandwidth_mbps,
            ),
            battery_capacity: template.battery_capacity,
            battery_level: template.battery_capacity,
            drain_rate: template.battery_consumption_rate,
            generation_rate: template.task_generation_rate,
            mobile: template.mobility,
            speed: template.mobility_speed,
            supported_types: template.task_types(),
            position,
            network,
            next_sequence: 0,
            local_count: 0,
            offloaded_count: 0,
            energy_consumed: 0.0,
            running: Vec::new(),
            utilization: ResourceUtilization::default(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute units per second
    pub fn compute_rate(&self) -> f64 {
        self.capacity.compute_rate
    }

    pub fn battery_capacity(&self) -> f64 {
        self.battery_capacity
    }

    pub fn battery_level(&self) -> f64 {
        self.battery_level
    }

    /// Battery level as a fraction of capacity
    pub fn battery_fraction(&self) -> f64 {
        if self.battery_capacity <= 0.0 {
            return 0.0;
        }
        self.battery_level / self.battery_capacity
    }

    /// Battery drain per second of local processing
    pub fn drain_rate(&self) -> f64 {
        self.drain_rate
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn network(&self) -> &NetworkProfile {
        &self.network
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    /// Tasks generated so far
    pub fn tasks_generated(&self) -> u64 {
        self.next_sequence
    }

    /// Tasks accepted for local execution
    pub fn local_count(&self) -> u64 {
        self.local_count
    }

    /// Tasks accepted by an edge node or the cloud
    pub fn offloaded_count(&self) -> u64 {
        self.offloaded_count
    }

    /// Total battery spent on execution and transfers
    pub fn energy_consumed(&self) -> f64 {
        self.energy_consumed
    }

    /// Tasks currently executing on this device
    pub fn running_tasks(&self) -> &[Task] {
        &self.running
    }

    pub fn utilization(&self) -> ResourceUtilization {
        self.utilization
    }

    /// Overrides the battery level, clamped to `[0, capacity]`
    pub fn set_battery_level(&mut self, level: f64) {
        self.battery_level = level.clamp(0.0, self.battery_capacity);
    }

    /// Random walk step of `speed * dt` in a uniformly random heading
    pub fn move_step<R: Rng + ?Sized>(&mut self, rng: &mut R, dt: f64) {
        if !self.mobile {
            return;
        }
        let distance = self.speed * dt;
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        self.position = self
            .position
            .moved_within_area(distance * angle.cos(), distance * angle.sin());
    }

    /// Bernoulli draw with `p = rate * dt`, clamped to `[0, 1]`.
    ///
    /// On success a task is created with the next sequence number and a type
    /// chosen from the device's compute rate and supported types.
    pub fn generate_task<R: Rng + ?Sized>(&mut self, rng: &mut R, now: f64, dt: f64) -> Option<Task> {
        let probability = (self.generation_rate * dt).clamp(0.0, 1.0);
        if rng.gen::<f64>() >= probability {
            return None;
        }

        let task_type = self.choose_task_type(rng);
        let id = TaskId::new(self.id, self.next_sequence);
        self.next_sequence += 1;

        trace!(device = %self.id, task_id = %id, %task_type, now, "generated task");
        Some(Task::from_profile(id, task_type, now))
    }

    /// Picks a task type by compute rate, restricted to supported types.
    ///
    /// Below 1000 units/s only lightweight work is emitted, below 3000 a fair
    /// coin picks lightweight or medium, otherwise all three are uniform. When
    /// that set shares nothing with the supported types the supported types
    /// are used instead.
    fn choose_task_type<R: Rng + ?Sized>(&self, rng: &mut R) -> TaskType {
        let by_rate: &[TaskType] = if self.capacity.compute_rate < 1000.0 {
            &[TaskType::Lightweight]
        } else if self.capacity.compute_rate < 3000.0 {
            &[TaskType::Lightweight, TaskType::Medium]
        } else {
            &TaskType::ALL
        };

        let allowed: Vec<TaskType> = by_rate
            .iter()
            .copied()
            .filter(|t| self.supported_types.contains(t))
            .collect();
        let candidates = if allowed.is_empty() {
            &self.supported_types
        } else {
            &allowed
        };

        match candidates.len() {
            0 => TaskType::Lightweight,
            1 => candidates[0],
            n => candidates[rng.gen_range(0..n)],
        }
    }

    /// Seconds to execute `task` locally
    pub fn local_service_time(&self, task: &Task) -> f64 {
        task.compute_demand as f64 / self.capacity.compute_rate
    }

    /// Accepts a task for local execution; always succeeds.
    ///
    /// Returns the scheduled completion time.
    pub fn execute_locally(&mut self, mut task: Task, now: f64) -> f64 {
        let service_time = self.local_service_time(&task);
        let energy = service_time * self.drain_rate * LOCAL_EXECUTION_DRAIN_FACTOR;
        self.consume_battery(energy);

        task.mark_running(ExecutionSite::Device(self.id), now, service_time, energy);
        let completion = now + service_time;
        self.local_count += 1;
        self.running.push(task);
        self.refresh_utilization();

        debug!(device = %self.id, completion, energy, "executing task locally");
        completion
    }

    /// Charges the uplink cost of a task an edge node or the cloud accepted
    pub fn record_offload(&mut self, transfer_energy: f64) {
        self.consume_battery(transfer_energy);
        self.offloaded_count += 1;
    }

    fn consume_battery(&mut self, energy: f64) {
        self.energy_consumed += energy;
        self.battery_level = (self.battery_level - energy).max(0.0);
        if self.battery_level == 0.0 && energy > 0.0 {
            trace!(device = %self.id, "battery depleted");
        }
    }

    /// Moves tasks whose completion time has passed out of the running set
    pub fn collect_completed(&mut self, now: f64) -> Vec<Task> {
        let (mut done, still_running): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.running)
                .into_iter()
                .partition(|task| task.is_due(now));
        self.running = still_running;

        for task in &mut done {
            task.mark_completed();
        }
        if !done.is_empty() {
            self.refresh_utilization();
        }
        done
    }

    fn refresh_utilization(&mut self) {
        self.utilization =
            ResourceUtilization::from_tasks(&self.running, &self.capacity, EDGE_TASK_MEMORY_MB);
    }
}

impl std::fmt::Display for IoTDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' [{:.0} units/s, battery {:.1}%, {}]",
            self.id,
            self.name,
            self.capacity.compute_rate,
            self.battery_fraction() * 100.0,
            self.network.technology
        )
    }
}
