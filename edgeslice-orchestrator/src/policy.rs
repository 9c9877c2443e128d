//! Offloading decision engine
//!
//! Decides, per task, whether it leaves the device and which edge node should
//! receive it. The energy-aware strategy evaluates, first match wins:
//!
//! 1. battery fraction below threshold: offload
//! 2. demand above device compute rate: offload
//! 3. large input over a good link: offload
//! 4. remote utility strictly below local utility: offload
//! 5. no remote candidate for step 4: local

use serde::{Deserialize, Serialize};
use tracing::trace;

use edgeslice_common::config::{OffloadingPolicyConfig, StrategyKind};

use crate::device::IoTDevice;
use crate::node::{EdgeNode, NodeId};
use crate::slice::has_eligible_slice;
use crate::task::Task;

/// Multiplier applied to estimated local energy
const LOCAL_ENERGY_FACTOR: f64 = 3.0;

/// Multiplier applied to estimated transfer energy
const TRANSFER_ENERGY_FACTOR: f64 = 0.7;

/// Weight of the battery preservation term in local utility
const BATTERY_PRESERVATION_WEIGHT: f64 = 0.1;

/// Penalty added to nodes without a type-eligible slice
const INELIGIBLE_NODE_PENALTY: f64 = 10_000.0;

/// Scale applied to load score when ranking nodes
const LOAD_SCORE_SCALE: f64 = 100.0;

/// Why a decision was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    /// Battery below threshold
    LowBattery,
    /// Demand exceeds the device's compute rate
    ExceedsDeviceCapability,
    /// Large input and a good link
    LargeTaskGoodLink,
    /// Remote utility strictly lower
    RemoteCheaper,
    /// Local utility lower or equal
    LocalCheaper,
    /// No remote candidate to compare against
    NoCandidate,
    /// Fixed by a baseline strategy
    Strategy,
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionReason::LowBattery => write!(f, "LowBattery"),
            DecisionReason::ExceedsDeviceCapability => write!(f, "ExceedsDeviceCapability"),
            DecisionReason::LargeTaskGoodLink => write!(f, "LargeTaskGoodLink"),
            DecisionReason::RemoteCheaper => write!(f, "RemoteCheaper"),
            DecisionReason::LocalCheaper => write!(f, "LocalCheaper"),
            DecisionReason::NoCandidate => write!(f, "NoCandidate"),
            DecisionReason::Strategy => write!(f, "Strategy"),
        }
    }
}

/// Outcome of an offloading decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadDecision {
    /// True if the task should leave the device
    pub offload: bool,
    /// Rule that produced the decision
    pub reason: DecisionReason,
    /// Edge node the task should try first; only set when offloading
    pub target: Option<NodeId>,
}

impl OffloadDecision {
    fn offload(reason: DecisionReason) -> Self {
        Self {
            offload: true,
            reason,
            target: None,
        }
    }

    fn local(reason: DecisionReason) -> Self {
        Self {
            offload: false,
            reason,
            target: None,
        }
    }

    fn toward(mut self, target: Option<NodeId>) -> Self {
        self.target = target;
        self
    }
}

/// Utility weights and guard thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAwarePolicy {
    pub battery_threshold: f64,
    pub task_size_threshold: u64,
    pub network_quality_threshold: f64,
    pub weight_energy: f64,
    pub weight_latency: f64,
    pub weight_cost: f64,
}

impl Default for EnergyAwarePolicy {
    fn default() -> Self {
        Self::from_config(&OffloadingPolicyConfig::default())
    }
}

impl EnergyAwarePolicy {
    /// Creates the policy from its descriptor
    pub fn from_config(config: &OffloadingPolicyConfig) -> Self {
        Self {
            battery_threshold: config.battery_threshold,
            task_size_threshold: config.task_size_threshold,
            network_quality_threshold: config.network_quality_threshold,
            weight_energy: config.weight_energy,
            weight_latency: config.weight_latency,
            weight_cost: config.weight_cost,
        }
    }

    /// Utility of executing on the device; lower is better
    pub fn local_utility(&self, task: &Task, device: &IoTDevice) -> f64 {
        let local_time = device.local_service_time(task);
        let local_energy = local_time * device.drain_rate() * LOCAL_ENERGY_FACTOR;
        let battery_term = BATTERY_PRESERVATION_WEIGHT * (1.0 - device.battery_fraction());

        self.weight_energy * local_energy + self.weight_latency * local_time + battery_term
    }

    /// Utility of executing on `node`; lower is better
    pub fn remote_utility(&self, task: &Task, device: &IoTDevice, node: &EdgeNode) -> f64 {
        let network = device.network();
        let transfer_time = network.transfer_time(task.input_size);
        let transfer_energy = transfer_time * network.energy_per_bit * TRANSFER_ENERGY_FACTOR;
        let remote_time = network.latency_ms / 1000.0
            + transfer_time
            + task.compute_demand as f64 / node.compute_rate();
        let cost = task.compute_demand as f64 * node.cost_per_unit();

        self.weight_energy * transfer_energy + self.weight_latency * remote_time + self.weight_cost * cost
    }

    /// Runs the guard chain, then the utility comparison against the node
    /// [`select_edge_node`] would pick.
    ///
    /// Offload decisions carry that node as their target.
    pub fn decide(&self, task: &Task, device: &IoTDevice, candidates: &[EdgeNode]) -> OffloadDecision {
        let guard = if device.battery_fraction() < self.battery_threshold {
            Some(DecisionReason::LowBattery)
        } else if task.compute_demand as f64 > device.compute_rate() {
            Some(DecisionReason::ExceedsDeviceCapability)
        } else if task.input_size > self.task_size_threshold
            && device.network().quality() > self.network_quality_threshold
        {
            Some(DecisionReason::LargeTaskGoodLink)
        } else {
            None
        };

        let selected = select_edge_index(task, device, candidates);
        let target = selected.map(|index| candidates[index].id());
        if let Some(reason) = guard {
            return OffloadDecision::offload(reason).toward(target);
        }

        let Some(index) = selected else {
            return OffloadDecision::local(DecisionReason::NoCandidate);
        };
        let local = self.local_utility(task, device);
        let remote = self.remote_utility(task, device, &candidates[index]);
        trace!(task_id = %task.id, local, remote, "utility comparison");

        if remote < local {
            OffloadDecision::offload(DecisionReason::RemoteCheaper).toward(target)
        } else {
            OffloadDecision::local(DecisionReason::LocalCheaper)
        }
    }
}

/// Closed set of offloading strategies
#[derive(Debug, Clone, PartialEq)]
pub enum OffloadingStrategy {
    /// Guard chain plus weighted utility comparison
    EnergyAware(EnergyAwarePolicy),
    /// Never offload
    AlwaysLocal,
    /// Offload every task
    AlwaysOffload,
}

impl Default for OffloadingStrategy {
    fn default() -> Self {
        OffloadingStrategy::EnergyAware(EnergyAwarePolicy::default())
    }
}

impl OffloadingStrategy {
    /// Creates the configured strategy
    pub fn from_config(config: &OffloadingPolicyConfig) -> Self {
        match config.strategy {
            StrategyKind::EnergyAware => {
                OffloadingStrategy::EnergyAware(EnergyAwarePolicy::from_config(config))
            }
            StrategyKind::AlwaysLocal => OffloadingStrategy::AlwaysLocal,
            StrategyKind::AlwaysOffload => OffloadingStrategy::AlwaysOffload,
        }
    }

    /// Strategy name
    pub fn kind(&self) -> StrategyKind {
        match self {
            OffloadingStrategy::EnergyAware(_) => StrategyKind::EnergyAware,
            OffloadingStrategy::AlwaysLocal => StrategyKind::AlwaysLocal,
            OffloadingStrategy::AlwaysOffload => StrategyKind::AlwaysOffload,
        }
    }

    /// Full decision with the rule that produced it
    pub fn decide(&self, task: &Task, device: &IoTDevice, candidates: &[EdgeNode]) -> OffloadDecision {
        match self {
            OffloadingStrategy::EnergyAware(policy) => policy.decide(task, device, candidates),
            OffloadingStrategy::AlwaysLocal => OffloadDecision::local(DecisionReason::Strategy),
            OffloadingStrategy::AlwaysOffload => OffloadDecision::offload(DecisionReason::Strategy)
                .toward(select_edge_node(task, device, candidates)),
        }
    }

    /// Returns true if `task` should leave the device
    pub fn should_offload(&self, task: &Task, device: &IoTDevice, candidates: &[EdgeNode]) -> bool {
        self.decide(task, device, candidates).offload
    }

    /// Picks the edge node that should receive `task`
    pub fn select_edge_node(
        &self,
        task: &Task,
        device: &IoTDevice,
        candidates: &[EdgeNode],
    ) -> Option<NodeId> {
        select_edge_node(task, device, candidates)
    }
}

/// Ranking score of `node` for `task`; lower is better
pub fn edge_node_score(task: &Task, device: &IoTDevice, node: &EdgeNode) -> f64 {
    let distance = device.position().distance_to(&node.position());
    let mut score = distance * device.network().technology.distance_weight()
        + node.load_score() * LOAD_SCORE_SCALE;
    if !has_eligible_slice(node.slices(), task.task_type) {
        score += INELIGIBLE_NODE_PENALTY;
    }
    score
}

/// Node with the minimum score, first one on ties. `None` when there are no candidates.
pub fn select_edge_node(task: &Task, device: &IoTDevice, candidates: &[EdgeNode]) -> Option<NodeId> {
    select_edge_index(task, device, candidates).map(|index| candidates[index].id())
}

pub(crate) fn select_edge_index(
    task: &Task,
    device: &IoTDevice,
    candidates: &[EdgeNode],
) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, node)| (index, edge_node_score(task, device, node)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}
