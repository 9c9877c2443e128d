//! Task offloading orchestrator for a device / edge / cloud hierarchy
//!
//! For every task a device generates, the orchestrator decides where it runs
//! and tracks it until completion, while edge node capacity is partitioned
//! into service slices with admission control.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             Simulation                               │
//! │   clock ─> mobility ─> generation ─> schedule ─> status ─> metrics   │
//! │                                        │                             │
//! │                               ┌────────┴────────┐                    │
//! │                               │  TaskScheduler  │                    │
//! │                               │  + strategy     │                    │
//! │                               └────────┬────────┘                    │
//! │            ┌───────────────────────────┼──────────────────────┐      │
//! │   ┌────────┴────────┐       ┌──────────┴──────────┐   ┌───────┴────┐ │
//! │   │   IoTDevice     │       │      EdgeNode       │   │  CloudNode │ │
//! │   │ battery, link   │       │ slice 0 │ slice 1 … │   │  optional  │ │
//! │   └─────────────────┘       └─────────────────────┘   └────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Placement
//!
//! | Step | Rule |
//! |------|------|
//! | Decide | guards (battery, capability, size over a good link), then utility |
//! | Edge   | lowest `distance × technology weight + load × 100` node, slice admission |
//! | Cloud  | if configured and below its concurrency limit |
//! | Local  | fallback when allowed, otherwise the task is deferred |
//!
//! # Example Usage
//!
//! ```ignore
//! use edgeslice_common::load_simulation_config;
//! use edgeslice_orchestrator::Simulation;
//!
//! let config = load_simulation_config("config/baseline.yaml")?;
//! let mut sim = Simulation::from_config(config)?;
//! sim.run();
//! println!("{}", sim.report(false));
//! ```

pub mod device;
pub mod error;
pub mod events;
pub mod metrics;
pub mod node;
pub mod policy;
pub mod resource;
pub mod scheduler;
pub mod simulation;
pub mod slice;
pub mod stats;
pub mod task;
pub mod tier;

// Re-export main types
pub use device::{DeviceId, IoTDevice, NetworkProfile};
pub use error::{OrchestratorError, OrchestratorResult};
pub use events::{PlacementBranch, RejectedBy, SchedulerEvent};
pub use metrics::{
    DeviceSnapshot, EventCounts, MetricsRecorder, NodeSnapshot, RunStatus, SimulationReport,
    TickSnapshot,
};
pub use node::{Admission, CloudNode, EdgeNode, NodeId};
pub use policy::{DecisionReason, EnergyAwarePolicy, OffloadDecision, OffloadingStrategy};
pub use resource::{ResourceCapacity, ResourceUtilization};
pub use scheduler::TaskScheduler;
pub use simulation::Simulation;
pub use slice::{ServiceSlice, SliceIndex, SlicingPolicy};
pub use stats::TaskStatistics;
pub use task::{Task, TaskId, TaskStatus};
pub use tier::{ComputeTier, ExecutionSite};
