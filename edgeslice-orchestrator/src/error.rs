//! Error types for the orchestrator

use edgeslice_common::config::ConfigValidationError;
use edgeslice_common::WirelessTechnology;
use thiserror::Error;

use crate::device::DeviceId;
use crate::task::TaskId;

/// Orchestrator error types
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Configuration rejected before the first tick
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// Device template references a technology without link parameters
    #[error("Device template '{template}' uses {technology}, which has no network parameters")]
    UnknownTechnology {
        /// Template name
        template: String,
        /// Offending technology
        technology: WirelessTechnology,
    },

    /// Task refers to a device that is not part of the topology
    #[error("Device {device} not found for task {task_id}")]
    DeviceNotFound {
        /// Task ID
        task_id: TaskId,
        /// Missing device
        device: DeviceId,
    },

    /// Topology could not be built
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// The worker running the simulation panicked or was cancelled
    #[error("Simulation worker failed: {0}")]
    WorkerJoin(String),

    /// Export or I/O failure
    #[error(transparent)]
    Common(#[from] edgeslice_common::Error),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
