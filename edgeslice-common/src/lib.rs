//! Common types and utilities for edgeslice
//!
//! This crate provides the shared vocabulary (task types, wireless
//! technologies), configuration structures, logging setup and simulation
//! tick primitives used by the orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod logging;
pub mod sim_tick;
pub mod types;

pub use config::{
    load_and_validate_simulation_config, load_simulation_config, load_simulation_config_from_str,
    validate_simulation_config,
    CloudConfig, ConfigError, ConfigValidationError, ConfigWarning, DeviceFleetConfig,
    DeviceTemplate, EdgeFleetConfig, EdgeNodeTemplate, NetworkConfig, NetworkTechnologyConfig,
    OffloadingPolicyConfig, SimulationConfig, SimulationSection, SliceConfig, SlicingConfig,
    StrategyKind,
};
pub use error::{Error, Result};
pub use logging::{init_logging, init_logging_with_filter, LogLevel};
pub use sim_tick::{SimulationClock, SimulationStepper, SimulationTick, SimulationTimeConfig};
pub use types::{Position, TaskType, WirelessTechnology, AREA_SIZE};
