//! Simulation configuration
//!
//! Structures describing a complete simulation scenario: run timing, device
//! and edge node templates, the cloud descriptor, the wireless technology map,
//! slice descriptors and the offloading policy. Configuration is immutable once
//! the simulation is built from it.
//!
//! Files are YAML by default; a path ending in `.json` is parsed as JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use edgeslice_common::config::{load_simulation_config, validate_simulation_config};
//!
//! let config = load_simulation_config("config/baseline.yaml")?;
//! let warnings = validate_simulation_config(&config)?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim_tick::SimulationTimeConfig;
use crate::types::{TaskType, WirelessTechnology};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML or JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

/// Fatal configuration problems, detected before the first tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Time step, duration or start time out of range
    #[error("Invalid simulation timing: {0}")]
    InvalidTiming(String),

    /// Wall-clock budget must be positive
    #[error("Invalid wall-clock budget: {0}")]
    InvalidBudget(String),

    /// A fleet has a non-zero count but no templates to instantiate
    #[error("No {0} templates configured for a non-zero {0} count")]
    MissingTemplates(&'static str),

    /// Device template references a technology missing from the network map
    #[error("Device template '{template}' uses technology {technology} which is not in network.technologies")]
    UnknownTechnology {
        template: String,
        technology: WirelessTechnology,
    },

    /// Invalid network technology parameters
    #[error("Invalid network technology '{0}': {1}")]
    InvalidNetwork(String, String),

    /// Invalid device, edge or cloud capacity
    #[error("Invalid resource configuration: {0}")]
    InvalidResource(String),

    /// Invalid slice descriptor
    #[error("Invalid slice '{0}': {1}")]
    InvalidSlice(String, String),

    /// Invalid offloading policy parameters
    #[error("Invalid offloading policy: {0}")]
    InvalidPolicy(String),
}

/// Non-fatal configuration findings.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// Slice quota fractions add up to more than the node's capacity
    QuotaOversubscribed { total: f64 },
    /// Per-tick generation probability exceeds 1 and will be clamped
    GenerationProbabilityClamped { template: String, probability: f64 },
    /// A slice accepts no task type and only serves spill-over admissions
    SliceWithoutTaskTypes { slice: String },
    /// Two slice descriptors share a name
    DuplicateSliceName { slice: String },
    /// Offloading weights do not add up to 1
    WeightsNotNormalized { total: f64 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::QuotaOversubscribed { total } => write!(
                f,
                "slice quotas sum to {total:.2} (> 1.0); edge capacity is oversubscribed"
            ),
            ConfigWarning::GenerationProbabilityClamped {
                template,
                probability,
            } => write!(
                f,
                "device template '{template}' has per-tick generation probability {probability:.2}, clamped to 1.0"
            ),
            ConfigWarning::SliceWithoutTaskTypes { slice } => {
                write!(f, "slice '{slice}' lists no task types")
            }
            ConfigWarning::DuplicateSliceName { slice } => {
                write!(f, "slice name '{slice}' is used more than once")
            }
            ConfigWarning::WeightsNotNormalized { total } => {
                write!(f, "offloading weights sum to {total:.2} instead of 1.0")
            }
        }
    }
}

/// Complete simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Run timing and seeding
    pub simulation: SimulationSection,
    /// Device fleet
    pub iot_devices: DeviceFleetConfig,
    /// Edge node fleet
    #[serde(default)]
    pub edge_nodes: EdgeFleetConfig,
    /// Cloud descriptor; absent means no cloud tier
    #[serde(default)]
    pub cloud: Option<CloudConfig>,
    /// Wireless technology parameters
    pub network: NetworkConfig,
    /// Slice descriptors applied to every edge node
    #[serde(default)]
    pub service_slicing: SlicingConfig,
    /// Offloading policy
    #[serde(default)]
    pub offloading_policy: OffloadingPolicyConfig,
}

/// Run timing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Simulated duration in seconds
    pub duration: f64,
    /// Fixed timestep in seconds
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Simulated start time in seconds
    #[serde(default)]
    pub start_time: f64,
    /// Seed of the single random source
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Real-time budget for the whole run, in seconds
    #[serde(default = "default_wall_clock_budget")]
    pub wall_clock_budget_s: u64,
}

fn default_time_step() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

fn default_wall_clock_budget() -> u64 {
    60
}

impl SimulationSection {
    /// Returns the tick timing derived from this section
    pub fn time_config(&self) -> SimulationTimeConfig {
        SimulationTimeConfig::new(
            self.start_time,
            self.start_time + self.duration,
            self.time_step,
        )
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            duration: 3600.0,
            time_step: default_time_step(),
            start_time: 0.0,
            seed: default_seed(),
            wall_clock_budget_s: default_wall_clock_budget(),
        }
    }
}

/// Device fleet: total count spread evenly across templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceFleetConfig {
    pub count: usize,
    #[serde(default)]
    pub types: Vec<DeviceTemplate>,
}

/// Device template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTemplate {
    pub name: String,
    /// Compute rate in compute-units per second
    pub mips: u64,
    /// Memory in MB
    pub ram: u64,
    pub battery_capacity: f64,
    /// Battery drain per second of local processing
    pub battery_consumption_rate: f64,
    pub wireless_technology: WirelessTechnology,
    /// Expected tasks per second
    pub task_generation_rate: f64,
    #[serde(default)]
    pub mobility: bool,
    /// Distance units per second when mobile
    #[serde(default)]
    pub mobility_speed: f64,
    /// Task types this device emits; absent means all
    #[serde(default)]
    pub supported_task_types: Option<Vec<TaskType>>,
}

impl DeviceTemplate {
    /// Returns the task types this template may generate
    pub fn task_types(&self) -> Vec<TaskType> {
        match &self.supported_task_types {
            Some(types) if !types.is_empty() => types.clone(),
            _ => TaskType::ALL.to_vec(),
        }
    }
}

/// Edge fleet: total count spread evenly across templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeFleetConfig {
    pub count: usize,
    #[serde(default)]
    pub types: Vec<EdgeNodeTemplate>,
}

/// Edge node template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNodeTemplate {
    pub name: String,
    pub mips: u64,
    /// Memory in MB
    pub ram: u64,
    /// Storage in MB
    pub storage: u64,
    /// Bandwidth in Mbps
    pub bw: u64,
    pub cost_per_mips: f64,
}

/// Cloud datacenter descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub mips: u64,
    pub ram: u64,
    pub storage: u64,
    pub bw: u64,
    pub cost_per_mips: f64,
    pub latency_to_edge_ms: f64,
    /// Concurrent task limit; absent means unlimited
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,
}

/// Wireless technology map, keyed by technology name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub technologies: BTreeMap<String, NetworkTechnologyConfig>,
}

impl NetworkConfig {
    /// Looks up the parameters of a technology, accepting any of its spellings as key
    pub fn technology(&self, technology: WirelessTechnology) -> Option<&NetworkTechnologyConfig> {
        self.technologies
            .iter()
            .find(|(name, _)| name.parse::<WirelessTechnology>().ok() == Some(technology))
            .map(|(_, params)| params)
    }
}

/// Link parameters of a wireless technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkTechnologyConfig {
    pub latency_ms: f64,
    /// Bandwidth in Mbps
    pub bandwidth: f64,
    #[serde(default = "default_reliability")]
    pub reliability: f64,
    #[serde(default = "default_energy_per_bit")]
    pub energy_per_bit: f64,
}

fn default_reliability() -> f64 {
    0.95
}

fn default_energy_per_bit() -> f64 {
    0.0001
}

/// Slice descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlicingConfig {
    #[serde(default)]
    pub slices: Vec<SliceConfig>,
}

impl SlicingConfig {
    /// Sum of all quota fractions
    pub fn total_quota(&self) -> f64 {
        self.slices.iter().map(|s| s.resource_percentage).sum()
    }
}

/// Slice descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceConfig {
    pub name: String,
    /// Fraction of node compute/memory/bandwidth reserved, in (0, 1]
    pub resource_percentage: f64,
    /// Lower value is preferred
    pub priority: u32,
    #[serde(default)]
    pub task_types: Vec<TaskType>,
}

/// Offloading strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Guards plus utility comparison
    #[default]
    EnergyAware,
    /// Never offload
    AlwaysLocal,
    /// Offload everything
    AlwaysOffload,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::EnergyAware => write!(f, "energy_aware"),
            StrategyKind::AlwaysLocal => write!(f, "always_local"),
            StrategyKind::AlwaysOffload => write!(f, "always_offload"),
        }
    }
}

/// Offloading policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffloadingPolicyConfig {
    #[serde(default, alias = "type")]
    pub strategy: StrategyKind,
    /// Battery fraction below which tasks are always offloaded
    #[serde(default = "default_battery_threshold")]
    pub battery_threshold: f64,
    /// Input size in bytes above which a good link triggers offloading
    #[serde(default = "default_task_size_threshold")]
    pub task_size_threshold: u64,
    #[serde(default = "default_network_quality_threshold")]
    pub network_quality_threshold: f64,
    #[serde(default = "default_weight_energy")]
    pub weight_energy: f64,
    #[serde(default = "default_weight_latency")]
    pub weight_latency: f64,
    #[serde(default = "default_weight_cost")]
    pub weight_cost: f64,
    /// Whether an offloaded task nobody accepts may run on its device
    #[serde(default = "default_true")]
    pub allow_local_fallback: bool,
}

fn default_battery_threshold() -> f64 {
    0.2
}

fn default_task_size_threshold() -> u64 {
    5000
}

fn default_network_quality_threshold() -> f64 {
    0.5
}

fn default_weight_energy() -> f64 {
    0.33
}

fn default_weight_latency() -> f64 {
    0.33
}

fn default_weight_cost() -> f64 {
    0.34
}

fn default_true() -> bool {
    true
}

impl Default for OffloadingPolicyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            battery_threshold: default_battery_threshold(),
            task_size_threshold: default_task_size_threshold(),
            network_quality_threshold: default_network_quality_threshold(),
            weight_energy: default_weight_energy(),
            weight_latency: default_weight_latency(),
            weight_cost: default_weight_cost(),
            allow_local_fallback: true,
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads a simulation configuration from a YAML or JSON file.
///
/// Only parsing is performed; call [`validate_simulation_config`] before
/// building a simulation from the result.
pub fn load_simulation_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;

    if is_json(path) {
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    } else {
        load_simulation_config_from_str(&contents)
    }
}

/// Loads a simulation configuration from a YAML string.
pub fn load_simulation_config_from_str(yaml: &str) -> Result<SimulationConfig, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Loads and validates a configuration in one step.
///
/// Returns the configuration together with any non-fatal warnings.
pub fn load_and_validate_simulation_config<P: AsRef<Path>>(
    path: P,
) -> Result<(SimulationConfig, Vec<ConfigWarning>), ConfigError> {
    let config = load_simulation_config(path)?;
    let warnings = validate_simulation_config(&config)?;
    Ok((config, warnings))
}

/// Validates a simulation configuration.
///
/// # Validation Rules
///
/// - time step, duration and wall-clock budget must be positive, start time non-negative
/// - a fleet with a non-zero count needs at least one template
/// - every device technology must appear in the network map
/// - compute, memory and bandwidth capacities must be positive
/// - slice quota fractions must lie in (0, 1]
/// - thresholds must lie in [0, 1] and weights must be non-negative
///
/// Oversubscribed quotas, clamped generation probabilities and similar
/// findings are returned as warnings.
pub fn validate_simulation_config(
    config: &SimulationConfig,
) -> Result<Vec<ConfigWarning>, ConfigValidationError> {
    let mut warnings = Vec::new();

    validate_timing(&config.simulation)?;
    validate_network(&config.network)?;
    validate_devices(config, &mut warnings)?;
    validate_edges(&config.edge_nodes)?;
    if let Some(cloud) = &config.cloud {
        validate_cloud(cloud)?;
    }
    validate_slices(&config.service_slicing, &mut warnings)?;
    validate_policy(&config.offloading_policy, &mut warnings)?;

    Ok(warnings)
}

fn validate_timing(sim: &SimulationSection) -> Result<(), ConfigValidationError> {
    if !(sim.time_step > 0.0) {
        return Err(ConfigValidationError::InvalidTiming(format!(
            "time_step {} must be positive",
            sim.time_step
        )));
    }
    if !(sim.duration > 0.0) {
        return Err(ConfigValidationError::InvalidTiming(format!(
            "duration {} must be positive",
            sim.duration
        )));
    }
    if !(sim.start_time >= 0.0) {
        return Err(ConfigValidationError::InvalidTiming(format!(
            "start_time {} must not be negative",
            sim.start_time
        )));
    }
    if sim.wall_clock_budget_s == 0 {
        return Err(ConfigValidationError::InvalidBudget(
            "wall_clock_budget_s must be at least 1 second".to_string(),
        ));
    }
    Ok(())
}

fn validate_network(network: &NetworkConfig) -> Result<(), ConfigValidationError> {
    for (name, params) in &network.technologies {
        if name.parse::<WirelessTechnology>().is_err() {
            return Err(ConfigValidationError::InvalidNetwork(
                name.clone(),
                "unknown technology name".to_string(),
            ));
        }
        if !(params.bandwidth > 0.0) {
            return Err(ConfigValidationError::InvalidNetwork(
                name.clone(),
                format!("bandwidth {} must be positive", params.bandwidth),
            ));
        }
        if params.latency_ms < 0.0 || params.energy_per_bit < 0.0 {
            return Err(ConfigValidationError::InvalidNetwork(
                name.clone(),
                "latency and energy per bit must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&params.reliability) {
            return Err(ConfigValidationError::InvalidNetwork(
                name.clone(),
                format!("reliability {} must be within [0, 1]", params.reliability),
            ));
        }
    }
    Ok(())
}

fn validate_devices(
    config: &SimulationConfig,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigValidationError> {
    let fleet = &config.iot_devices;
    if fleet.count > 0 && fleet.types.is_empty() {
        return Err(ConfigValidationError::MissingTemplates("device"));
    }

    for template in &fleet.types {
        if template.mips == 0 || template.ram == 0 {
            return Err(ConfigValidationError::InvalidResource(format!(
                "device template '{}' needs positive mips and ram",
                template.name
            )));
        }
        if !(template.battery_capacity > 0.0) || template.battery_consumption_rate < 0.0 {
            return Err(ConfigValidationError::InvalidResource(format!(
                "device template '{}' needs a positive battery capacity and a non-negative drain rate",
                template.name
            )));
        }
        if template.task_generation_rate < 0.0 || template.mobility_speed < 0.0 {
            return Err(ConfigValidationError::InvalidResource(format!(
                "device template '{}' has a negative generation rate or speed",
                template.name
            )));
        }
        if config
            .network
            .technology(template.wireless_technology)
            .is_none()
        {
            return Err(ConfigValidationError::UnknownTechnology {
                template: template.name.clone(),
                technology: template.wireless_technology,
            });
        }

        let probability = template.task_generation_rate * config.simulation.time_step;
        if probability > 1.0 {
            warnings.push(ConfigWarning::GenerationProbabilityClamped {
                template: template.name.clone(),
                probability,
            });
        }
    }
    Ok(())
}

fn validate_edges(fleet: &EdgeFleetConfig) -> Result<(), ConfigValidationError> {
    if fleet.count > 0 && fleet.types.is_empty() {
        return Err(ConfigValidationError::MissingTemplates("edge node"));
    }
    for template in &fleet.types {
        if template.mips == 0 || template.ram == 0 || template.bw == 0 {
            return Err(ConfigValidationError::InvalidResource(format!(
                "edge template '{}' needs positive mips, ram and bw",
                template.name
            )));
        }
        if template.cost_per_mips < 0.0 {
            return Err(ConfigValidationError::InvalidResource(format!(
                "edge template '{}' has a negative cost_per_mips",
                template.name
            )));
        }
    }
    Ok(())
}

fn validate_cloud(cloud: &CloudConfig) -> Result<(), ConfigValidationError> {
    if cloud.mips == 0 || cloud.ram == 0 || cloud.bw == 0 {
        return Err(ConfigValidationError::InvalidResource(
            "cloud needs positive mips, ram and bw".to_string(),
        ));
    }
    if cloud.cost_per_mips < 0.0 || cloud.latency_to_edge_ms < 0.0 {
        return Err(ConfigValidationError::InvalidResource(
            "cloud cost and latency must not be negative".to_string(),
        ));
    }
    if cloud.max_concurrent_tasks == Some(0) {
        return Err(ConfigValidationError::InvalidResource(
            "cloud max_concurrent_tasks must be at least 1 when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_slices(
    slicing: &SlicingConfig,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigValidationError> {
    let mut seen: Vec<&str> = Vec::new();
    for slice in &slicing.slices {
        if !(slice.resource_percentage > 0.0 && slice.resource_percentage <= 1.0) {
            return Err(ConfigValidationError::InvalidSlice(
                slice.name.clone(),
                format!(
                    "resource_percentage {} must be within (0, 1]",
                    slice.resource_percentage
                ),
            ));
        }
        if slice.task_types.is_empty() {
            warnings.push(ConfigWarning::SliceWithoutTaskTypes {
                slice: slice.name.clone(),
            });
        }
        if seen.contains(&slice.name.as_str()) {
            warnings.push(ConfigWarning::DuplicateSliceName {
                slice: slice.name.clone(),
            });
        }
        seen.push(&slice.name);
    }

    let total = slicing.total_quota();
    if total > 1.0 + f64::EPSILON {
        warnings.push(ConfigWarning::QuotaOversubscribed { total });
    }
    Ok(())
}

fn validate_policy(
    policy: &OffloadingPolicyConfig,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigValidationError> {
    if !(0.0..=1.0).contains(&policy.battery_threshold) {
        return Err(ConfigValidationError::InvalidPolicy(format!(
            "battery_threshold {} must be within [0, 1]",
            policy.battery_threshold
        )));
    }
    if policy.network_quality_threshold < 0.0 {
        return Err(ConfigValidationError::InvalidPolicy(format!(
            "network_quality_threshold {} must not be negative",
            policy.network_quality_threshold
        )));
    }
    let weights = [
        ("weight_energy", policy.weight_energy),
        ("weight_latency", policy.weight_latency),
        ("weight_cost", policy.weight_cost),
    ];
    for (name, value) in weights {
        if !(value >= 0.0) {
            return Err(ConfigValidationError::InvalidPolicy(format!(
                "{name} {value} must not be negative"
            )));
        }
    }

    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if (total - 1.0).abs() > 1e-6 {
        warnings.push(ConfigWarning::WeightsNotNormalized { total });
    }
    Ok(())
}
