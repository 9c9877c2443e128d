//! Test fixtures and scenario helpers
//!
//! Provides pre-configured scenarios and a builder for targeted ones.

use std::collections::BTreeMap;

use edgeslice_common::{
    CloudConfig, DeviceFleetConfig, DeviceTemplate, EdgeFleetConfig, EdgeNodeTemplate,
    NetworkConfig, NetworkTechnologyConfig, OffloadingPolicyConfig, SimulationConfig,
    SimulationSection, SliceConfig, SlicingConfig, TaskType, WirelessTechnology,
};

/// Small but complete scenario in YAML
pub const BASELINE_SCENARIO_YAML: &str = r#"
simulation:
  duration: 60.0
  time_step: 0.5
  seed: 42
  wall_clock_budget_s: 30

iot_devices:
  count: 6
  types:
    - name: sensor
      mips: 500
      ram: 128
      battery_capacity: 100.0
      battery_consumption_rate: 0.05
      wireless_technology: BLE
      task_generation_rate: 0.5
    - name: phone
      mips: 2500
      ram: 4096
      battery_capacity: 400.0
      battery_consumption_rate: 0.5
      wireless_technology: 5G
      task_generation_rate: 1.0
      mobility: true
      mobility_speed: 1.5
    - name: camera
      mips: 4000
      ram: 2048
      battery_capacity: 1000.0
      battery_consumption_rate: 1.0
      wireless_technology: WiFi
      task_generation_rate: 1.0
      supported_task_types: [medium, intensive]

edge_nodes:
  count: 2
  types:
    - name: micro-dc
      mips: 20000
      ram: 32768
      storage: 500000
      bw: 1000
      cost_per_mips: 0.0001

cloud:
  mips: 500000
  ram: 1048576
  storage: 10000000
  bw: 10000
  cost_per_mips: 0.001
  latency_to_edge_ms: 50.0

network:
  technologies:
    WiFi:
      latency_ms: 10.0
      bandwidth: 100.0
    BLE:
      latency_ms: 30.0
      bandwidth: 2.0
      reliability: 0.9
      energy_per_bit: 0.00005
    5G:
      latency_ms: 5.0
      bandwidth: 500.0
      reliability: 0.99

service_slicing:
  slices:
    - name: realtime
      resource_percentage: 0.3
      priority: 1
      task_types: [lightweight]
    - name: bulk
      resource_percentage: 0.7
      priority: 2
      task_types: [medium, intensive]

offloading_policy:
  strategy: energy_aware
"#;

/// Scenario in the JSON layout, with the policy selected through `type`
pub const BASELINE_SCENARIO_JSON: &str = r#"{
  "simulation": { "duration": 10.0, "time_step": 0.5, "seed": 3 },
  "iot_devices": {
    "count": 2,
    "types": [
      {
        "name": "tag",
        "mips": 800,
        "ram": 256,
        "battery_capacity": 200.0,
        "battery_consumption_rate": 0.1,
        "wireless_technology": "LTE",
        "task_generation_rate": 1.0
      }
    ]
  },
  "edge_nodes": {
    "count": 1,
    "types": [
      { "name": "edge", "mips": 10000, "ram": 8192, "storage": 100000, "bw": 500, "cost_per_mips": 0.0001 }
    ]
  },
  "network": {
    "technologies": {
      "LTE": { "latency_ms": 40.0, "bandwidth": 50.0, "reliability": 0.97, "energy_per_bit": 0.0002 }
    }
  },
  "service_slicing": {
    "slices": [
      { "name": "all", "resource_percentage": 1.0, "priority": 1, "task_types": ["lightweight", "medium", "intensive"] }
    ]
  },
  "offloading_policy": { "type": "always_offload", "allow_local_fallback": true }
}"#;

/// Device template with full battery drain 0.1 and one task per second
pub fn device_template(name: &str, mips: u64, technology: WirelessTechnology) -> DeviceTemplate {
    DeviceTemplate {
        name: name.to_string(),
        mips,
        ram: 1024,
        battery_capacity: 1000.0,
        battery_consumption_rate: 0.1,
        wireless_technology: technology,
        task_generation_rate: 1.0,
        mobility: false,
        mobility_speed: 0.0,
        supported_task_types: None,
    }
}

/// Edge node template
pub fn edge_template(name: &str, mips: u64) -> EdgeNodeTemplate {
    EdgeNodeTemplate {
        name: name.to_string(),
        mips,
        ram: 16384,
        storage: 100_000,
        bw: 1000,
        cost_per_mips: 0.0001,
    }
}

/// Cloud descriptor
pub fn cloud_config(mips: u64, max_concurrent_tasks: Option<usize>) -> CloudConfig {
    CloudConfig {
        mips,
        ram: 262_144,
        storage: 1_000_000,
        bw: 10_000,
        cost_per_mips: 0.001,
        latency_to_edge_ms: 50.0,
        max_concurrent_tasks,
    }
}

/// Slice descriptor
pub fn slice(name: &str, quota: f64, priority: u32, task_types: &[TaskType]) -> SliceConfig {
    SliceConfig {
        name: name.to_string(),
        resource_percentage: quota,
        priority,
        task_types: task_types.to_vec(),
    }
}

fn network_config() -> NetworkConfig {
    let params = |latency_ms: f64, bandwidth: f64| NetworkTechnologyConfig {
        latency_ms,
        bandwidth,
        reliability: 0.95,
        energy_per_bit: 0.0001,
    };

    let mut technologies = BTreeMap::new();
    technologies.insert("WiFi".to_string(), params(10.0, 100.0));
    technologies.insert("BLE".to_string(), params(30.0, 2.0));
    technologies.insert("LTE".to_string(), params(40.0, 50.0));
    technologies.insert("5G".to_string(), params(5.0, 500.0));
    NetworkConfig { technologies }
}

/// Builder for targeted scenarios
///
/// Starts with no devices, no edge nodes, no cloud and no slices; all four
/// wireless technologies are configured.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    config: SimulationConfig,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            config: SimulationConfig {
                simulation: SimulationSection {
                    duration: 10.0,
                    time_step: 1.0,
                    start_time: 0.0,
                    seed: 1,
                    wall_clock_budget_s: 30,
                },
                iot_devices: DeviceFleetConfig::default(),
                edge_nodes: EdgeFleetConfig::default(),
                cloud: None,
                network: network_config(),
                service_slicing: SlicingConfig::default(),
                offloading_policy: OffloadingPolicyConfig::default(),
            },
        }
    }

    /// Sets duration and time step, in seconds
    pub fn timing(mut self, duration: f64, time_step: f64) -> Self {
        self.config.simulation.duration = duration;
        self.config.simulation.time_step = time_step;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = seed;
        self
    }

    /// Device fleet of `count` spread over `templates`
    pub fn devices(mut self, count: usize, templates: Vec<DeviceTemplate>) -> Self {
        self.config.iot_devices = DeviceFleetConfig {
            count,
            types: templates,
        };
        self
    }

    /// Edge fleet of `count` spread over `templates`
    pub fn edges(mut self, count: usize, templates: Vec<EdgeNodeTemplate>) -> Self {
        self.config.edge_nodes = EdgeFleetConfig {
            count,
            types: templates,
        };
        self
    }

    pub fn cloud(mut self, cloud: CloudConfig) -> Self {
        self.config.cloud = Some(cloud);
        self
    }

    pub fn slices(mut self, slices: Vec<SliceConfig>) -> Self {
        self.config.service_slicing = SlicingConfig { slices };
        self
    }

    /// Adjusts the offloading policy in place
    pub fn policy(mut self, adjust: impl FnOnce(&mut OffloadingPolicyConfig)) -> Self {
        adjust(&mut self.config.offloading_policy);
        self
    }

    pub fn build(self) -> SimulationConfig {
        self.config
    }
}
