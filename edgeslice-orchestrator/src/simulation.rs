//! Fixed-timestep simulation loop and wall-clock watchdog
//!
//! Each tick runs, in order: mobility, task generation and submission,
//! scheduling, status update, metrics sampling, then the clock advances by
//! exactly one timestep. All randomness comes from one seeded generator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{debug, info, trace, warn};

use edgeslice_common::config::{validate_simulation_config, SimulationConfig};
use edgeslice_common::{
    Position, SimulationClock, SimulationStepper, SimulationTick, AREA_SIZE,
};

use crate::device::{DeviceId, IoTDevice, NetworkProfile};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::PlacementBranch;
use crate::metrics::{
    BranchTotals, DeviceSnapshot, EventCounts, MetricsRecorder, NodeSnapshot, RunStatus,
    SimulationReport, TickSnapshot,
};
use crate::node::{CloudNode, EdgeNode, NodeId};
use crate::scheduler::TaskScheduler;
use crate::slice::SlicingPolicy;

/// Id reserved for the cloud; edge nodes are numbered from 1
const CLOUD_NODE_ID: u32 = 0;

/// Entities built per template: none for a zero count, otherwise at least one
fn per_template(count: usize, templates: usize) -> usize {
    if count == 0 || templates == 0 {
        0
    } else {
        (count / templates).max(1)
    }
}

fn random_position(rng: &mut Pcg64) -> Position {
    Position::new(rng.gen_range(0.0..AREA_SIZE), rng.gen_range(0.0..AREA_SIZE))
}

/// A complete simulation run
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    clock: SimulationClock,
    rng: Pcg64,
    devices: Vec<IoTDevice>,
    edges: Vec<EdgeNode>,
    cloud: Option<CloudNode>,
    scheduler: TaskScheduler,
    metrics: MetricsRecorder,
    status: RunStatus,
    stop: Arc<AtomicBool>,
    progress_decile: u64,
}

impl Simulation {
    /// Validates `config` and builds the topology.
    ///
    /// Validation warnings are logged; validation errors are fatal.
    pub fn from_config(config: SimulationConfig) -> OrchestratorResult<Self> {
        let warnings = validate_simulation_config(&config)?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        let mut rng = Pcg64::seed_from_u64(config.simulation.seed);
        let edges = build_edges(&config, &mut rng);
        let cloud = config
            .cloud
            .as_ref()
            .map(|cloud| CloudNode::from_config(NodeId::new(CLOUD_NODE_ID), cloud));
        let devices = build_devices(&config, &mut rng)?;
        if devices.is_empty() {
            return Err(OrchestratorError::InvalidTopology(
                "scenario has no devices".to_string(),
            ));
        }

        info!(
            devices = devices.len(),
            edge_nodes = edges.len(),
            cloud = cloud.is_some(),
            seed = config.simulation.seed,
            "simulation topology built"
        );

        let clock = SimulationClock::new(config.simulation.time_config());
        let scheduler = TaskScheduler::from_config(&config.offloading_policy);

        Ok(Self {
            config,
            clock,
            rng,
            devices,
            edges,
            cloud,
            scheduler,
            metrics: MetricsRecorder::default(),
            status: RunStatus::InProgress,
            stop: Arc::new(AtomicBool::new(false)),
            progress_decile: 0,
        })
    }

    /// Keeps every tick snapshot when true, only the latest otherwise
    pub fn with_snapshot_history(mut self, retain: bool) -> Self {
        self.metrics = MetricsRecorder::new(retain);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn devices(&self) -> &[IoTDevice] {
        &self.devices
    }

    /// Mutable access to devices, e.g. to override battery levels
    pub fn devices_mut(&mut self) -> &mut [IoTDevice] {
        &mut self.devices
    }

    pub fn edge_nodes(&self) -> &[EdgeNode] {
        &self.edges
    }

    pub fn cloud(&self) -> Option<&CloudNode> {
        self.cloud.as_ref()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Flag that stops the loop at the next tick boundary once set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Returns true once the configured end time is reached
    pub fn is_finished(&self) -> bool {
        self.clock.is_complete()
    }

    /// Runs one tick. Returns false without doing anything if the run is complete.
    pub fn step_tick(&mut self) -> bool {
        if self.clock.is_complete() {
            return false;
        }

        let now = self.clock.current_time();
        let dt = self.clock.time_step();

        for device in &mut self.devices {
            device.move_step(&mut self.rng, dt);
        }

        let mut generated = Vec::new();
        for device in &mut self.devices {
            if let Some(task) = device.generate_task(&mut self.rng, now, dt) {
                generated.push(task.id);
                self.scheduler.submit(task);
            }
        }

        self.scheduler
            .schedule_pending_tasks(&mut self.devices, &mut self.edges, self.cloud.as_mut(), now);
        self.scheduler
            .update_task_status(&mut self.devices, &mut self.edges, self.cloud.as_mut(), now);

        let events = self.scheduler.drain_events();
        for event in &events {
            trace!(time = now, "{}", event);
        }

        let snapshot = TickSnapshot {
            tick: self.clock.current_tick().value(),
            time: now,
            generated,
            pending: self.scheduler.pending_count(),
            running: self.scheduler.running_count(),
            completed: self.scheduler.completed_count(),
            events: EventCounts::from_events(&events),
            devices: self.devices.iter().map(DeviceSnapshot::capture).collect(),
            edge_nodes: self.edges.iter().map(NodeSnapshot::capture_edge).collect(),
            cloud: self.cloud.as_ref().map(NodeSnapshot::capture_cloud),
            statistics: self.scheduler.statistics(),
        };
        self.metrics.record(snapshot);

        self.clock.tick();
        self.log_progress();
        true
    }

    fn log_progress(&mut self) {
        let decile = (self.clock.progress() * 10.0).floor() as u64;
        if decile > self.progress_decile {
            self.progress_decile = decile;
            info!(
                progress_pct = decile * 10,
                sim_time = self.clock.current_time(),
                completed = self.scheduler.completed_count(),
                pending = self.scheduler.pending_count(),
                "simulation progress"
            );
        }
    }

    /// Runs until the end time or until the stop flag is raised
    pub fn run(&mut self) -> RunStatus {
        info!(
            total_ticks = self.clock.total_ticks(),
            time_step = self.clock.time_step(),
            "starting simulation"
        );

        while !self.clock.is_complete() {
            if self.stop.load(Ordering::Relaxed) {
                self.status = RunStatus::TimedOut;
                warn!(
                    ticks_completed = self.clock.current_tick().value(),
                    "simulation stopped before end time"
                );
                return self.status;
            }
            self.step_tick();
        }

        self.status = RunStatus::Completed;
        info!(
            elapsed_ms = self.clock.elapsed_real_time().as_millis() as u64,
            completed = self.scheduler.completed_count(),
            "simulation complete"
        );
        self.status
    }

    /// Runs on a blocking worker under a wall-clock `budget`.
    ///
    /// When the budget expires the loop is stopped at the next tick boundary
    /// and the simulation is returned with [`RunStatus::TimedOut`]; everything
    /// recorded up to the last completed tick stays intact.
    pub async fn run_with_watchdog(self, budget: Duration) -> OrchestratorResult<Self> {
        let stop = self.stop_handle();
        let mut sim = self;
        let mut handle = tokio::task::spawn_blocking(move || {
            sim.run();
            sim
        });

        match tokio::time::timeout(budget, &mut handle).await {
            Ok(joined) => joined.map_err(|e| OrchestratorError::WorkerJoin(e.to_string())),
            Err(_) => {
                warn!(budget_s = budget.as_secs_f64(), "wall-clock budget exceeded");
                stop.store(true, Ordering::Relaxed);
                handle
                    .await
                    .map_err(|e| OrchestratorError::WorkerJoin(e.to_string()))
            }
        }
    }

    /// Summary of the run so far
    pub fn report(&self, include_snapshots: bool) -> SimulationReport {
        let branches = BranchTotals {
            local: self.scheduler.branch_count(PlacementBranch::Local),
            edge: self.scheduler.branch_count(PlacementBranch::Edge),
            cloud: self.scheduler.branch_count(PlacementBranch::Cloud),
            local_fallback: self.scheduler.branch_count(PlacementBranch::LocalFallback),
        };
        let ticks_completed = self.clock.current_tick().value();

        SimulationReport {
            status: self.status,
            strategy: self.scheduler.strategy().kind().to_string(),
            seed: self.config.simulation.seed,
            ticks_completed,
            total_ticks: self.clock.total_ticks(),
            simulated_time: ticks_completed as f64 * self.clock.time_step(),
            device_count: self.devices.len(),
            edge_node_count: self.edges.len(),
            has_cloud: self.cloud.is_some(),
            tasks_generated: self.devices.iter().map(|d| d.tasks_generated()).sum(),
            pending: self.scheduler.pending_count(),
            running: self.scheduler.running_count(),
            completed: self.scheduler.completed_count(),
            deferred_total: self.scheduler.deferred_total(),
            dropped_total: self.scheduler.dropped_total(),
            branches,
            statistics: self.scheduler.statistics(),
            devices: self.devices.iter().map(DeviceSnapshot::capture).collect(),
            edge_nodes: self.edges.iter().map(NodeSnapshot::capture_edge).collect(),
            cloud: self.cloud.as_ref().map(NodeSnapshot::capture_cloud),
            snapshots: include_snapshots.then(|| self.metrics.snapshots().to_vec()),
        }
    }
}

impl SimulationStepper for Simulation {
    type Error = OrchestratorError;

    fn step(&mut self, tick: SimulationTick) -> Result<(), Self::Error> {
        let current = self.clock.current_tick();
        if tick != current {
            return Err(OrchestratorError::InvalidTopology(format!(
                "stepper expected {current}, got {tick}"
            )));
        }
        self.step_tick();
        Ok(())
    }
}

fn build_edges(config: &SimulationConfig, rng: &mut Pcg64) -> Vec<EdgeNode> {
    let slicing = SlicingPolicy::new(&config.service_slicing);
    let fleet = &config.edge_nodes;
    let each = per_template(fleet.count, fleet.types.len());

    let mut edges = Vec::with_capacity(each * fleet.types.len());
    let mut next_id = CLOUD_NODE_ID + 1;
    for template in &fleet.types {
        for i in 0..each {
            let position = random_position(rng);
            let node = EdgeNode::from_template(
                NodeId::new(next_id),
                format!("{}-{}", template.name, i),
                template,
                position,
                |capacity| slicing.build_slices(capacity),
            );
            debug!("created {}", node);
            edges.push(node);
            next_id += 1;
        }
    }
    edges
}

fn build_devices(config: &SimulationConfig, rng: &mut Pcg64) -> OrchestratorResult<Vec<IoTDevice>> {
    let fleet = &config.iot_devices;
    let each = per_template(fleet.count, fleet.types.len());

    let mut devices = Vec::with_capacity(each * fleet.types.len());
    let mut next_id = 0;
    for template in &fleet.types {
        let params = config
            .network
            .technology(template.wireless_technology)
            .ok_or_else(|| OrchestratorError::UnknownTechnology {
                template: template.name.clone(),
                technology: template.wireless_technology,
            })?;
        let network = NetworkProfile::new(template.wireless_technology, params);

        for i in 0..each {
            let position = random_position(rng);
            let device = IoTDevice::from_template(
                DeviceId::new(next_id),
                format!("{}-{}", template.name, i),
                template,
                network,
                position,
            );
            debug!("created {}", device);
            devices.push(device);
            next_id += 1;
        }
    }
    Ok(devices)
}
