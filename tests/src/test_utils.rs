//! Test utility functions for integration tests
//!
//! Provides common utilities for test setup, logging, and assertions.

use std::path::PathBuf;

use tracing_subscriber::{fmt, EnvFilter};

use edgeslice_common::SimulationConfig;
use edgeslice_orchestrator::{RunStatus, Simulation};

/// Result type for integration tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize logging for tests
///
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info"
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Writes `contents` to `file_name` inside `dir` and returns the path
pub fn write_scenario_file(dir: &tempfile::TempDir, file_name: &str, contents: &str) -> TestResult<PathBuf> {
    let path = dir.path().join(file_name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Builds and runs a scenario to its end time
pub fn run_to_completion(config: SimulationConfig) -> TestResult<Simulation> {
    let mut sim = Simulation::from_config(config)?;
    let status = sim.run();
    if status != RunStatus::Completed {
        return Err(format!("run ended with status {status}").into());
    }
    Ok(sim)
}

/// Checks the invariants every run must hold
///
/// - completed tasks: completion >= start >= creation
/// - every utilization ratio in [0, 1], devices included
/// - slice assigned demand within the admission limit
/// - every generated task is pending, running or completed
pub fn assert_run_invariants(sim: &Simulation) {
    for task in sim.scheduler().completed_tasks() {
        let start = task.start_time().expect("completed task has a start time");
        let done = task.completion_time().expect("completed task has a completion time");
        assert!(done >= start, "task {} completed before it started", task.id);
        assert!(start >= task.creation_time, "task {} started before creation", task.id);
    }

    for snapshot in sim.metrics().snapshots() {
        for node in snapshot.edge_nodes.iter().chain(snapshot.cloud.iter()) {
            let u = node.utilization;
            for ratio in [u.compute, u.memory, u.bandwidth] {
                assert!((0.0..=1.0).contains(&ratio), "utilization {ratio} out of range");
            }
        }
        for device in &snapshot.devices {
            assert!((0.0..=1.0).contains(&device.battery_fraction));
            let u = device.utilization;
            for ratio in [u.compute, u.memory, u.bandwidth] {
                assert!(
                    (0.0..=1.0).contains(&ratio),
                    "device {} utilization {ratio} out of range",
                    device.id
                );
            }
        }
    }

    for node in sim.edge_nodes() {
        for slice in node.slices() {
            assert!(slice.assigned_demand() as f64 <= slice.admission_limit());
        }
    }

    let report = sim.report(false);
    assert_eq!(
        report.tasks_generated as usize,
        report.pending + report.running + report.completed + report.dropped_total as usize
    );
}
