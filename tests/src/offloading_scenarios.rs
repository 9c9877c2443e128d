//! Placement scenarios across the device / edge / cloud chain
//!
//! Each test builds a small topology that forces one branch of the
//! placement chain and checks the resulting events and counters.

use edgeslice_common::{load_simulation_config_from_str, StrategyKind, TaskType, WirelessTechnology};
use edgeslice_orchestrator::{ExecutionSite, RunStatus, Simulation};
use integration_tests::{
    assert_run_invariants, cloud_config, device_template, edge_template, init_test_logging,
    run_to_completion, slice, ScenarioBuilder, TestResult, BASELINE_SCENARIO_YAML,
};

/// Devices slower than the lightweight demand always trip the capability guard
const WEAK_DEVICE_MIPS: u64 = 400;

#[test]
fn test_weak_devices_without_edges_go_to_cloud() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .devices(4, vec![device_template("weak", WEAK_DEVICE_MIPS, WirelessTechnology::WiFi)])
        .cloud(cloud_config(100_000, None))
        .build();
    let sim = run_to_completion(config)?;
    let report = sim.report(false);

    assert!(report.tasks_generated > 0);
    assert_eq!(report.branches.local, 0);
    assert_eq!(report.branches.edge, 0);
    assert_eq!(report.branches.local_fallback, 0);
    assert_eq!(
        report.branches.cloud,
        report.tasks_generated,
        "every task should be admitted by the cloud"
    );
    for task in sim.scheduler().completed_tasks() {
        assert!(matches!(task.site(), Some(ExecutionSite::Cloud(_))));
    }
    assert_run_invariants(&sim);
    Ok(())
}

#[test]
fn test_no_remote_tier_falls_back_to_device() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .devices(3, vec![device_template("weak", WEAK_DEVICE_MIPS, WirelessTechnology::Lte)])
        .build();
    let sim = run_to_completion(config)?;
    let report = sim.report(false);

    assert_eq!(report.branches.local_fallback, report.tasks_generated);
    assert_eq!(report.branches.local, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(report.deferred_total, 0);
    for device in sim.devices() {
        assert_eq!(device.offloaded_count(), 0);
        assert_eq!(device.local_count(), device.tasks_generated());
    }
    // 500-unit tasks on 400 units/s devices saturate device compute
    assert!(sim
        .metrics()
        .snapshots()
        .iter()
        .flat_map(|s| &s.devices)
        .any(|d| d.utilization.compute == 1.0));
    assert_run_invariants(&sim);
    Ok(())
}

#[test]
fn test_saturated_edge_rejects_and_falls_back_in_same_tick() -> TestResult {
    init_test_logging();

    // 5000 units/s with one full slice admits nine lightweight tasks at once
    let config = ScenarioBuilder::new()
        .timing(3.0, 1.0)
        .devices(20, vec![device_template("weak", WEAK_DEVICE_MIPS, WirelessTechnology::WiFi)])
        .edges(1, vec![edge_template("small", 5000)])
        .slices(vec![slice("all", 1.0, 1, &TaskType::ALL)])
        .build();
    let mut sim = Simulation::from_config(config)?.with_snapshot_history(true);
    assert_eq!(sim.run(), RunStatus::Completed);

    let first = &sim.metrics().snapshots()[0];
    assert_eq!(first.generated.len(), 20);
    assert_eq!(first.events.admitted_edge, 9);
    assert_eq!(first.events.rejected, 11);
    assert_eq!(first.events.local_fallback, 11);
    assert_eq!(first.events.deferred, 0);
    assert_eq!(first.pending, 0, "rejected tasks must not stay pending");

    for snapshot in sim.metrics().snapshots() {
        assert_eq!(snapshot.pending, 0);
    }
    assert_run_invariants(&sim);
    Ok(())
}

#[test]
fn test_full_cloud_without_fallback_defers() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .devices(3, vec![device_template("weak", WEAK_DEVICE_MIPS, WirelessTechnology::WiFi)])
        .cloud(cloud_config(1000, Some(1)))
        .policy(|policy| policy.allow_local_fallback = false)
        .build();
    let mut sim = Simulation::from_config(config)?.with_snapshot_history(true);
    sim.run();
    let report = sim.report(false);

    assert!(report.deferred_total >= 2, "two of three first-tick tasks must wait");
    assert!(report.branches.cloud >= 1);
    assert_eq!(report.branches.local, 0);
    assert_eq!(report.branches.local_fallback, 0);
    assert!(report.pending > 0);

    let first = &sim.metrics().snapshots()[0];
    assert_eq!(first.events.admitted_cloud, 1);
    assert_eq!(first.events.deferred, 2);
    assert_eq!(first.pending, 2);

    for device in sim.devices() {
        assert_eq!(device.local_count(), 0);
    }
    assert_run_invariants(&sim);
    Ok(())
}

#[test]
fn test_low_battery_offloads_to_edge() -> TestResult {
    init_test_logging();

    let mut template = device_template("phone", 4000, WirelessTechnology::FiveG);
    template.battery_consumption_rate = 0.0;
    let config = ScenarioBuilder::new()
        .devices(3, vec![template])
        .edges(1, vec![edge_template("large", 100_000)])
        .slices(vec![slice("all", 1.0, 1, &TaskType::ALL)])
        .build();

    let mut sim = Simulation::from_config(config)?;
    for device in sim.devices_mut() {
        device.set_battery_level(100.0);
    }
    sim.run();
    let report = sim.report(false);

    assert!(report.tasks_generated > 0);
    assert_eq!(report.branches.local, 0);
    assert_eq!(report.branches.local_fallback, 0);
    assert_eq!(report.branches.edge, report.tasks_generated);
    for device in sim.devices() {
        assert!(device.battery_fraction() < 0.2);
        assert_eq!(device.offloaded_count(), device.tasks_generated());
    }
    Ok(())
}

#[test]
fn test_always_local_strategy_never_offloads() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .devices(4, vec![device_template("weak", WEAK_DEVICE_MIPS, WirelessTechnology::WiFi)])
        .edges(2, vec![edge_template("large", 100_000)])
        .slices(vec![slice("all", 1.0, 1, &TaskType::ALL)])
        .cloud(cloud_config(100_000, None))
        .policy(|policy| policy.strategy = StrategyKind::AlwaysLocal)
        .build();
    let sim = run_to_completion(config)?;
    let report = sim.report(false);

    assert_eq!(report.strategy, "always_local");
    assert_eq!(report.branches.local, report.tasks_generated);
    assert_eq!(report.branches.edge + report.branches.cloud, 0);
    for node in sim.edge_nodes() {
        assert_eq!(node.total_processed(), 0);
    }
    Ok(())
}

#[test]
fn test_baseline_scenario_holds_invariants() -> TestResult {
    init_test_logging();

    let config = load_simulation_config_from_str(BASELINE_SCENARIO_YAML)?;
    let sim = run_to_completion(config)?;
    let report = sim.report(false);

    assert_eq!(report.device_count, 6);
    assert_eq!(report.edge_node_count, 2);
    assert!(report.has_cloud);
    assert!(report.completed > 0);
    assert_eq!(report.dropped_total, 0);
    assert_eq!(report.statistics.total_completed, report.completed);
    assert_run_invariants(&sim);
    Ok(())
}
