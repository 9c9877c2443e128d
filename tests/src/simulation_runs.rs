//! Whole-run tests: configuration files, determinism, reports and the watchdog

use std::time::Duration;

use edgeslice_common::{
    load_and_validate_simulation_config, load_simulation_config, load_simulation_config_from_str,
    ConfigWarning, StrategyKind, WirelessTechnology,
};
use edgeslice_orchestrator::{RunStatus, Simulation, SimulationReport};
use integration_tests::{
    assert_run_invariants, device_template, edge_template, init_test_logging, run_to_completion,
    write_scenario_file, ScenarioBuilder, TestResult, BASELINE_SCENARIO_JSON,
    BASELINE_SCENARIO_YAML,
};

fn baseline_report() -> TestResult<String> {
    let config = load_simulation_config_from_str(BASELINE_SCENARIO_YAML)?;
    let mut sim = Simulation::from_config(config)?.with_snapshot_history(true);
    sim.run();
    Ok(sim.report(true).to_json()?)
}

#[test]
fn test_same_seed_gives_identical_reports() -> TestResult {
    init_test_logging();

    let first = baseline_report()?;
    let second = baseline_report()?;
    assert_eq!(first, second);
    assert!(first.contains("\"snapshots\""));
    Ok(())
}

#[test]
fn test_yaml_scenario_file_with_oversubscribed_slices() -> TestResult {
    init_test_logging();

    let dir = tempfile::tempdir()?;
    let yaml = BASELINE_SCENARIO_YAML.replace("resource_percentage: 0.7", "resource_percentage: 0.9");
    let path = write_scenario_file(&dir, "oversubscribed.yaml", &yaml)?;

    let (config, warnings) = load_and_validate_simulation_config(&path)?;
    assert!(warnings
        .iter()
        .any(|w| matches!(w, ConfigWarning::QuotaOversubscribed { .. })));

    let sim = run_to_completion(config)?;
    assert_run_invariants(&sim);
    for node in sim.edge_nodes() {
        assert_eq!(node.slices().len(), 2);
    }
    Ok(())
}

#[test]
fn test_json_scenario_file() -> TestResult {
    init_test_logging();

    let dir = tempfile::tempdir()?;
    let path = write_scenario_file(&dir, "scenario.json", BASELINE_SCENARIO_JSON)?;
    let config = load_simulation_config(&path)?;
    assert_eq!(config.offloading_policy.strategy, StrategyKind::AlwaysOffload);
    assert_eq!(config.iot_devices.types[0].wireless_technology, WirelessTechnology::Lte);

    let sim = run_to_completion(config)?;
    let report = sim.report(false);
    assert_eq!(report.strategy, "always_offload");
    assert_eq!(report.branches.local, 0);
    assert_eq!(report.branches.edge, report.tasks_generated);
    assert_run_invariants(&sim);
    Ok(())
}

#[test]
fn test_report_written_as_json() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .timing(5.0, 0.5)
        .devices(2, vec![device_template("cam", 4000, WirelessTechnology::WiFi)])
        .edges(1, vec![edge_template("edge", 20_000)])
        .build();
    let sim = run_to_completion(config)?;
    let report = sim.report(true);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("report.json");
    report.write_json(&path)?;

    let read: SimulationReport = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(read.status, RunStatus::Completed);
    assert_eq!(read.ticks_completed, 10);
    assert_eq!(read.total_ticks, 10);
    assert_eq!(read.tasks_generated, report.tasks_generated);
    assert_eq!(read.branches, report.branches);
    assert_eq!(read.snapshots.map(|s| s.len()), Some(10));

    let summary = report.to_string();
    assert!(summary.starts_with("Run completed after 10/10 ticks"));
    Ok(())
}

#[test]
fn test_invalid_scenario_is_rejected() {
    init_test_logging();

    let config = ScenarioBuilder::new().timing(10.0, 0.0).build();
    assert!(Simulation::from_config(config).is_err());

    let empty = ScenarioBuilder::new().build();
    assert!(Simulation::from_config(empty).is_err(), "a scenario needs devices");
}

#[tokio::test]
async fn test_watchdog_stops_long_run() -> TestResult {
    init_test_logging();

    let config = ScenarioBuilder::new()
        .timing(1.0e7, 0.01)
        .devices(10, vec![device_template("tag", 2000, WirelessTechnology::Ble)])
        .build();
    let sim = Simulation::from_config(config)?.with_snapshot_history(false);

    let sim = sim.run_with_watchdog(Duration::from_millis(100)).await?;
    let report = sim.report(false);

    assert_eq!(report.status, RunStatus::TimedOut);
    assert!(report.ticks_completed < report.total_ticks);
    assert_eq!(sim.metrics().len(), 1, "only the latest snapshot is retained");
    assert_run_invariants(&sim);
    Ok(())
}

#[tokio::test]
async fn test_watchdog_lets_short_run_finish() -> TestResult {
    init_test_logging();

    let config = load_simulation_config_from_str(BASELINE_SCENARIO_YAML)?;
    let sim = Simulation::from_config(config)?
        .run_with_watchdog(Duration::from_secs(30))
        .await?;

    assert_eq!(sim.status(), RunStatus::Completed);
    assert!(sim.is_finished());
    Ok(())
}
