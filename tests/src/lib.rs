//! Integration test framework for edgeslice
#![allow(missing_docs)]
//!
//! Scenario builders and helpers shared by the end-to-end tests.
//!
//! # Components
//!
//! - [`test_fixtures`] - Scenario builder, entity templates and YAML/JSON scenarios
//! - [`test_utils`] - Logging setup, config file helpers and invariant checks
//!
//! # Test Categories
//!
//! 1. **Offloading Scenarios** - placement chain under edge, cloud and battery constraints
//! 2. **Simulation Runs** - determinism, config loading, report export and the watchdog

pub mod test_fixtures;
pub mod test_utils;

pub use test_fixtures::{
    cloud_config, device_template, edge_template, slice, ScenarioBuilder, BASELINE_SCENARIO_JSON,
    BASELINE_SCENARIO_YAML,
};
pub use test_utils::{
    assert_run_invariants, init_test_logging, run_to_completion, write_scenario_file, TestResult,
};
