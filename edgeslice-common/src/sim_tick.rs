//! Fixed-timestep simulation tick and clock
//!
//! Simulated time never accumulates floating point increments: the current
//! time is always derived as `start + tick * time_step`, so two runs with the
//! same configuration observe bit-identical timestamps.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tolerance used when converting a duration into a tick count
const TICK_EPSILON: f64 = 1e-9;

/// Simulation tick counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimulationTick(u64);

impl SimulationTick {
    /// Creates a new simulation tick
    pub fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Creates the initial tick (tick 0)
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the tick value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Advances to the next tick
    pub fn next(&mut self) {
        self.0 += 1;
    }

    /// Returns the next tick without mutating
    pub fn next_tick(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true if this is the initial tick
    pub fn is_initial(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for SimulationTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl From<u64> for SimulationTick {
    fn from(tick: u64) -> Self {
        Self::new(tick)
    }
}

impl From<SimulationTick> for u64 {
    fn from(tick: SimulationTick) -> u64 {
        tick.0
    }
}

/// Simulation time configuration, in simulated seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationTimeConfig {
    /// Simulated time of the first tick
    pub start_time_s: f64,
    /// Simulated time at which the run ends (exclusive)
    pub end_time_s: f64,
    /// Length of one tick
    pub time_step_s: f64,
}

impl Default for SimulationTimeConfig {
    fn default() -> Self {
        Self {
            start_time_s: 0.0,
            end_time_s: 3600.0,
            time_step_s: 0.1,
        }
    }
}

impl SimulationTimeConfig {
    /// Creates a new simulation time configuration
    pub fn new(start_time_s: f64, end_time_s: f64, time_step_s: f64) -> Self {
        Self {
            start_time_s,
            end_time_s,
            time_step_s,
        }
    }

    /// Returns the simulated span covered by the run
    pub fn duration_s(&self) -> f64 {
        (self.end_time_s - self.start_time_s).max(0.0)
    }

    /// Returns the number of ticks needed to cover `[start, end)`
    pub fn total_ticks(&self) -> u64 {
        if self.time_step_s <= 0.0 {
            return 0;
        }
        let ticks = (self.duration_s() / self.time_step_s - TICK_EPSILON).ceil();
        if ticks <= 0.0 {
            0
        } else {
            ticks as u64
        }
    }

    /// Converts a tick to simulated time in seconds
    pub fn tick_to_time(&self, tick: SimulationTick) -> f64 {
        self.start_time_s + tick.value() as f64 * self.time_step_s
    }
}

/// Trait for components that can be stepped forward in simulation
pub trait SimulationStepper {
    /// Error raised by a failed step
    type Error;

    /// Steps the component forward by one tick
    fn step(&mut self, tick: SimulationTick) -> Result<(), Self::Error>;
}

/// Simulation clock for coordinating timesteps
#[derive(Debug, Clone)]
pub struct SimulationClock {
    current_tick: SimulationTick,
    config: SimulationTimeConfig,
    total_ticks: u64,
    started_at: Instant,
}

impl SimulationClock {
    /// Creates a new simulation clock
    pub fn new(config: SimulationTimeConfig) -> Self {
        Self {
            current_tick: SimulationTick::initial(),
            total_ticks: config.total_ticks(),
            config,
            started_at: Instant::now(),
        }
    }

    /// Returns the current tick
    pub fn current_tick(&self) -> SimulationTick {
        self.current_tick
    }

    /// Returns the configuration
    pub fn config(&self) -> &SimulationTimeConfig {
        &self.config
    }

    /// Returns the number of ticks the run consists of
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Returns the length of one tick in simulated seconds
    pub fn time_step(&self) -> f64 {
        self.config.time_step_s
    }

    /// Advances the clock by exactly one tick
    pub fn tick(&mut self) {
        self.current_tick.next();
    }

    /// Returns true if the simulation is complete
    pub fn is_complete(&self) -> bool {
        self.current_tick.value() >= self.total_ticks
    }

    /// Returns the current simulated time in seconds
    pub fn current_time(&self) -> f64 {
        self.config.tick_to_time(self.current_tick)
    }

    /// Returns the fraction of the run already simulated, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.total_ticks == 0 {
            return 1.0;
        }
        (self.current_tick.value() as f64 / self.total_ticks as f64).min(1.0)
    }

    /// Returns the elapsed wall-clock time since the clock was created or reset
    pub fn elapsed_real_time(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Resets the clock to initial state
    pub fn reset(&mut self) {
        self.current_tick = SimulationTick::initial();
        self.started_at = Instant::now();
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(SimulationTimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_tick_creation() {
        let tick = SimulationTick::new(42);
        assert_eq!(tick.value(), 42);
        assert_eq!(format!("{tick}"), "Tick(42)");
    }

    #[test]
    fn test_simulation_tick_next() {
        let mut tick = SimulationTick::new(5);
        tick.next();
        assert_eq!(tick.value(), 6);

        let next_tick = tick.next_tick();
        assert_eq!(next_tick.value(), 7);
        assert_eq!(tick.value(), 6);
        assert!(SimulationTick::initial().is_initial());
    }

    #[test]
    fn test_total_ticks_exact_division() {
        let config = SimulationTimeConfig::new(0.0, 10.0, 0.1);
        assert_eq!(config.total_ticks(), 100);

        let config = SimulationTimeConfig::new(0.0, 1.0, 0.25);
        assert_eq!(config.total_ticks(), 4);
    }

    #[test]
    fn test_total_ticks_partial_step() {
        // 1.05s at 0.1s steps still needs the tick starting at 1.0
        let config = SimulationTimeConfig::new(0.0, 1.05, 0.1);
        assert_eq!(config.total_ticks(), 11);
    }

    #[test]
    fn test_total_ticks_degenerate() {
        assert_eq!(SimulationTimeConfig::new(5.0, 5.0, 0.1).total_ticks(), 0);
        assert_eq!(SimulationTimeConfig::new(5.0, 1.0, 0.1).total_ticks(), 0);
        assert_eq!(SimulationTimeConfig::new(0.0, 1.0, 0.0).total_ticks(), 0);
    }

    #[test]
    fn test_simulation_clock_tick() {
        let mut clock = SimulationClock::new(SimulationTimeConfig::new(2.0, 3.0, 0.5));

        assert_eq!(clock.current_tick().value(), 0);
        assert_eq!(clock.current_time(), 2.0);

        clock.tick();
        assert_eq!(clock.current_time(), 2.5);
        assert!(!clock.is_complete());

        clock.tick();
        assert_eq!(clock.current_time(), 3.0);
        assert!(clock.is_complete());
    }

    #[test]
    fn test_simulation_clock_progress_and_reset() {
        let mut clock = SimulationClock::new(SimulationTimeConfig::new(0.0, 1.0, 0.25));
        clock.tick();
        assert!((clock.progress() - 0.25).abs() < 1e-12);

        clock.reset();
        assert_eq!(clock.current_tick().value(), 0);
        assert_eq!(clock.progress(), 0.0);
    }

    struct CountingStepper {
        steps: u64,
    }

    impl SimulationStepper for CountingStepper {
        type Error = String;

        fn step(&mut self, _tick: SimulationTick) -> Result<(), Self::Error> {
            self.steps += 1;
            Ok(())
        }
    }

    #[test]
    fn test_simulation_stepper_trait() {
        let mut stepper = CountingStepper { steps: 0 };
        stepper.step(SimulationTick::new(1)).unwrap();
        stepper.step(SimulationTick::new(2)).unwrap();
        assert_eq!(stepper.steps, 2);
    }
}
