//! Per-tick snapshots and the end-of-run report

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::IoTDevice;
use crate::events::{PlacementBranch, SchedulerEvent};
use crate::node::{CloudNode, EdgeNode};
use crate::resource::ResourceUtilization;
use crate::stats::TaskStatistics;
use crate::task::TaskId;

/// Device state at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: u32,
    pub battery_fraction: f64,
    pub utilization: ResourceUtilization,
    pub local_count: u64,
    pub offloaded_count: u64,
}

impl DeviceSnapshot {
    pub fn capture(device: &IoTDevice) -> Self {
        Self {
            id: device.id().value(),
            battery_fraction: device.battery_fraction(),
            utilization: device.utilization(),
            local_count: device.local_count(),
            offloaded_count: device.offloaded_count(),
        }
    }
}

/// Edge node or cloud state at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u32,
    pub utilization: ResourceUtilization,
    pub active_tasks: usize,
    pub total_processed: u64,
}

impl NodeSnapshot {
    pub fn capture_edge(node: &EdgeNode) -> Self {
        Self {
            id: node.id().value(),
            utilization: node.utilization(),
            active_tasks: node.active_count(),
            total_processed: node.total_processed(),
        }
    }

    pub fn capture_cloud(cloud: &CloudNode) -> Self {
        Self {
            id: cloud.id().value(),
            utilization: cloud.utilization(),
            active_tasks: cloud.active_count(),
            total_processed: cloud.total_processed(),
        }
    }
}

/// Scheduler events observed during one tick, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub admitted_local: u32,
    pub admitted_edge: u32,
    pub admitted_cloud: u32,
    pub local_fallback: u32,
    pub rejected: u32,
    pub deferred: u32,
    pub completed: u32,
    pub dropped: u32,
}

impl EventCounts {
    /// Tallies a batch of events
    pub fn from_events(events: &[SchedulerEvent]) -> Self {
        let mut counts = Self::default();
        for event in events {
            match event {
                SchedulerEvent::Admitted { branch, .. } => match branch {
                    PlacementBranch::Local => counts.admitted_local += 1,
                    PlacementBranch::Edge => counts.admitted_edge += 1,
                    PlacementBranch::Cloud => counts.admitted_cloud += 1,
                    PlacementBranch::LocalFallback => counts.local_fallback += 1,
                },
                SchedulerEvent::Rejected { .. } => counts.rejected += 1,
                SchedulerEvent::Deferred { .. } => counts.deferred += 1,
                SchedulerEvent::Completed { .. } => counts.completed += 1,
                SchedulerEvent::Dropped { .. } => counts.dropped += 1,
            }
        }
        counts
    }

    /// Tasks that started running
    pub fn admitted(&self) -> u32 {
        self.admitted_local + self.admitted_edge + self.admitted_cloud + self.local_fallback
    }
}

/// Observable state at the end of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub time: f64,
    pub generated: Vec<TaskId>,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub events: EventCounts,
    pub devices: Vec<DeviceSnapshot>,
    pub edge_nodes: Vec<NodeSnapshot>,
    pub cloud: Option<NodeSnapshot>,
    pub statistics: TaskStatistics,
}

/// Ordered snapshot history
///
/// Without history only the latest snapshot is kept.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    snapshots: Vec<TickSnapshot>,
    retain_history: bool,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MetricsRecorder {
    pub fn new(retain_history: bool) -> Self {
        Self {
            snapshots: Vec::new(),
            retain_history,
        }
    }

    pub fn retains_history(&self) -> bool {
        self.retain_history
    }

    pub fn record(&mut self, snapshot: TickSnapshot) {
        if !self.retain_history {
            self.snapshots.clear();
        }
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[TickSnapshot] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&TickSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Generated task ids in tick order
    pub fn generation_sequence(&self) -> impl Iterator<Item = &TaskId> {
        self.snapshots.iter().flat_map(|s| s.generated.iter())
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Not started or still running
    InProgress,
    /// Reached the configured end time
    Completed,
    /// Stopped by the wall-clock watchdog
    TimedOut,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::InProgress => write!(f, "in progress"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Placement branch totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTotals {
    pub local: u64,
    pub edge: u64,
    pub cloud: u64,
    pub local_fallback: u64,
}

/// Exportable summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub status: RunStatus,
    pub strategy: String,
    pub seed: u64,
    pub ticks_completed: u64,
    pub total_ticks: u64,
    pub simulated_time: f64,
    pub device_count: usize,
    pub edge_node_count: usize,
    pub has_cloud: bool,
    pub tasks_generated: u64,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub deferred_total: u64,
    pub dropped_total: u64,
    pub branches: BranchTotals,
    pub statistics: TaskStatistics,
    pub devices: Vec<DeviceSnapshot>,
    pub edge_nodes: Vec<NodeSnapshot>,
    pub cloud: Option<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<TickSnapshot>>,
}

impl SimulationReport {
    /// Serializes the report as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as pretty JSON to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> edgeslice_common::Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Run {} after {}/{} ticks ({:.1}s simulated, strategy {})",
            self.status, self.ticks_completed, self.total_ticks, self.simulated_time, self.strategy
        )?;
        writeln!(
            f,
            "Topology: {} devices, {} edge nodes, cloud {}",
            self.device_count,
            self.edge_node_count,
            if self.has_cloud { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            "Tasks: {} generated, {} pending, {} running, {} completed, {} deferrals, {} dropped",
            self.tasks_generated,
            self.pending,
            self.running,
            self.completed,
            self.deferred_total,
            self.dropped_total
        )?;
        writeln!(
            f,
            "Placements: local {}, edge {}, cloud {}, local fallback {}",
            self.branches.local, self.branches.edge, self.branches.cloud, self.branches.local_fallback
        )?;
        write!(f, "Statistics: {}", self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;
    use crate::node::NodeId;
    use crate::tier::ExecutionSite;

    fn snapshot(tick: u64) -> TickSnapshot {
        TickSnapshot {
            tick,
            time: tick as f64 * 0.1,
            generated: vec![TaskId::new(DeviceId::new(0), tick)],
            pending: 0,
            running: 1,
            completed: 0,
            events: EventCounts::default(),
            devices: Vec::new(),
            edge_nodes: Vec::new(),
            cloud: None,
            statistics: TaskStatistics::default(),
        }
    }

    fn report() -> SimulationReport {
        SimulationReport {
            status: RunStatus::Completed,
            strategy: "energy_aware".into(),
            seed: 42,
            ticks_completed: 10,
            total_ticks: 10,
            simulated_time: 1.0,
            device_count: 1,
            edge_node_count: 0,
            has_cloud: false,
            tasks_generated: 3,
            pending: 0,
            running: 1,
            completed: 2,
            deferred_total: 0,
            dropped_total: 0,
            branches: BranchTotals {
                local: 3,
                ..BranchTotals::default()
            },
            statistics: TaskStatistics::default(),
            devices: Vec::new(),
            edge_nodes: Vec::new(),
            cloud: None,
            snapshots: None,
        }
    }

    #[test]
    fn test_event_counts() {
        let task = TaskId::new(DeviceId::new(0), 0);
        let events = vec![
            SchedulerEvent::Rejected {
                task,
                by: crate::events::RejectedBy::Edge(NodeId::new(1)),
                time: 0.0,
            },
            SchedulerEvent::Admitted {
                task,
                site: ExecutionSite::Device(DeviceId::new(0)),
                branch: PlacementBranch::LocalFallback,
                time: 0.0,
                completion_time: 1.0,
            },
            SchedulerEvent::Completed {
                task,
                site: ExecutionSite::Device(DeviceId::new(0)),
                time: 1.0,
            },
        ];
        let counts = EventCounts::from_events(&events);
        assert_eq!(counts.rejected, 1);
        assert_eq!(counts.local_fallback, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.admitted(), 1);
    }

    #[test]
    fn test_device_snapshot_utilization_clamped() {
        let mut device = crate::device::tests::device(0, 400);
        let task = crate::task::Task::from_profile(
            TaskId::new(DeviceId::new(0), 0),
            edgeslice_common::TaskType::Lightweight,
            0.0,
        );
        device.execute_locally(task, 0.0);

        let snap = DeviceSnapshot::capture(&device);
        assert_eq!(snap.utilization.compute, 1.0);
        assert!((0.0..=1.0).contains(&snap.utilization.memory));
        assert!((0.0..=1.0).contains(&snap.utilization.bandwidth));
    }

    #[test]
    fn test_recorder_keeps_order() {
        let mut recorder = MetricsRecorder::default();
        assert!(recorder.is_empty());
        for tick in 0..3 {
            recorder.record(snapshot(tick));
        }
        assert_eq!(recorder.len(), 3);
        assert_eq!(recorder.latest().map(|s| s.tick), Some(2));
        let sequence: Vec<u64> = recorder.generation_sequence().map(|id| id.sequence).collect();
        assert_eq!(sequence, vec![0, 1, 2]);
    }

    #[test]
    fn test_recorder_latest_only() {
        let mut recorder = MetricsRecorder::new(false);
        for tick in 0..5 {
            recorder.record(snapshot(tick));
        }
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.latest().map(|s| s.tick), Some(4));
    }

    #[test]
    fn test_report_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report().write_json(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["status"], "Completed");
        assert_eq!(value["branches"]["local"], 3);
        assert!(value.get("snapshots").is_none());

        let parsed: SimulationReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_report_display() {
        let text = report().to_string();
        assert!(text.contains("Run completed after 10/10 ticks"));
        assert!(text.contains("local 3"));
    }
}
