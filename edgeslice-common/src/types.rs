//! Shared vocabulary types
//!
//! Task categories, wireless access technologies and planar positions used
//! by both the configuration layer and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side length of the square deployment area, in distance units
pub const AREA_SIZE: f64 = 1000.0;

/// Task category
///
/// The category fixes the demand profile of a task and drives slice
/// eligibility on edge nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Small sensing/control work
    Lightweight,
    /// Moderate processing
    Medium,
    /// Heavy analytics
    Intensive,
}

impl TaskType {
    /// All task types, in ascending order of demand
    pub const ALL: [TaskType; 3] = [TaskType::Lightweight, TaskType::Medium, TaskType::Intensive];

    /// Returns the canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Lightweight => "lightweight",
            TaskType::Medium => "medium",
            TaskType::Intensive => "intensive",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lightweight" => Ok(TaskType::Lightweight),
            "medium" => Ok(TaskType::Medium),
            "intensive" => Ok(TaskType::Intensive),
            _ => Err(format!("unknown task type: {s}")),
        }
    }
}

/// Wireless access technology of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WirelessTechnology {
    /// IEEE 802.11
    WiFi,
    /// Bluetooth Low Energy
    #[serde(rename = "BLE")]
    Ble,
    /// 4G LTE
    #[serde(rename = "LTE")]
    Lte,
    /// 5G NR
    #[serde(alias = "5G")]
    FiveG,
}

impl WirelessTechnology {
    /// Multiplier applied to distance when ranking edge nodes.
    ///
    /// Short-range technologies are penalised more for far-away nodes.
    pub fn distance_weight(&self) -> f64 {
        match self {
            WirelessTechnology::WiFi => 1.0,
            WirelessTechnology::Ble => 1.5,
            WirelessTechnology::Lte => 0.7,
            WirelessTechnology::FiveG => 0.5,
        }
    }

    /// Returns the name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            WirelessTechnology::WiFi => "WiFi",
            WirelessTechnology::Ble => "BLE",
            WirelessTechnology::Lte => "LTE",
            WirelessTechnology::FiveG => "FiveG",
        }
    }
}

impl fmt::Display for WirelessTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WirelessTechnology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WiFi" | "wifi" => Ok(WirelessTechnology::WiFi),
            "BLE" | "ble" => Ok(WirelessTechnology::Ble),
            "LTE" | "lte" => Ok(WirelessTechnology::Lte),
            "FiveG" | "5G" | "5g" => Ok(WirelessTechnology::FiveG),
            _ => Err(format!("unknown wireless technology: {s}")),
        }
    }
}

/// Point in the deployment plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a new position
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Returns this position moved by `(dx, dy)` and clamped to the deployment area
    pub fn moved_within_area(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: (self.x + dx).clamp(0.0, AREA_SIZE),
            y: (self.y + dy).clamp(0.0, AREA_SIZE),
        }
    }
}
