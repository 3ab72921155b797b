use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Operational status reported by a device.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Active,
    Maintenance,
    Degraded,
}

/// Kind of environmental anomaly a device can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    Fire,
    Logging,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::Fire => write!(f, "FIRE"),
            AnomalyKind::Logging => write!(f, "LOGGING"),
        }
    }
}

/// Sound signature attributed to a logging detection.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingSource {
    Chainsaw,
    Vehicle,
    Machinery,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct BatteryInfo {
    pub percentage: f64,
    pub charging: bool,
    pub estimated_runtime_hours: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct DeviceInfo {
    pub code_name: String,
    pub timestamp: DateTime<Utc>,
    pub gps_coordinates: GpsCoordinates,
    pub battery: BatteryInfo,
    pub status: DeviceStatus,
}

#[derive(Serialize, Debug, Clone)]
pub struct Environment {
    pub temperature: f64,
    pub humidity: f64,
    pub smoke_level: f64,
    pub last_reading_time: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct FireDetection {
    pub detected: bool,
    pub confidence: f64,
    pub time_detected: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoggingDetection {
    pub detected: bool,
    pub confidence: f64,
    pub time_detected: Option<DateTime<Utc>>,
    pub detection_type: Option<LoggingSource>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Detections {
    pub fire: FireDetection,
    pub logging: LoggingDetection,
}

/// Snapshot sent to the backend once per transmission cycle.
#[derive(Serialize, Debug, Clone)]
pub struct SensorPayload {
    pub device_info: DeviceInfo,
    pub environment: Environment,
    pub detections: Detections,
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
