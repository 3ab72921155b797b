use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::net::{self, TransmitOutcome};
use crate::simulate::{self, Reading};
use crate::types::{
    round1, round2, AnomalyKind, BatteryInfo, DeviceInfo, DeviceStatus, Detections, Environment,
    FireDetection, GpsCoordinates, LoggingDetection, LoggingSource, SensorPayload,
};

/// Forest-area base positions; devices are spread across these by id.
const DEFAULT_COORDINATES: [GpsCoordinates; 5] = [
    GpsCoordinates { latitude: 37.7749, longitude: -122.4194 }, // San Francisco
    GpsCoordinates { latitude: 37.8651, longitude: -119.5383 }, // Yosemite
    GpsCoordinates { latitude: 36.4864, longitude: -118.5658 }, // Sequoia
    GpsCoordinates { latitude: 40.3428, longitude: -121.4092 }, // Lassen
    GpsCoordinates { latitude: 38.8876, longitude: -120.0777 }, // Tahoe
];

const HISTORY_LEN: usize = 12;

/// An in-flight anomaly; cleared once `duration_cycles` transmission
/// cycles have elapsed since `started_at`.
#[derive(Debug, Clone, Copy)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub started_at: DateTime<Utc>,
    pub duration_cycles: u32,
}

#[derive(Debug, Default)]
pub(crate) struct DetectionState {
    pub fire_detected: bool,
    pub logging_detected: bool,
    pub confidence: f64,
    pub time_detected: Option<DateTime<Utc>>,
    pub logging_source: Option<LoggingSource>,
}

/// A simulated Guardian forest-monitoring device.
///
/// Each device owns its whole state and runs on its own task; nothing is
/// shared between devices beyond the HTTP client.
pub struct GuardianDevice {
    pub code_name: String,
    pub gps_coordinates: GpsCoordinates,
    pub(crate) baseline_temperature: f64,
    pub(crate) baseline_humidity: f64,
    pub(crate) baseline_smoke: f64,
    pub(crate) battery_percentage: f64,
    pub(crate) charging: bool,
    pub(crate) status: DeviceStatus,
    pub(crate) uptime_hours: f64,
    pub(crate) temperature_history: VecDeque<f64>,
    pub(crate) humidity_history: VecDeque<f64>,
    pub(crate) smoke_history: VecDeque<f64>,
    pub(crate) anomaly: Option<Anomaly>,
    pub(crate) detection: DetectionState,
    interval_secs: u64,
    alert_probability: f64,
}

impl GuardianDevice {
    pub fn new(id: u32, config: &Config, rng: &mut impl Rng) -> Self {
        let base = DEFAULT_COORDINATES[id as usize % DEFAULT_COORDINATES.len()];
        // Same small offset on both axes keeps co-sited devices apart.
        let offset = rng.gen_range(-0.01..0.01);
        let gps_coordinates = GpsCoordinates {
            latitude: base.latitude + offset,
            longitude: base.longitude + offset,
        };

        let device = GuardianDevice {
            code_name: format!("GUARDIAN-{id:03}"),
            gps_coordinates,
            baseline_temperature: rng.gen_range(18.0..25.0),
            baseline_humidity: rng.gen_range(50.0..70.0),
            baseline_smoke: rng.gen_range(50.0..150.0),
            battery_percentage: rng.gen_range(70.0..100.0),
            charging: rng.gen::<f64>() > 0.7,
            status: DeviceStatus::Active,
            uptime_hours: 0.0,
            temperature_history: VecDeque::with_capacity(HISTORY_LEN),
            humidity_history: VecDeque::with_capacity(HISTORY_LEN),
            smoke_history: VecDeque::with_capacity(HISTORY_LEN),
            anomaly: None,
            detection: DetectionState::default(),
            interval_secs: config.interval_secs,
            alert_probability: config.alert_probability,
        };

        info!(
            device = %device.code_name,
            latitude = device.gps_coordinates.latitude,
            longitude = device.gps_coordinates.longitude,
            "initialized device"
        );
        device
    }

    /// Advance uptime, battery and status by one transmission cycle.
    pub fn update_state(&mut self, rng: &mut impl Rng) {
        self.uptime_hours += self.interval_secs as f64 / 3600.0;

        if self.charging {
            // Charging slows down as the battery fills.
            self.battery_percentage +=
                rng.gen_range(0.1..0.5) * (100.0 - self.battery_percentage) / 100.0;
            if self.battery_percentage > 99.0 {
                self.battery_percentage = 100.0;
                if rng.gen::<f64>() < 0.1 {
                    self.charging = false;
                }
            }
        } else {
            self.battery_percentage -= rng.gen_range(0.05..0.2);
            if self.battery_percentage < 15.0 && rng.gen::<f64>() < 0.3 {
                self.charging = true;
            }
        }
        self.battery_percentage = self.battery_percentage.clamp(5.0, 100.0);

        if rng.gen::<f64>() < 0.01 {
            self.status = match rng.gen_range(0..3) {
                0 => DeviceStatus::Active,
                1 => DeviceStatus::Maintenance,
                _ => DeviceStatus::Degraded,
            };
        }
    }

    /// Maybe start a new anomaly, or end the active one once its
    /// duration has elapsed.
    pub fn step_anomaly(&mut self, now: DateTime<Utc>, rng: &mut impl Rng) {
        match self.anomaly {
            None => {
                if rng.gen::<f64>() < self.alert_probability {
                    let kind = if rng.gen_range(0..2) == 0 {
                        AnomalyKind::Fire
                    } else {
                        AnomalyKind::Logging
                    };
                    let duration_cycles = rng.gen_range(2..=5);
                    self.anomaly = Some(Anomaly {
                        kind,
                        started_at: now,
                        duration_cycles,
                    });
                    debug!(
                        device = %self.code_name,
                        anomaly = %kind,
                        cycles = duration_cycles,
                        "starting anomaly"
                    );
                }
            }
            Some(anomaly) => {
                let elapsed_cycles =
                    (now - anomaly.started_at).num_seconds() as f64 / self.interval_secs as f64;
                if elapsed_cycles >= anomaly.duration_cycles as f64 {
                    debug!(device = %self.code_name, anomaly = %anomaly.kind, "ending anomaly");
                    self.anomaly = None;
                    self.detection = DetectionState::default();
                }
            }
        }
    }

    pub(crate) fn record_reading(&mut self, reading: &Reading) {
        push_capped(&mut self.temperature_history, reading.temperature);
        push_capped(&mut self.humidity_history, reading.humidity);
        push_capped(&mut self.smoke_history, reading.smoke_level);
    }

    /// Build the wire snapshot for the current state and reading.
    pub fn payload(&self, reading: &Reading, now: DateTime<Utc>) -> SensorPayload {
        let estimated_runtime_hours = if self.charging {
            // Mains-backed devices report a flat one-week figure.
            24.0 * 7.0
        } else {
            self.battery_percentage / 100.0 * 24.0 * 5.0
        };

        SensorPayload {
            device_info: DeviceInfo {
                code_name: self.code_name.clone(),
                timestamp: now,
                gps_coordinates: self.gps_coordinates,
                battery: BatteryInfo {
                    percentage: round1(self.battery_percentage),
                    charging: self.charging,
                    estimated_runtime_hours: round1(estimated_runtime_hours),
                },
                status: self.status,
            },
            environment: Environment {
                temperature: round1(reading.temperature),
                humidity: round1(reading.humidity),
                smoke_level: reading.smoke_level.round(),
                last_reading_time: now,
            },
            detections: Detections {
                fire: FireDetection {
                    detected: self.detection.fire_detected,
                    confidence: if self.detection.fire_detected {
                        round2(self.detection.confidence)
                    } else {
                        0.0
                    },
                    time_detected: self.detection.time_detected.filter(|_| self.detection.fire_detected),
                },
                logging: LoggingDetection {
                    detected: self.detection.logging_detected,
                    confidence: if self.detection.logging_detected {
                        round2(self.detection.confidence)
                    } else {
                        0.0
                    },
                    time_detected: self
                        .detection
                        .time_detected
                        .filter(|_| self.detection.logging_detected),
                    detection_type: self
                        .detection
                        .logging_source
                        .filter(|_| self.detection.logging_detected),
                },
            },
        }
    }

    /// Simulation loop: stagger, register, then one transmission per interval
    /// until shutdown is signalled.
    pub async fn run(mut self, client: Client, config: Config, mut shutdown: watch::Receiver<bool>) {
        let mut rng = StdRng::from_entropy();

        let stagger = Duration::from_secs_f64(rng.gen_range(1.0..10.0));
        tokio::select! {
            _ = time::sleep(stagger) => {}
            _ = shutdown.changed() => return,
        }

        // First transmission registers the device with the backend.
        self.transmit_cycle(&client, &config, &mut rng).await;

        let interval = Duration::from_secs(self.interval_secs);
        loop {
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }

            self.update_state(&mut rng);
            self.step_anomaly(Utc::now(), &mut rng);
            self.transmit_cycle(&client, &config, &mut rng).await;
        }

        info!(device = %self.code_name, "stopped");
    }

    async fn transmit_cycle(&mut self, client: &Client, config: &Config, rng: &mut StdRng) {
        let now = Utc::now();
        let reading = simulate::generate_reading(self, now, rng);
        let payload = self.payload(&reading, now);

        match net::send_reading(client, config, &payload).await {
            Ok(TransmitOutcome::Accepted(status)) => {
                if self.detection.fire_detected {
                    info!(device = %self.code_name, %status, "sent FIRE ALERT");
                } else if self.detection.logging_detected {
                    info!(device = %self.code_name, %status, "sent LOGGING ALERT");
                } else {
                    debug!(device = %self.code_name, %status, "sent update");
                }
            }
            Ok(TransmitOutcome::Rejected(status, body)) => {
                let excerpt: String = body.chars().take(100).collect();
                warn!(device = %self.code_name, %status, %excerpt, "transmission failed");
            }
            Err(e) => {
                error!(device = %self.code_name, "transmission error: {e}");
            }
        }
    }
}

fn push_capped(history: &mut VecDeque<f64>, value: f64) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(value);
}
