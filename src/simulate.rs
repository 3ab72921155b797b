use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;

use crate::device::GuardianDevice;
use crate::types::{AnomalyKind, LoggingSource};

/// One cycle's worth of clamped sensor values.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub smoke_level: f64,
}

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 50.0);
pub const HUMIDITY_RANGE: (f64, f64) = (10.0, 100.0);
pub const SMOKE_RANGE: (f64, f64) = (0.0, 1000.0);

/// Synthesize a reading from the device baselines, the clock and any active
/// anomaly, updating the device's detection state and rolling history.
pub fn generate_reading(
    device: &mut GuardianDevice,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Reading {
    let mut temperature = device.baseline_temperature + rng.gen_range(-1.0..1.0);
    let mut humidity = device.baseline_humidity + rng.gen_range(-5.0..5.0);
    let mut smoke_level = device.baseline_smoke + rng.gen_range(-20.0..20.0);

    // 0 at noon UTC, 1 at midnight: nights run cooler and damper.
    let time_factor = (now.hour() as f64 - 12.0).abs() / 12.0;
    temperature -= time_factor * rng.gen_range(3.0..6.0);
    humidity += time_factor * rng.gen_range(5.0..15.0);

    // 0 mid-year, 1 at the year boundaries.
    let seasonal_factor = ((now.ordinal() as f64 - 183.0) / 183.0).abs();
    temperature -= seasonal_factor * rng.gen_range(2.0..8.0);
    humidity += seasonal_factor * rng.gen_range(10.0..20.0);

    if let Some(anomaly) = device.anomaly {
        match anomaly.kind {
            AnomalyKind::Fire => {
                temperature += rng.gen_range(15.0..30.0);
                humidity -= rng.gen_range(20.0..40.0);
                smoke_level += rng.gen_range(400.0..800.0);

                device.detection.fire_detected = true;
                device.detection.logging_detected = false;
                device.detection.time_detected = Some(now);
                device.detection.confidence = rng.gen_range(0.75..0.98);
                device.detection.logging_source = None;
            }
            AnomalyKind::Logging => {
                // Logging barely moves the environment; the smoke bump
                // stands in for dust kicked up by machinery.
                temperature += rng.gen_range(0.0..2.0);
                humidity -= rng.gen_range(0.0..5.0);
                smoke_level += rng.gen_range(50.0..150.0);

                device.detection.fire_detected = false;
                device.detection.logging_detected = true;
                device.detection.time_detected = Some(now);
                device.detection.confidence = rng.gen_range(0.75..0.98);
                device.detection.logging_source = Some(match rng.gen_range(0..3) {
                    0 => LoggingSource::Chainsaw,
                    1 => LoggingSource::Vehicle,
                    _ => LoggingSource::Machinery,
                });
            }
        }
    }

    let reading = Reading {
        temperature: temperature.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1),
        humidity: humidity.clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1),
        smoke_level: smoke_level.clamp(SMOKE_RANGE.0, SMOKE_RANGE.1),
    };
    device.record_reading(&reading);
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn device(alert_probability: f64, seed: u64) -> (GuardianDevice, StdRng) {
        let config = Config {
            devices: 1,
            interval_secs: 5,
            endpoint: "http://localhost:5000/api/sensors/data".to_string(),
            api_key: "demo-key-123".to_string(),
            alert_probability,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let device = GuardianDevice::new(1, &config, &mut rng);
        (device, rng)
    }

    #[test]
    fn readings_stay_in_range_across_seasons_and_anomalies() {
        let (mut device, mut rng) = device(1.0, 13);
        // Sweep hours and days so diurnal and seasonal extremes are hit
        // while anomalies start and stop.
        for day in (1..365).step_by(30) {
            for hour in 0..24 {
                let now = Utc
                    .with_ymd_and_hms(2025, 1, 1, hour, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(day);
                device.step_anomaly(now, &mut rng);
                let reading = generate_reading(&mut device, now, &mut rng);
                assert!((0.0..=50.0).contains(&reading.temperature));
                assert!((10.0..=100.0).contains(&reading.humidity));
                assert!((0.0..=1000.0).contains(&reading.smoke_level));
            }
        }
    }

    #[test]
    fn fire_anomaly_sets_only_fire_detection() {
        let (mut device, mut rng) = device(0.0, 17);
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
        device.anomaly = Some(crate::device::Anomaly {
            kind: AnomalyKind::Fire,
            started_at: now,
            duration_cycles: 3,
        });

        generate_reading(&mut device, now, &mut rng);
        assert!(device.detection.fire_detected);
        assert!(!device.detection.logging_detected);
        assert!((0.75..0.98).contains(&device.detection.confidence));
        assert_eq!(device.detection.time_detected, Some(now));
        assert!(device.detection.logging_source.is_none());
    }

    #[test]
    fn logging_anomaly_sets_only_logging_detection() {
        let (mut device, mut rng) = device(0.0, 19);
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
        device.anomaly = Some(crate::device::Anomaly {
            kind: AnomalyKind::Logging,
            started_at: now,
            duration_cycles: 2,
        });

        generate_reading(&mut device, now, &mut rng);
        assert!(device.detection.logging_detected);
        assert!(!device.detection.fire_detected);
        assert!((0.75..0.98).contains(&device.detection.confidence));
        assert!(device.detection.logging_source.is_some());
    }

    #[test]
    fn detection_flags_stay_mutually_exclusive() {
        let (mut device, mut rng) = device(1.0, 23);
        let mut now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        for _ in 0..500 {
            device.step_anomaly(now, &mut rng);
            generate_reading(&mut device, now, &mut rng);
            assert!(
                !(device.detection.fire_detected && device.detection.logging_detected),
                "fire and logging detections must never overlap"
            );
            if let Some(anomaly) = device.anomaly {
                match anomaly.kind {
                    AnomalyKind::Fire => assert!(device.detection.fire_detected),
                    AnomalyKind::Logging => assert!(device.detection.logging_detected),
                }
            }
            now += chrono::Duration::seconds(5);
        }
    }

    #[test]
    fn calm_device_never_sets_detections() {
        let (mut device, mut rng) = device(0.0, 29);
        let mut now = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
        for _ in 0..200 {
            device.step_anomaly(now, &mut rng);
            generate_reading(&mut device, now, &mut rng);
            assert!(!device.detection.fire_detected);
            assert!(!device.detection.logging_detected);
            now += chrono::Duration::seconds(5);
        }
    }

    #[test]
    fn fire_readings_run_hotter_and_smokier_than_calm_ones() {
        let now = Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap();
        let (mut calm, mut calm_rng) = device(0.0, 31);
        let (mut burning, mut fire_rng) = device(0.0, 31);
        burning.anomaly = Some(crate::device::Anomaly {
            kind: AnomalyKind::Fire,
            started_at: now,
            duration_cycles: 5,
        });

        let mut calm_smoke = 0.0;
        let mut fire_smoke = 0.0;
        for _ in 0..50 {
            calm_smoke += generate_reading(&mut calm, now, &mut calm_rng).smoke_level;
            fire_smoke += generate_reading(&mut burning, now, &mut fire_rng).smoke_level;
        }
        assert!(fire_smoke > calm_smoke + 50.0 * 300.0);
    }
}
