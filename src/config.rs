use clap::Parser;
use thiserror::Error;

pub const MIN_INTERVAL_SECS: u64 = 5;

/// Guardian Sensor Network Simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of Guardian devices to simulate
    #[arg(long, default_value_t = 3)]
    pub devices: u32,

    /// Seconds between regular transmissions
    #[arg(long, default_value_t = 60)]
    pub interval: u64,

    /// Backend API endpoint URL
    #[arg(long, default_value = "http://localhost:5000/api/sensors/data")]
    pub endpoint: String,

    /// API key for authentication
    #[arg(long, default_value = "demo-key-123")]
    pub api_key: String,

    /// Probability of generating an alert each cycle (0-1)
    #[arg(long, default_value_t = 0.1, allow_negative_numbers = true)]
    pub alert_probability: f64,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("number of devices must be at least 1")]
    TooFewDevices,
    #[error("interval must be at least 5 seconds")]
    IntervalTooShort,
    #[error("alert probability must be between 0 and 1")]
    ProbabilityOutOfRange,
}

/// Validated runtime configuration shared by every device.
#[derive(Debug, Clone)]
pub struct Config {
    pub devices: u32,
    pub interval_secs: u64,
    pub endpoint: String,
    pub api_key: String,
    pub alert_probability: f64,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.devices < 1 {
            return Err(ConfigError::TooFewDevices);
        }
        if args.interval < MIN_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort);
        }
        if !(0.0..=1.0).contains(&args.alert_probability) {
            return Err(ConfigError::ProbabilityOutOfRange);
        }

        Ok(Config {
            devices: args.devices,
            interval_secs: args.interval,
            endpoint: args.endpoint,
            api_key: args.api_key,
            alert_probability: args.alert_probability,
        })
    }
}
