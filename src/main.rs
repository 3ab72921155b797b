use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod device;
mod net;
mod simulate;
mod types;

use config::{Args, Config};
use device::GuardianDevice;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid arguments: {e}");
            std::process::exit(1);
        }
    };

    info!("Starting Guardian simulator with {} devices", config.devices);
    info!(
        "Sending data to {} every {} seconds",
        config.endpoint, config.interval_secs
    );

    let client = Client::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(config.devices as usize);
    for id in 1..=config.devices {
        let device = GuardianDevice::new(id, &config, &mut rand::thread_rng());
        handles.push(tokio::spawn(device.run(
            client.clone(),
            config.clone(),
            shutdown_rx.clone(),
        )));
        // Small gap between spawns staggers the fleet's transmissions.
        time::sleep(Duration::from_secs(1)).await;
    }

    info!("All {} Guardian devices are running", config.devices);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested...");
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }
    info!("Simulator stopped");

    Ok(())
}
