use std::{fs::OpenOptions, sync::Mutex, time::Duration};

use anyhow::Context;
use boiler_common::{
    config::{config_path, BoilerConfig, LoggingConfig},
    types::is_sensor_failure,
};
use boiler_sensor::{Ds18b20, TemperatureSensor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const READ_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run() -> anyhow::Result<()> {
    let path = config_path();
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: BoilerConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    init_tracing(&config.logging)?;

    let hardware = config.hardware()?;
    let unit = config.units();

    let sensor = Ds18b20::new(&config.sensor.base_path);
    info!(
        "reading sensor {} under {} every {}s",
        hardware.sensor_id,
        sensor.base_path().display(),
        READ_INTERVAL.as_secs()
    );

    let mut interval = tokio::time::interval(READ_INTERVAL);
    loop {
        interval.tick().await;

        let temperature = sensor
            .read(&hardware.sensor_id, hardware.sensor_timeout_secs, unit)
            .await;
        if is_sensor_failure(temperature) {
            warn!("sensor {} did not answer", hardware.sensor_id);
        } else {
            info!("{}: {temperature:.2}{}", hardware.sensor_label, unit.as_str());
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive()));

    match logging.log_file() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}
