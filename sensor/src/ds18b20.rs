use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use boiler_common::{TemperatureUnit, SENSOR_FAILURE_TEMP};
use tracing::{debug, trace, warn};

use crate::TemperatureSensor;

pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Reads allowed within `timeout_secs`, one every [`RETRY_INTERVAL`]. Always at least one.
pub fn max_attempts(timeout_secs: u64) -> u64 {
    timeout_secs.saturating_mul(2).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum W1Reading {
    /// Temperature in millidegrees Celsius.
    Ready(i64),
    /// CRC line did not end in `YES`; the conversion is not usable yet.
    Pending,
    Malformed,
}

/// Parses the kernel's one-wire dump:
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(contents: &str) -> W1Reading {
    let mut lines = contents.lines();
    let Some(status) = lines.next() else {
        return W1Reading::Pending;
    };
    if !status.trim_end().ends_with("YES") {
        return W1Reading::Pending;
    }

    let Some(data) = lines.next() else {
        return W1Reading::Malformed;
    };
    match data.find("t=") {
        Some(index) => data[index + 2..]
            .trim()
            .parse::<i64>()
            .map(W1Reading::Ready)
            .unwrap_or(W1Reading::Malformed),
        None => W1Reading::Malformed,
    }
}

#[derive(Debug, Clone)]
pub struct Ds18b20 {
    base_path: PathBuf,
    retry_interval: Duration,
}

impl Ds18b20 {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            retry_interval: RETRY_INTERVAL,
        }
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn slave_path(&self, sensor_id: &str) -> PathBuf {
        self.base_path.join(sensor_id).join("w1_slave")
    }

    /// Polls `read_once` until it yields a ready dump or `attempts` runs out,
    /// sleeping the retry interval between attempts. Returns millidegrees Celsius.
    async fn poll<F, Fut>(&self, sensor_id: &str, attempts: u64, mut read_once: F) -> Option<i64>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = io::Result<String>> + Send,
    {
        for attempt in 0..attempts {
            match read_once().await {
                Ok(contents) => match parse_w1_slave(&contents) {
                    W1Reading::Ready(millis) => return Some(millis),
                    W1Reading::Pending => trace!("sensor {sensor_id} not ready on attempt {attempt}"),
                    W1Reading::Malformed => {
                        debug!("sensor {sensor_id} returned malformed data on attempt {attempt}")
                    }
                },
                Err(err) => debug!("failed to read sensor {sensor_id}: {err}"),
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }
        None
    }
}

#[async_trait]
impl TemperatureSensor for Ds18b20 {
    async fn read(&self, sensor_id: &str, timeout_secs: u64, unit: TemperatureUnit) -> f64 {
        let path = self.slave_path(sensor_id);
        let attempts = max_attempts(timeout_secs);

        match self
            .poll(sensor_id, attempts, || tokio::fs::read_to_string(&path))
            .await
        {
            Some(millis) => {
                let temperature = unit.from_celsius(millis as f64 / 1000.0);
                debug!(
                    "sensor {sensor_id} measured {temperature:.3}{}",
                    unit.as_str()
                );
                temperature
            }
            None => {
                warn!("sensor {sensor_id} failed to read temperature within {timeout_secs} seconds");
                SENSOR_FAILURE_TEMP
            }
        }
    }
}
