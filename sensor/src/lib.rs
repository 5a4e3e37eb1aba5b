//! Temperature sensor access for the boiler controller.

mod ds18b20;

use async_trait::async_trait;
use boiler_common::TemperatureUnit;

pub use ds18b20::{parse_w1_slave, Ds18b20, W1Reading, RETRY_INTERVAL};

/// Reads never fail outright: a sensor that does not answer in time yields
/// [`boiler_common::SENSOR_FAILURE_TEMP`].
#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    async fn read(&self, sensor_id: &str, timeout_secs: u64, unit: TemperatureUnit) -> f64;
}
