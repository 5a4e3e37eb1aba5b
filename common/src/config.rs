use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ConfigError,
    types::{TemperatureUnit, ThermostatMode},
};

/// Minimum time between two re-reads of the configuration file.
pub const CONFIG_REFRESH_SECS: u64 = 60;

pub const KEY_THERMO_SWITCH: &str = "thermo_switch";
pub const KEY_TEMP_RECORD_INTERVAL: &str = "temp_record_interval";
pub const KEY_TEMP_UNITS: &str = "temp_units";

pub const WRITABLE_KEYS: [&str; 3] = [KEY_THERMO_SWITCH, KEY_TEMP_RECORD_INTERVAL, KEY_TEMP_UNITS];

pub const DEFAULT_RECORD_INTERVAL_MINUTES: u32 = 30;

pub const CONFIG_PATH_ENV: &str = "BOILER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./boiler.json";

pub const LOG_TO_STDOUT: &str = "stdout";

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9741,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub id: Option<String>,
    pub timeout_secs: u64,
    pub base_path: String,
    pub label: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            id: None,
            timeout_secs: 10,
            base_path: "/sys/bus/w1/devices".to_string(),
            label: "sensor_1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub relay_1: Option<u32>,
    pub relay_2: Option<u32>,
    pub base_path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_1: None,
            relay_2: None,
            base_path: "/sys/class/gpio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: String,
    pub default_set_point: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "./boiler.db".to_string(),
            default_set_point: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `stdout`, or a file the log lines are appended to.
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: LOG_TO_STDOUT.to_string(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive for the configured level. Accepts both tracing
    /// level names and the CRITICAL/WARNING/FINE/FINER/FINEST vocabulary.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => "error",
            "warning" | "warn" => "warn",
            "fine" | "debug" => "debug",
            "finer" | "finest" | "trace" => "trace",
            _ => "info",
        }
    }

    pub fn log_file(&self) -> Option<&Path> {
        let file = self.file.trim();
        if file.is_empty() || file.eq_ignore_ascii_case(LOG_TO_STDOUT) {
            None
        } else {
            Some(Path::new(file))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoilerConfig {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
    pub relay: RelayConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub thermostat: BTreeMap<String, Value>,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sensor: SensorConfig::default(),
            relay: RelayConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            timezone: "UTC".to_string(),
            thermostat: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    pub sensor_id: String,
    pub sensor_label: String,
    pub sensor_timeout_secs: u64,
    pub relay_1: u32,
    pub relay_2: u32,
}

impl BoilerConfig {
    pub fn hardware(&self) -> Result<HardwareConfig, ConfigError> {
        let sensor_id = self
            .sensor
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let mut missing = Vec::new();
        if sensor_id.is_none() {
            missing.push("sensor.id");
        }
        if self.relay.relay_1.is_none() {
            missing.push("relay.relay_1");
        }
        if self.relay.relay_2.is_none() {
            missing.push("relay.relay_2");
        }

        match (sensor_id, self.relay.relay_1, self.relay.relay_2) {
            (Some(sensor_id), Some(relay_1), Some(relay_2)) => Ok(HardwareConfig {
                sensor_id: sensor_id.to_string(),
                sensor_label: self.sensor.label.clone(),
                sensor_timeout_secs: self.sensor.timeout_secs,
                relay_1,
                relay_2,
            }),
            _ => Err(ConfigError::MissingRequired(missing)),
        }
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        match self.thermostat.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn switch_mode(&self) -> ThermostatMode {
        self.setting(KEY_THERMO_SWITCH)
            .map(|raw| ThermostatMode::from_setting(&raw))
            .unwrap_or(ThermostatMode::Manual)
    }

    /// Recording interval in minutes, or `None` when recording is disabled.
    pub fn record_interval(&self) -> Option<u32> {
        match self.setting(KEY_TEMP_RECORD_INTERVAL) {
            None => Some(DEFAULT_RECORD_INTERVAL_MINUTES),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .and_then(|minutes| u32::try_from(minutes).ok()),
        }
    }

    pub fn units(&self) -> TemperatureUnit {
        self.setting(KEY_TEMP_UNITS)
            .map(|raw| TemperatureUnit::from_setting(&raw))
            .unwrap_or_default()
    }

    pub fn is_writable(key: &str) -> bool {
        WRITABLE_KEYS.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn with_thermostat(entries: Value) -> BoilerConfig {
        serde_json::from_value(json!({ "thermostat": entries })).unwrap()
    }

    #[test]
    fn defaults_apply_to_missing_sections() {
        let config: BoilerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.port, 9741);
        assert_eq!(config.sensor.timeout_secs, 10);
        assert_eq!(config.switch_mode(), ThermostatMode::Manual);
        assert_eq!(config.record_interval(), Some(30));
        assert_eq!(config.units(), TemperatureUnit::Celsius);
    }

    #[test]
    fn settings_accept_strings_and_numbers() {
        let config = with_thermostat(json!({
            "thermo_switch": 0,
            "temp_record_interval": "15",
            "temp_units": "f",
        }));
        assert_eq!(config.switch_mode(), ThermostatMode::Off);
        assert_eq!(config.record_interval(), Some(15));
        assert_eq!(config.units(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn bad_record_interval_disables_recording() {
        for raw in [json!("0"), json!(-5), json!("ten"), json!("")] {
            let config = with_thermostat(json!({ "temp_record_interval": raw }));
            assert_eq!(config.record_interval(), None, "{raw}");
        }
    }

    #[test]
    fn malformed_switch_defaults_to_manual() {
        let config = with_thermostat(json!({ "thermo_switch": "on" }));
        assert_eq!(config.switch_mode(), ThermostatMode::Manual);
    }

    #[test]
    fn hardware_reports_every_missing_key() {
        let config = BoilerConfig::default();
        assert_eq!(
            config.hardware(),
            Err(ConfigError::MissingRequired(vec![
                "sensor.id",
                "relay.relay_1",
                "relay.relay_2"
            ]))
        );
    }

    #[test]
    fn hardware_resolves_when_complete() {
        let config: BoilerConfig = serde_json::from_value(json!({
            "sensor": { "id": "28-0000075a1c3b" },
            "relay": { "relay_1": 17, "relay_2": 27 },
        }))
        .unwrap();

        assert_eq!(
            config.hardware(),
            Ok(HardwareConfig {
                sensor_id: "28-0000075a1c3b".to_string(),
                sensor_label: "sensor_1".to_string(),
                sensor_timeout_secs: 10,
                relay_1: 17,
                relay_2: 27,
            })
        );
    }

    #[test]
    fn blank_sensor_id_counts_as_missing() {
        let config: BoilerConfig = serde_json::from_value(json!({
            "sensor": { "id": "  " },
            "relay": { "relay_1": 17, "relay_2": 27 },
        }))
        .unwrap();
        assert_eq!(
            config.hardware(),
            Err(ConfigError::MissingRequired(vec!["sensor.id"]))
        );
    }

    #[test]
    fn log_levels_map_to_filter_directives() {
        let directive = |level: &str| {
            LoggingConfig {
                level: level.to_string(),
                ..LoggingConfig::default()
            }
            .filter_directive()
        };
        assert_eq!(directive("CRITICAL"), "error");
        assert_eq!(directive("WARNING"), "warn");
        assert_eq!(directive("info"), "info");
        assert_eq!(directive("FINE"), "debug");
        assert_eq!(directive("FINEST"), "trace");
        assert_eq!(directive("loud"), "info");
    }

    #[test]
    fn logs_go_to_stdout_unless_a_file_is_named() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.file, "stdout");
        assert_eq!(logging.log_file(), None);

        let config: BoilerConfig =
            serde_json::from_value(json!({ "logging": { "file": "/var/log/boiler.log" } }))
                .unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.logging.log_file(),
            Some(Path::new("/var/log/boiler.log"))
        );

        let logging = LoggingConfig {
            file: "STDOUT".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(logging.log_file(), None);
    }

    #[test]
    fn only_thermostat_settings_are_writable() {
        assert!(BoilerConfig::is_writable("thermo_switch"));
        assert!(!BoilerConfig::is_writable("sensor_1_id"));
    }
}
