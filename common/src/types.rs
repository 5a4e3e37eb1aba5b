use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reading reported when the sensor could not be read in time.
pub const SENSOR_FAILURE_TEMP: f64 = -273.0;

/// Start/end pair marking the manual (non-timed) set-point row.
pub const ALWAYS_ON_START: &str = "00:00";
pub const ALWAYS_ON_END: &str = "00:00";

pub fn is_sensor_failure(temperature: f64) -> bool {
    temperature <= SENSOR_FAILURE_TEMP
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ThermostatMode {
    Off,
    Manual,
    Timed,
    Predictive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ForceOff,
    Regulate,
    Idle,
}

impl ThermostatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Manual => "MANUAL",
            Self::Timed => "TIMED",
            Self::Predictive => "PREDICTIVE",
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Manual => 1,
            Self::Timed => 2,
            Self::Predictive => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Manual),
            2 => Some(Self::Timed),
            3 => Some(Self::Predictive),
            _ => None,
        }
    }

    /// Parses a stored mode value; anything unrecognized falls back to manual.
    pub fn from_setting(raw: &str) -> Self {
        raw.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_u8)
            .unwrap_or(Self::Manual)
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }

    // Timed and predictive are accepted but have no behavior yet.
    pub fn control_action(self) -> ControlAction {
        match self {
            Self::Off => ControlAction::ForceOff,
            Self::Manual => ControlAction::Regulate,
            Self::Timed | Self::Predictive => ControlAction::Idle,
        }
    }
}

impl From<ThermostatMode> for u8 {
    fn from(mode: ThermostatMode) -> Self {
        mode.as_u8()
    }
}

impl TryFrom<u8> for ThermostatMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("unknown thermostat mode {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }

    pub fn from_setting(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "F" => Self::Fahrenheit,
            _ => Self::Celsius,
        }
    }

    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Heating state as observed on the two relay outputs.
///
/// Exactly one output pattern means OFF: relay 1 low with relay 2 high. Every other
/// pattern, including ones the hardware should never produce, reads as ON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn from_outputs(relay_1_high: bool, relay_2_high: bool) -> Self {
        if !relay_1_high && relay_2_high {
            Self::Off
        } else {
            Self::On
        }
    }

    pub fn outputs(self) -> (bool, bool) {
        match self {
            Self::On => (true, true),
            Self::Off => (false, true),
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl From<RelayState> for bool {
    fn from(state: RelayState) -> Self {
        state.is_on()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub dwell_seconds: u64,
    pub temperature: f64,
    pub unit: TemperatureUnit,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Unix seconds.
    pub datetime: i64,
    pub temperature: f64,
    pub unit: TemperatureUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub relay_state: RelayState,
    pub switch_mode: ThermostatMode,
    pub set_point: f64,
    pub current_temperature: f64,
    pub unit: TemperatureUnit,
    pub history: Vec<HistoryPoint>,
}
