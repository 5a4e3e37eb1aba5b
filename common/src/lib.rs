pub mod config;
pub mod control;
pub mod error;
pub mod history;
pub mod protocol;
pub mod types;

pub use config::{BoilerConfig, HardwareConfig};
pub use control::{relay_decision, should_record, until_next_minute, DwellCounter, TICK_DURATION};
pub use error::{ConfigError, Rejection};
pub use history::HistoryRange;
pub use protocol::{parse_request, Action, Command, Request, RequestName};
pub use types::{
    ControlAction, HistoryPoint, RelayState, Sample, StateSnapshot, TemperatureUnit,
    ThermostatMode, SENSOR_FAILURE_TEMP,
};
