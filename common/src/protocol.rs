//! Control messages exchanged with the remote client.
//!
//! A request is a JSON object `{"name": ..., "action": "get"|"set", "value": ...}`.
//! Anything that does not validate is dropped: the caller gets a [`Rejection`]
//! for logging and the client gets no reply.

use serde_json::{Map, Value};

use crate::{error::Rejection, types::ThermostatMode};

pub const NAME_THERMO_STATE: &str = "thermo_state";
pub const NAME_THERMO_SWITCH: &str = "thermo_switch";
pub const NAME_THERMO_TEMPERATURE: &str = "thermo_temperature";
pub const NAME_TEMPERATURE_HISTORY: &str = "temperature_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestName {
    RelayState,
    SwitchMode,
    SetPoint,
    TemperatureHistory,
}

impl RequestName {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            NAME_THERMO_STATE => Some(Self::RelayState),
            NAME_THERMO_SWITCH => Some(Self::SwitchMode),
            NAME_THERMO_TEMPERATURE => Some(Self::SetPoint),
            NAME_TEMPERATURE_HISTORY => Some(Self::TemperatureHistory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RelayState => NAME_THERMO_STATE,
            Self::SwitchMode => NAME_THERMO_SWITCH,
            Self::SetPoint => NAME_THERMO_TEMPERATURE,
            Self::TemperatureHistory => NAME_TEMPERATURE_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub name: RequestName,
    pub action: Action,
    pub value: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Query,
    SetSwitchMode(ThermostatMode),
    SetSetPoint(f64),
}

/// Validates a raw message. Checks run in a fixed order and the first failure wins.
pub fn parse_request(raw: &str) -> Result<Request, Rejection> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| Rejection::InvalidJson(err.to_string()))?;

    let object = match value {
        Value::Object(object) => object,
        Value::Array(items) if items.is_empty() => return Err(Rejection::Empty),
        _ => return Err(Rejection::NotAnObject),
    };
    if object.is_empty() {
        return Err(Rejection::Empty);
    }

    let name = match object.get("name") {
        Some(Value::String(name)) => name.as_str(),
        _ => return Err(Rejection::MissingName),
    };
    let name = RequestName::parse(name).ok_or_else(|| Rejection::UnknownName(name.to_string()))?;

    let action = match object.get("action") {
        Some(Value::String(action)) if action == "get" => Action::Get,
        Some(Value::String(action)) if action == "set" => Action::Set,
        None if name == RequestName::RelayState => Action::Get,
        Some(Value::String(action)) => return Err(Rejection::InvalidAction(Some(action.clone()))),
        Some(other) => return Err(Rejection::InvalidAction(Some(other.to_string()))),
        None => return Err(Rejection::InvalidAction(None)),
    };

    let value = text_field(&object, "value");
    if action == Action::Set && value.as_deref().map_or(true, str::is_empty) {
        return Err(Rejection::EmptyValue);
    }

    Ok(Request {
        name,
        action,
        value,
        start: text_field(&object, "start"),
        end: text_field(&object, "end"),
    })
}

impl Request {
    pub fn command(&self) -> Result<Command, Rejection> {
        if self.action == Action::Get {
            return Ok(Command::Query);
        }
        let raw = self.value.as_deref().unwrap_or_default();

        match self.name {
            RequestName::SwitchMode => raw
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(ThermostatMode::from_u8)
                .map(Command::SetSwitchMode)
                .ok_or_else(|| self.invalid_value(raw)),
            RequestName::SetPoint => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|set_point| set_point.is_finite())
                .map(Command::SetSetPoint)
                .ok_or_else(|| self.invalid_value(raw)),
            RequestName::RelayState | RequestName::TemperatureHistory => Ok(Command::Query),
        }
    }

    fn invalid_value(&self, raw: &str) -> Rejection {
        Rejection::InvalidValue {
            name: self.name.as_str(),
            value: raw.to_string(),
        }
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
