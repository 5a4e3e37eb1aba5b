use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("request is not a JSON object")]
    NotAnObject,
    #[error("empty request")]
    Empty,
    #[error("request has no 'name'")]
    MissingName,
    #[error("unrecognized request name '{0}'")]
    UnknownName(String),
    #[error("invalid action {0:?}")]
    InvalidAction(Option<String>),
    #[error("'set' requires a non-empty value")]
    EmptyValue,
    #[error("invalid value '{value}' for '{name}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
}
