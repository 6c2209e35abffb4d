use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("no sensor reading received yet")]
    NoReading,
    #[error("sensor reading is stale ({age_secs}s old)")]
    Stale { age_secs: u64 },
    #[error("invalid sensor reading: {0}")]
    Invalid(String),
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8")]
    NotUtf8,
    #[error("unknown operating mode '{0}'")]
    UnknownMode(String),
    #[error("invalid target temperature '{0}'")]
    InvalidTarget(String),
    #[error("unknown switch payload '{0}'")]
    InvalidSwitch(String),
    #[error("no command handler for topic '{0}'")]
    UnknownTopic(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed runtime config: {0}")]
    Parse(#[from] serde_json::Error),
}
