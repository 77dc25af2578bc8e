use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device offline")]
    Offline,
    #[error("device timeout")]
    Timeout,
    #[error("unknown data-point {0}")]
    UnknownDataPoint(String),
    #[error("invalid value {value} for data-point {dp}")]
    InvalidValue { dp: String, value: String },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
