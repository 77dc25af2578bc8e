use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlindsError {
    #[error("device error: {0}")]
    Device(String),
    #[error("device offline: {0}")]
    Offline(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("device change feed closed")]
    FeedClosed,
    #[error("move did not settle within {0} ms")]
    RunTimeout(u64),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing device")]
    MissingDevice,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
