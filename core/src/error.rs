//! Error types for msg-bench-core

use thiserror::Error;

use crate::driver::DriverError;

/// Core error type surfaced to the coordinator.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A driver is already initialized on this worker
    #[error("driver already initialized")]
    DriverAlreadyInitialized,

    /// The operation requires an initialized driver
    #[error("no driver initialized")]
    DriverNotInitialized,

    /// The driver identifier is not present in the registry
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    /// An existing topic named in the workload could not be found
    #[error("topic specified in workload does not exist: {0}")]
    TopicDoesNotExist(String),

    /// Error reported by the driver
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
