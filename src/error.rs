//! Fleet manager error abstractions.

use thiserror::Error;

// Error messages.
pub const ERR_ITER_FAILURE: &str = "error returned during key/value iteration from database";
pub const ERR_DB_FLUSH: &str = "error flushing database state";
pub const ERR_DECODE_CLUSTER: &str = "error decoding cluster from storage";
pub const ERR_DECODE_KAFKA: &str = "error decoding kafka request from storage";

/// Application error variants.
#[derive(Debug, Error)]
pub enum AppError {
    /// The given input was invalid.
    #[error("validation error: {0}")]
    InvalidInput(String),
    /// The target resource does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// The caller is not allowed to perform the requested action.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The requested instance type is not part of the supported instance types configuration.
    #[error("instance type not supported: {0}")]
    InstanceTypeNotSupported(String),
    /// The requested size is not defined for the given instance type.
    #[error("instance plan not supported: {0}")]
    InstancePlanNotSupported(String),
    /// The fleet, region or caller has no capacity left for the request.
    #[error("too many kafka instances: {0}")]
    TooManyInstances(String),
    /// The quota subsystem denied the request.
    #[error("insufficient quota: {0}")]
    QuotaExceeded(String),
    /// The server has hit an internal error, but will remain online.
    #[error("internal server error")]
    Ise(anyhow::Error),
}

impl AppError {
    /// Translate the given error into an app error, keeping typed variants intact.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        err.downcast::<Self>().unwrap_or_else(Self::Ise)
    }
}

/// The error type used to indicate that a system shutdown is required.
#[derive(Debug, thiserror::Error)]
#[error("fatal error: {0}")]
pub struct ShutdownError(#[from] pub anyhow::Error);

/// A result type where the error is a `ShutdownError`.
pub type ShutdownResult<T> = ::std::result::Result<T, ShutdownError>;
