//! Service error types.

use ratewatch_fx::FxError;
use thiserror::Error;

use crate::state::ServiceState;

/// Errors raised while configuring or running the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service cannot start from state {0:?}")]
    InvalidState(ServiceState),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Fx(#[from] FxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
