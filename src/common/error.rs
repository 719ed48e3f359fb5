use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

/// Errors raised by a navigation server adapter before any acknowledgement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavigationError {
    #[error("navigation service unavailable")]
    ServiceUnavailable,

    #[error("transport failure: {0}")]
    TransportFailure(String),
}

/// Why a dispatch attempt ended without reaching the goal.
///
/// Every variant is handled the same way by the sequencer: the cursor is held
/// and the same waypoint is dispatched again on a later tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    SendFailed(String),
    Rejected,
    Aborted,
    Canceled,
    ResultLost,
    Stalled { after: Duration },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SendFailed(detail) => write!(f, "send failed ({})", detail),
            FailureReason::Rejected => write!(f, "rejected"),
            FailureReason::Aborted => write!(f, "aborted"),
            FailureReason::Canceled => write!(f, "canceled"),
            FailureReason::ResultLost => write!(f, "result channel closed"),
            FailureReason::Stalled { after } => write!(f, "stalled after {:?}", after),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
