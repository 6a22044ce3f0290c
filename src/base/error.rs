use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which of the independent timeout budgets expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutDomain {
    /// Waiting for the transport to open a response.
    Request,
    /// A live stream went quiet.
    Stream,
    /// A drain loop received nothing.
    Drain,
    /// A caller-supplied deadline on `wait_timeout`.
    Await,
}

impl fmt::Display for TimeoutDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeoutDomain::Request => "request",
            TimeoutDomain::Stream => "stream inactivity",
            TimeoutDomain::Drain => "drain",
            TimeoutDomain::Await => "await",
        };
        f.write_str(name)
    }
}

/// The uniform failure value of the request pipeline.
///
/// Every internal failure converts into this type at the executor
/// boundary; awaiting a promise yields either a complete response or one
/// of these, never a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Dispatch or connection-level failure reported by the transport.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Unexpected or malformed correlated delivery.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// One of the independent timeout budgets expired.
    #[error("{domain} budget of {after:?} exceeded")]
    Timeout {
        domain: TimeoutDomain,
        after: Duration,
    },

    /// The request was cancelled through its abort controller, or its
    /// unit of work was cancelled outright.
    #[error("request aborted")]
    Aborted,

    /// The spawned unit of work panicked; observed at retrieval.
    #[error("request worker crashed: {0}")]
    Crashed(String),
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        FetchError::Transport(err.to_string())
    }
}
