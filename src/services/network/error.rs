use std::{io, time::Duration};
use thiserror::Error;

/// Result type alias for network configuration operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors returned by the network managers and the facade
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A precondition failed before any command ran
    #[error("{0}")]
    InvalidInput(String),

    /// The external tool ran and reported a failure
    #[error("{0}")]
    CommandFailure(String),

    /// The external tool could not be started at all
    #[error("failed to launch {program}: {source}")]
    LaunchFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The command exceeded its budget
    #[error("{}", timeout_message(.budget, .indeterminate))]
    Timeout {
        budget: Duration,
        /// Set when the timed out process could not be terminated
        indeterminate: bool,
    },
}

impl NetworkError {
    /// Stable category name used on the HTTP boundary
    pub fn category(&self) -> &'static str {
        match self {
            NetworkError::InvalidInput(_) => "invalidInput",
            NetworkError::CommandFailure(_) => "commandFailure",
            NetworkError::LaunchFailure { .. } => "launchFailure",
            NetworkError::Timeout { .. } => "timeout",
        }
    }
}

fn timeout_message(budget: &Duration, indeterminate: &bool) -> String {
    if *indeterminate {
        format!(
            "command timed out after {}s and could not be terminated, outcome is indeterminate",
            budget.as_secs()
        )
    } else {
        format!("command timed out after {}s", budget.as_secs())
    }
}
