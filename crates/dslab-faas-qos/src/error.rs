//! Error types.

use thiserror::Error;

/// Invalid or contradictory simulation parameters. Reported before any event is scheduled.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid {name} process: {reason}")]
    InvalidProcess { name: &'static str, reason: String },
    #[error("expiration threshold must be non-negative, got {0}")]
    NegativeExpirationThreshold(f64),
    #[error("exactly one of max_time and max_requests must be set")]
    AmbiguousTermination,
    #[error("invalid termination bound: {0}")]
    InvalidTermination(String),
    #[error("capacity bound must be positive")]
    ZeroCapacity,
    #[error("unknown routing policy: {0}")]
    UnknownRoutingPolicy(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimelineError {
    #[error("event timeline is empty")]
    Empty,
}

/// Errors returned by [`crate::simulation::ServerlessSimulator`].
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The timeline ran out of events before the termination bound, which means a scheduling bug.
    #[error("event timeline emptied at time {time:.3} before the termination bound was reached")]
    TimelineUnderflow { time: f64 },
}
