//! Error types for re-engagement.
//!
//! None of these are fatal to the service: a bad member record is skipped by
//! the aggregator, and a failed nudge is reported for that member only.

/// A member record that cannot be classified.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The record carries no last-active timestamp at all.
    #[error("member '{member_id}' has no last-active timestamp")]
    MissingLastActive { member_id: String },

    /// The last-active timestamp is not valid RFC 3339.
    #[error("member '{member_id}' has an invalid last-active timestamp '{value}': {source}")]
    InvalidLastActive {
        member_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A bare timestamp that is not valid RFC 3339.
    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Failure while requesting a generated nudge.
#[derive(Debug, thiserror::Error)]
pub enum NudgeError {
    /// The request is missing required fields.
    #[error("{0}")]
    Validation(String),

    /// The agent server could not be reached or timed out.
    #[error("agent server unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The agent server answered with a non-success status.
    #[error("agent server responded with {status}")]
    Upstream { status: u16 },

    /// The agent server's body did not match the expected shape.
    #[error("malformed nudge response: {0}")]
    Decode(String),
}

/// An environment variable holds a value that cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid tier policy: {0}")]
    InvalidPolicy(String),
}
