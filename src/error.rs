//! Error types for the analysis pipeline.
//!
//! Every component converts these into a stage-local fallback value before
//! returning to the pipeline controller; none of them reach the caller of
//! [`crate::analysis::pipeline::Pipeline::run`].

use thiserror::Error;

/// Failure of a single chat-completion call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Network failure, including a timed-out request.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-2xx status. `body` is kept for diagnostics.
    #[error("endpoint returned status {status}: {body}")]
    NonSuccessStatus { status: u16, body: String },
    /// The response decoded but did not carry a generated message.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Failure of a single search call. Never escapes the search client.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport error: {0}")]
    Transport(String),
    #[error("search endpoint returned status {0}")]
    NonSuccessStatus(u16),
    #[error("malformed search response: {0}")]
    MalformedResponse(String),
    #[error("search capability is not configured")]
    Disabled,
}

/// Failure inside an analysis stage before it falls back.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no key events found")]
    ExtractionEmpty,
}

/// Failure to build an [`crate::config::AnalystConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
