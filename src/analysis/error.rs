use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Ways a single analysis call can fail. None of them are retried.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Could not reach the analysis service: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error. The message is shown to the user
    /// verbatim, so it may be empty.
    #[error("{message}")]
    Service { status: Option<u16>, message: String },

    #[error("No response received from the analysis service.")]
    EmptyResponse,

    #[error("AI response was not valid JSON. Please try again.")]
    InvalidFormat { raw: String, reason: String },
}

impl AnalysisError {
    /// True for the network and service failures, as opposed to problems
    /// with what the model produced.
    pub fn is_upstream(&self) -> bool {
        matches!(self, AnalysisError::Transport(_) | AnalysisError::Service { .. })
    }
}

/// The model produced parseable JSON that does not match the requested
/// shape. Reported for observability; the partial result is still used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("model response deviated from the expected schema: {}", issues.join("; "))]
pub struct SchemaDeviation {
    pub issues: Vec<String>,
}
