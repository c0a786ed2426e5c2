use thiserror::Error;

/// Failures that can cross the pipeline's internal seams.
///
/// None of these escape the orchestrator: each one resolves into a state
/// transition and, at most, one user notification.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not load image from {address}: {reason}")]
    ImageDecode { address: String, reason: String },

    #[error("color extraction failed: {0}")]
    Extraction(String),

    #[error("invalid extraction options: {0}")]
    InvalidOptions(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn decode(address: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::ImageDecode {
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Storage(e.to_string())
    }
}
