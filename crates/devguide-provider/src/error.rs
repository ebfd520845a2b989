use std::time::Duration;
use thiserror::Error;

/// Failures of the external text-generation call.
///
/// These never leave the orchestrator: they are turned into advisory text
/// and recorded as failed feedback.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Text generation API error: {0}")]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("Text generation returned an empty response")]
    EmptyResponse,

    #[error("Invalid generation request: {0}")]
    Request(String),
}
