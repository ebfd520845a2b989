pub mod error;
pub mod generator;
pub mod orchestrator;

pub use error::ServiceError;
pub use generator::{OpenAiGenerator, Prompt, TextGenerator};
pub use orchestrator::{
    AiOrchestrator, DocumentSelection, GuidanceOutcome, GuidanceStatus, OrchestratorSettings,
    UNAVAILABLE_ADVISORY, UNCONFIGURED_ADVISORY,
};
