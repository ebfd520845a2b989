use crate::GuidelineError;

/// A validated custom-guidance request. Lives for the duration of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationRequest {
    query: String,
    context: Option<String>,
}

impl OrchestrationRequest {
    /// Validate caller input. A blank query is rejected; a blank context is dropped.
    pub fn new(query: impl Into<String>, context: Option<String>) -> Result<Self, GuidelineError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(GuidelineError::Misuse(
                "'query' parameter is required and must not be empty".to_string(),
            ));
        }

        let context = context.filter(|c| !c.trim().is_empty());
        Ok(Self { query, context })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}
