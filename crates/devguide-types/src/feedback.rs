use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One logged observation of a served operation. Never edited once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub arguments: Value,
    pub response_size: usize,
    pub tokens: usize,
    pub elapsed_ms: f64,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: Value,
}

/// Input for a single feedback record
#[derive(Debug, Clone)]
pub struct RecordCall {
    pub operation: String,
    pub arguments: Value,
    pub response_size: usize,
    pub tokens: usize,
    pub elapsed_ms: f64,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: Value,
}

impl RecordCall {
    pub fn new(operation: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation: operation.into(),
            arguments,
            response_size: 0,
            tokens: 0,
            elapsed_ms: 0.0,
            success: true,
            error: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_response(mut self, response_size: usize, tokens: usize) -> Self {
        self.response_size = response_size;
        self.tokens = tokens;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: f64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stamp the record with a fresh id and the current time
    pub fn into_record(self) -> FeedbackRecord {
        FeedbackRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            operation: self.operation,
            arguments: self.arguments,
            response_size: self.response_size,
            tokens: self.tokens,
            elapsed_ms: self.elapsed_ms,
            success: self.success,
            error: self.error,
            metadata: self.metadata,
        }
    }
}

/// A rating left by an agent about a tool response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub helpful: Option<bool>,
}

/// Equality filters for feedback analytics
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    pub operation: Option<String>,
    pub success: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl FeedbackFilter {
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
