//! devguide Types - Core types shared by every devguide crate
//!
//! Documents, their encodings, feedback records and the error taxonomy.

mod document;
mod error;
mod feedback;
mod request;

pub use document::{CacheFormat, Document, DocumentName};
pub use error::{GuidelineError, Result};
pub use feedback::{FeedbackFilter, FeedbackRecord, RecordCall, UserFeedback};
pub use request::OrchestrationRequest;
