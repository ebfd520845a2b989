//! devguide Docs
//!
//! Loads the guideline documents from disk and provides the token
//! heuristics used to size responses.

pub mod loader;
pub mod tokens;

pub use loader::{DocumentLibrary, DocumentLoader, DocumentSources};
pub use tokens::{ContentStats, TokenOptimizer, TokenReport};
