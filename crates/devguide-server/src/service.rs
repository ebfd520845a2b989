//! Guideline operations shared by the protocol handlers
//!
//! Every served call is timed, sized with the token heuristic and appended
//! to the feedback log exactly once, whether it succeeds or not.

use crate::context::AppContext;
use devguide_cache::CacheInfo;
use devguide_persistence::FeedbackSummary;
use devguide_provider::DocumentSelection;
use devguide_types::{
    CacheFormat, DocumentName, GuidelineError, OrchestrationRequest, RecordCall, Result,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct GuidelinesService {
    context: Arc<AppContext>,
}

impl GuidelinesService {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Serve one guideline document through the configured delivery format
    pub async fn get_document(&self, name: DocumentName) -> Result<String> {
        let started = Instant::now();
        let call = RecordCall::new(name.tool_name(), json!({}));
        let result = self.fetch(name).await;
        self.finish(call, started, result).await
    }

    /// Serve a `guidelines://` resource
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let started = Instant::now();
        let call = RecordCall::new("read_resource", json!({ "uri": uri }));
        let result = match DocumentName::from_uri(uri) {
            Ok(name) => self.fetch(name).await,
            Err(e) => Err(e),
        };
        self.finish(call, started, result).await
    }

    /// Orchestrated answer to a free-form query.
    ///
    /// A blank query is rejected before anything is sent out. Service
    /// failures come back as advisory text and are logged as failed calls.
    pub async fn custom_guidance(&self, query: String, context: Option<String>) -> Result<String> {
        let started = Instant::now();
        let call = RecordCall::new(
            "get_custom_guidance",
            json!({ "query": &query, "context": &context }),
        );

        let request = match OrchestrationRequest::new(query, context) {
            Ok(request) => request,
            Err(e) => return self.finish(call, started, Err(e)).await,
        };

        let outcome = self
            .context
            .orchestrator
            .get_custom_guidance(&request, &self.context.library)
            .await;

        let mut call = call
            .with_response(outcome.text.len(), self.context.optimizer.estimate(&outcome.text))
            .with_elapsed_ms(elapsed_ms(started))
            .with_metadata(json!({ "status": outcome.status_label() }));
        if let Some(error) = outcome.error() {
            call = call.failed(error);
        }
        self.context.feedback.record(call).await;

        Ok(outcome.text)
    }

    /// Which documents a task description needs
    pub async fn select_documents(&self, description: &str) -> DocumentSelection {
        let started = Instant::now();
        let selection = self.context.orchestrator.analyze_request(description).await;
        let call = RecordCall::new("analyze_request", json!({ "description": description }))
            .with_elapsed_ms(elapsed_ms(started))
            .with_metadata(json!({ "selection": selection }));
        self.context.feedback.record(call).await;
        selection
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.context.cache.cache_info().await
    }

    pub async fn feedback_summary(&self, days: i64) -> Result<FeedbackSummary> {
        self.context
            .feedback
            .summary(days)
            .await
            .map_err(|e| GuidelineError::Storage(e.to_string()))
    }

    /// Optimized document text and the encoding it was actually served from
    async fn fetch(&self, name: DocumentName) -> Result<(String, CacheFormat)> {
        let encoded = self
            .context
            .cache
            .get(name, self.context.delivery_format)
            .await?;
        let text = devguide_cache::decode(&encoded)?;
        Ok((self.context.optimizer.optimize(&text), encoded.format))
    }

    /// Log a document call and hand back its text
    async fn finish(
        &self,
        call: RecordCall,
        started: Instant,
        result: Result<(String, CacheFormat)>,
    ) -> Result<String> {
        let call = call.with_elapsed_ms(elapsed_ms(started));
        let (call, result) = match result {
            Ok((text, format)) => {
                debug!("Served {} ({} bytes, {})", call.operation, text.len(), format);
                let call = call
                    .with_response(text.len(), self.context.optimizer.estimate(&text))
                    .with_metadata(json!({ "format": format }));
                (call, Ok(text))
            }
            Err(e) => {
                warn!("{} failed: {}", call.operation, e);
                (call.failed(e.to_string()), Err(e))
            }
        };
        self.context.feedback.record(call).await;
        result
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
