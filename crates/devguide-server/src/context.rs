//! Process-wide state, built once at startup and handed to the handlers

use crate::config::Config;
use anyhow::Result;
use devguide_cache::CacheManager;
use devguide_docs::{DocumentLibrary, DocumentLoader, TokenOptimizer};
use devguide_persistence::FeedbackCollector;
use devguide_provider::AiOrchestrator;
use devguide_types::CacheFormat;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub server_name: String,
    pub version: String,
    pub library: Arc<DocumentLibrary>,
    pub cache: CacheManager,
    pub optimizer: TokenOptimizer,
    pub feedback: FeedbackCollector,
    pub orchestrator: AiOrchestrator,
    /// Encoding documents are fetched through before being served as text
    pub delivery_format: CacheFormat,
}

impl AppContext {
    /// Load documents, open the feedback store and pick the orchestrator state
    pub async fn initialize(config: &Config) -> Result<Self> {
        let loader = DocumentLoader::new(config.document_sources());
        let library = Arc::new(DocumentLibrary::load_all(&loader).await?);

        let mut cache = CacheManager::new(library.clone(), config.server.version.clone());
        if let Some(dir) = config.cache_dir() {
            cache = cache.with_dir(dir);
        }

        let feedback = FeedbackCollector::new(&config.feedback.database).await?;
        let orchestrator = AiOrchestrator::from_settings(&config.orchestrator_settings());

        let context = Self {
            server_name: config.server.name.clone(),
            version: config.server.version.clone(),
            library,
            cache,
            optimizer: TokenOptimizer::new(config.max_response_tokens()),
            feedback,
            orchestrator,
            delivery_format: config.delivery_format()?,
        };

        info!(
            "Context initialized: {} documents, delivery format {}, orchestrator {}",
            context.library.len(),
            context.delivery_format,
            if context.orchestrator.is_configured() {
                "configured"
            } else {
                "unconfigured"
            }
        );
        Ok(context)
    }

    /// Release the feedback store
    pub async fn shutdown(&self) {
        self.feedback.close().await;
        info!("Context shut down");
    }
}
