//! End-to-end behaviour of the guideline operations

use async_trait::async_trait;
use devguide_cache::CacheManager;
use devguide_docs::loader::build_document;
use devguide_docs::{DocumentLibrary, TokenOptimizer};
use devguide_persistence::FeedbackCollector;
use devguide_provider::{
    AiOrchestrator, Prompt, ServiceError, TextGenerator, UNAVAILABLE_ADVISORY,
    UNCONFIGURED_ADVISORY,
};
use devguide_server::{AppContext, GuidelinesService};
use devguide_types::{CacheFormat, DocumentName, FeedbackFilter, GuidelineError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const RULES: &str = "# Professional Coding Rules\n\nNever commit secrets.\nValidate all input.\n";

struct CountingGenerator {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &Prompt, _max_tokens: u32) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ServiceError::EmptyResponse)
        } else {
            Ok("Store tokens in the OS keychain.".to_string())
        }
    }
}

struct Harness {
    service: GuidelinesService,
    _dir: TempDir,
}

async fn harness(orchestrator: AiOrchestrator, format: CacheFormat) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(DocumentLibrary::from_documents([
        build_document(DocumentName::Rules, RULES.to_string()),
        build_document(DocumentName::Skills, "# Skills\n\nDebug with bisection.\n".into()),
        build_document(DocumentName::Steering, "# Steering\n\nPlan before coding.\n".into()),
    ]));
    let database = dir.path().join("feedback.db");

    let context = AppContext {
        server_name: "devguide".into(),
        version: "0.1.0".into(),
        cache: CacheManager::new(library.clone(), "0.1.0").with_dir(dir.path().join("cache")),
        library,
        optimizer: TokenOptimizer::new(None),
        feedback: FeedbackCollector::new(database.to_str().unwrap())
            .await
            .unwrap(),
        orchestrator,
        delivery_format: format,
    };

    Harness {
        service: GuidelinesService::new(Arc::new(context)),
        _dir: dir,
    }
}

fn configured(fail: bool) -> (AiOrchestrator, Arc<CountingGenerator>) {
    let generator = Arc::new(CountingGenerator {
        calls: AtomicUsize::new(0),
        fail,
    });
    let orchestrator =
        AiOrchestrator::with_generator(generator.clone(), 500, Duration::from_secs(5));
    (orchestrator, generator)
}

async fn records(service: &GuidelinesService) -> Vec<devguide_types::FeedbackRecord> {
    service
        .context()
        .feedback
        .query(&FeedbackFilter::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_repeated_rules_calls_are_identical_and_logged() {
    let h = harness(AiOrchestrator::unconfigured(), CacheFormat::CompressedText).await;

    let first = h.service.get_document(DocumentName::Rules).await.unwrap();
    let second = h.service.get_document(DocumentName::Rules).await.unwrap();
    assert_eq!(first, RULES);
    assert_eq!(first, second);

    let records = records(&h.service).await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.operation == "get_coding_rules" && r.success));
    assert_eq!(records[0].response_size, RULES.len());
    assert_eq!(records[0].tokens, RULES.chars().count() / 4);
    assert_eq!(records[0].metadata["format"], "compressed-text");
}

#[tokio::test]
async fn test_every_delivery_format_serves_the_same_text() {
    for format in CacheFormat::ALL {
        let h = harness(AiOrchestrator::unconfigured(), format).await;
        assert_eq!(
            h.service.get_document(DocumentName::Rules).await.unwrap(),
            RULES
        );
    }
}

#[tokio::test]
async fn test_metadata_records_the_served_encoding() {
    for format in CacheFormat::ALL {
        let h = harness(AiOrchestrator::unconfigured(), format).await;
        h.service.get_document(DocumentName::Steering).await.unwrap();
        h.service.read_resource("guidelines://rules").await.unwrap();

        let served = h
            .service
            .context()
            .cache
            .get(DocumentName::Steering, format)
            .await
            .unwrap()
            .format;
        let records = records(&h.service).await;
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.metadata["format"] == served.as_str()));
    }
}

#[tokio::test]
async fn test_unconfigured_guidance_returns_advisory() {
    let h = harness(AiOrchestrator::unconfigured(), CacheFormat::Plain).await;

    let text = h
        .service
        .custom_guidance("How do I add auth?".into(), None)
        .await
        .unwrap();
    assert_eq!(text, UNCONFIGURED_ADVISORY);

    let records = records(&h.service).await;
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].metadata["status"], "unconfigured");
}

#[tokio::test]
async fn test_failing_service_logs_one_failure() {
    let (orchestrator, generator) = configured(true);
    let h = harness(orchestrator, CacheFormat::Plain).await;

    let text = h
        .service
        .custom_guidance("How do I add auth?".into(), Some("REST API".into()))
        .await
        .unwrap();
    assert_eq!(text, UNAVAILABLE_ADVISORY);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let records = records(&h.service).await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert_eq!(records[0].operation, "get_custom_guidance");
    assert_eq!(records[0].arguments["context"], "REST API");
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn test_generated_guidance_is_returned() {
    let (orchestrator, generator) = configured(false);
    let h = harness(orchestrator, CacheFormat::Plain).await;

    let text = h
        .service
        .custom_guidance("Where do I keep tokens?".into(), None)
        .await
        .unwrap();
    assert_eq!(text, "Store tokens in the OS keychain.");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let records = records(&h.service).await;
    assert!(records[0].success);
    assert_eq!(records[0].metadata["status"], "generated");
}

#[tokio::test]
async fn test_empty_query_is_rejected_without_a_call() {
    let (orchestrator, generator) = configured(false);
    let h = harness(orchestrator, CacheFormat::Plain).await;

    let result = h.service.custom_guidance("   ".into(), None).await;
    assert!(matches!(result, Err(GuidelineError::Misuse(_))));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let records = records(&h.service).await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
}

#[tokio::test]
async fn test_resources_by_uri() {
    let h = harness(AiOrchestrator::unconfigured(), CacheFormat::Plain).await;

    let steering = h.service.read_resource("guidelines://steering").await.unwrap();
    assert!(steering.contains("Plan before coding."));

    let missing = h.service.read_resource("guidelines://recipes").await;
    assert!(matches!(missing, Err(GuidelineError::NotFound(_))));

    let failures = h
        .service
        .context()
        .feedback
        .query(&FeedbackFilter::default().success(false))
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].arguments["uri"], "guidelines://recipes");
}

#[tokio::test]
async fn test_response_cap_truncates_documents() {
    let dir = tempfile::tempdir().unwrap();
    let long = "Keep functions short and focused.\n".repeat(200);
    let library = Arc::new(DocumentLibrary::from_documents(
        DocumentName::ALL
            .into_iter()
            .map(|name| build_document(name, long.clone())),
    ));
    let context = AppContext {
        server_name: "devguide".into(),
        version: "0.1.0".into(),
        cache: CacheManager::new(library.clone(), "0.1.0"),
        library,
        optimizer: TokenOptimizer::new(Some(100)),
        feedback: FeedbackCollector::new(dir.path().join("f.db").to_str().unwrap())
            .await
            .unwrap(),
        orchestrator: AiOrchestrator::unconfigured(),
        delivery_format: CacheFormat::Plain,
    };
    let service = GuidelinesService::new(Arc::new(context));

    let text = service.get_document(DocumentName::Skills).await.unwrap();
    assert!(text.chars().count() / 4 <= 100);
    assert!(text.ends_with("(content truncated for token optimization)"));
}

#[tokio::test]
async fn test_summary_and_selection() {
    let h = harness(AiOrchestrator::unconfigured(), CacheFormat::Plain).await;
    h.service.get_document(DocumentName::Skills).await.unwrap();

    let selection = h.service.select_documents("Fix a flaky test").await;
    assert_eq!(selection.names().len(), 3);

    let summary = h.service.feedback_summary(1).await.unwrap();
    assert_eq!(summary.total_calls, 2);
    assert_eq!(summary.tool_usage["get_development_skills"], 1);
    assert_eq!(summary.tool_usage["analyze_request"], 1);

    assert!(!h.service.cache_info().await.available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_are_all_recorded() {
    let h = harness(AiOrchestrator::unconfigured(), CacheFormat::CompressedSerialized).await;

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let service = h.service.clone();
            tokio::spawn(async move {
                match i % 4 {
                    0 => service.get_document(DocumentName::Rules).await,
                    1 => service.get_document(DocumentName::Skills).await,
                    2 => service.get_document(DocumentName::Steering).await,
                    _ => service.custom_guidance(format!("question {i}"), None).await,
                }
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let records = records(&h.service).await;
    assert_eq!(records.len(), 50);

    let rules: Vec<_> = records
        .iter()
        .filter(|r| r.operation == "get_coding_rules")
        .collect();
    assert!(rules.iter().all(|r| r.response_size == RULES.len()));
}
