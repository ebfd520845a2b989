//! Tool and resource handlers as seen by an MCP client

use devguide_cache::CacheManager;
use devguide_docs::loader::build_document;
use devguide_docs::{DocumentLibrary, TokenOptimizer};
use devguide_persistence::FeedbackCollector;
use devguide_provider::{AiOrchestrator, UNCONFIGURED_ADVISORY};
use devguide_server::mcp::CustomGuidanceRequest;
use devguide_server::{AppContext, GuidelinesServer, GuidelinesService};
use devguide_types::{CacheFormat, DocumentName};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, ErrorCode, ResourceContents};
use std::sync::Arc;
use tempfile::TempDir;

async fn server(dir: &TempDir) -> GuidelinesServer {
    let library = Arc::new(DocumentLibrary::from_documents(DocumentName::ALL.into_iter().map(
        |name| build_document(name, format!("# {}\n\nKeep it simple.\n", name.default_title())),
    )));
    let context = AppContext {
        server_name: "devguide".into(),
        version: "0.1.0".into(),
        cache: CacheManager::new(library.clone(), "0.1.0"),
        library,
        optimizer: TokenOptimizer::new(None),
        feedback: FeedbackCollector::new(dir.path().join("feedback.db").to_str().unwrap())
            .await
            .unwrap(),
        orchestrator: AiOrchestrator::unconfigured(),
        delivery_format: CacheFormat::CompressedText,
    };
    GuidelinesServer::new(GuidelinesService::new(Arc::new(context)))
}

fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect()
}

#[tokio::test]
async fn test_document_tools_return_text() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(&dir).await;

    for result in [
        server.get_coding_rules().await.unwrap(),
        server.get_development_skills().await.unwrap(),
        server.get_steering_instructions().await.unwrap(),
    ] {
        assert_ne!(result.is_error, Some(true));
        assert!(text_of(&result).contains("Keep it simple."));
    }
}

#[tokio::test]
async fn test_blank_guidance_query_is_invalid_params() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(&dir).await;

    let error = server
        .get_custom_guidance(Parameters(CustomGuidanceRequest {
            query: "   ".into(),
            context: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);

    let result = server
        .get_custom_guidance(Parameters(CustomGuidanceRequest {
            query: "How should I name modules?".into(),
            context: Some("Rust workspace".into()),
        }))
        .await
        .unwrap();
    assert_eq!(text_of(&result), UNCONFIGURED_ADVISORY);
}

#[tokio::test]
async fn test_resource_reads() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(&dir).await;

    let result = server.read_uri("guidelines://rules").await.unwrap();
    assert_eq!(result.contents.len(), 1);
    match &result.contents[0] {
        ResourceContents::TextResourceContents { uri, text, .. } => {
            assert_eq!(uri, "guidelines://rules");
            assert!(text.contains("Keep it simple."));
        }
        other => panic!("expected text contents, got {other:?}"),
    }

    let error = server.read_uri("guidelines://recipes").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::RESOURCE_NOT_FOUND);
    assert_eq!(
        error.data,
        Some(serde_json::json!({ "uri": "guidelines://recipes" }))
    );
}
