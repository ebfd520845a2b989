//! MCP front-end: four tools and three `guidelines://` resources

use crate::service::GuidelinesService;
use devguide_types::{DocumentName, GuidelineError};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
    PaginatedRequestParams, RawResource, ReadResourceRequestParams, ReadResourceResult, Resource,
    ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::schemars;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;

const INSTRUCTIONS: &str = "Professional development guidelines for AI coding agents. \
Call get_coding_rules, get_development_skills or get_steering_instructions for the full documents, \
or get_custom_guidance with a query for advice tailored to the task at hand. \
The same documents are available as resources under guidelines://.";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CustomGuidanceRequest {
    /// The question or task description to get guidance for
    pub query: String,
    /// Optional additional context about the current situation
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Clone)]
pub struct GuidelinesServer {
    service: GuidelinesService,
    tool_router: ToolRouter<Self>,
}

impl GuidelinesServer {
    pub fn new(service: GuidelinesService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    async fn document_result(&self, name: DocumentName) -> Result<CallToolResult, McpError> {
        let text = self.service.get_document(name).await.map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Contents of a `guidelines://` resource; unknown URIs are resource-not-found
    pub async fn read_uri(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let text = self.service.read_resource(uri).await.map_err(|e| match e {
            GuidelineError::NotFound(_) => {
                McpError::resource_not_found(e.to_string(), Some(serde_json::json!({ "uri": uri })))
            }
            other => to_mcp_error(other),
        })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

#[tool_router]
impl GuidelinesServer {
    #[tool(description = "Get professional coding rules and standards: code quality, security, testing and documentation requirements.")]
    pub async fn get_coding_rules(&self) -> Result<CallToolResult, McpError> {
        self.document_result(DocumentName::Rules).await
    }

    #[tool(description = "Get development skills and best practices: problem solving, debugging, architecture and methodology.")]
    pub async fn get_development_skills(&self) -> Result<CallToolResult, McpError> {
        self.document_result(DocumentName::Skills).await
    }

    #[tool(description = "Get steering instructions for AI agents: how to plan, decide and stay aware of context while coding.")]
    pub async fn get_steering_instructions(&self) -> Result<CallToolResult, McpError> {
        self.document_result(DocumentName::Steering).await
    }

    #[tool(description = "Get AI-generated guidance for a specific query, combining the most relevant parts of the rules, skills and steering documents. Requires an API key on the server; without one an advisory message is returned.")]
    pub async fn get_custom_guidance(
        &self,
        Parameters(request): Parameters<CustomGuidanceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .service
            .custom_guidance(request.query, request.context)
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for GuidelinesServer {
    fn get_info(&self) -> ServerInfo {
        let context = self.service.context();
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: context.server_name.clone(),
                version: context.version.clone(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(
            DocumentName::ALL.into_iter().map(resource).collect(),
        ))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_uri(&request.uri).await
    }
}

/// Resource listing entry for a document
pub fn resource(name: DocumentName) -> Resource {
    let mut raw = RawResource::new(name.uri(), name.default_title());
    raw.description = Some(name.description().to_string());
    raw.mime_type = Some("text/markdown".to_string());
    raw.no_annotation()
}

fn to_mcp_error(error: GuidelineError) -> McpError {
    match error {
        GuidelineError::Misuse(_) | GuidelineError::NotFound(_) => {
            McpError::invalid_params(error.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}
