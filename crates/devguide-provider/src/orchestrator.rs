//! AI orchestrator
//!
//! Two states, fixed at construction: with a credential every custom
//! guidance call makes exactly one generation attempt; without one it
//! answers with an advisory and never touches the network.

use crate::error::ServiceError;
use crate::generator::{OpenAiGenerator, Prompt, TextGenerator};
use devguide_docs::DocumentLibrary;
use devguide_types::{DocumentName, OrchestrationRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const UNCONFIGURED_ADVISORY: &str = "AI-powered custom guidance is not available because no API key is configured. \
Set OPENAI_API_KEY (or orchestrator.api_key in devguide.toml) to enable it. \
Meanwhile, get_coding_rules, get_development_skills and get_steering_instructions return the full guidelines.";

pub const UNAVAILABLE_ADVISORY: &str = "Custom guidance is temporarily unavailable. \
Please try again later, or use get_coding_rules, get_development_skills and get_steering_instructions to read the guidelines directly.";

const GUIDANCE_SYSTEM_PROMPT: &str = "You are an expert software engineering advisor. Your role is to provide \
professional development guidance to AI agents assisting with coding tasks.

You have access to three documentation sources:
1. Professional coding rules and standards
2. Development skills and best practices
3. AI agent steering instructions

Based on the agent's query, select the most relevant information from these sources and create \
a focused, actionable response. Combine insights from multiple sources when appropriate.

Provide clear, professional guidance that helps the agent write production-quality code. \
Be specific and practical. Include code examples when helpful.";

const SELECTION_SYSTEM_PROMPT: &str = "You are analyzing an AI agent's development request to determine which \
types of documentation would be most helpful. Respond with ONLY a JSON object containing \
three boolean fields: rules, skills, and steering.

- rules: true if the request involves coding standards, security, testing, or code quality
- skills: true if the request involves problem-solving, debugging, architecture, or methodology
- steering: true if the request involves decision-making, planning, or context awareness

Respond ONLY with valid JSON, nothing else.";

const SELECTION_MAX_TOKENS: u32 = 100;

/// Settings for the orchestrator, resolved from configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

enum State {
    Configured(Arc<dyn TextGenerator>),
    Unconfigured,
}

/// How a custom guidance call ended
#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceStatus {
    Generated,
    Unconfigured,
    /// The service call failed; carries the error text
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceOutcome {
    pub text: String,
    pub status: GuidanceStatus,
}

impl GuidanceOutcome {
    /// Degraded outcomes are logged as failures; the unconfigured advisory is not
    pub fn is_success(&self) -> bool {
        !matches!(self.status, GuidanceStatus::Degraded(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            GuidanceStatus::Degraded(e) => Some(e),
            _ => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            GuidanceStatus::Generated => "generated",
            GuidanceStatus::Unconfigured => "unconfigured",
            GuidanceStatus::Degraded(_) => "degraded",
        }
    }
}

/// Which guideline documents a request needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSelection {
    #[serde(default = "selected")]
    pub rules: bool,
    #[serde(default = "selected")]
    pub skills: bool,
    #[serde(default = "selected")]
    pub steering: bool,
}

fn selected() -> bool {
    true
}

impl DocumentSelection {
    pub fn all() -> Self {
        Self {
            rules: true,
            skills: true,
            steering: true,
        }
    }

    pub fn names(&self) -> Vec<DocumentName> {
        DocumentName::ALL
            .into_iter()
            .filter(|name| match name {
                DocumentName::Rules => self.rules,
                DocumentName::Skills => self.skills,
                DocumentName::Steering => self.steering,
            })
            .collect()
    }
}

pub struct AiOrchestrator {
    state: State,
    max_tokens: u32,
    timeout: Duration,
}

impl AiOrchestrator {
    /// Configured when the settings carry a non-blank API key
    pub fn from_settings(settings: &OrchestratorSettings) -> Self {
        match settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let generator = OpenAiGenerator::new(
                    key,
                    settings.base_url.as_deref(),
                    &settings.model,
                    settings.temperature,
                );
                Self::with_generator(Arc::new(generator), settings.max_tokens, settings.timeout)
            }
            _ => {
                warn!("No API key configured, custom guidance will return an advisory");
                Self::unconfigured()
            }
        }
    }

    pub fn with_generator(
        generator: Arc<dyn TextGenerator>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        info!(
            "AI orchestrator configured (max_tokens={}, timeout={:?})",
            max_tokens, timeout
        );
        Self {
            state: State::Configured(generator),
            max_tokens,
            timeout,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            state: State::Unconfigured,
            max_tokens: 0,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, State::Configured(_))
    }

    /// Answer a query from the guideline documents. Never fails.
    pub async fn get_custom_guidance(
        &self,
        request: &OrchestrationRequest,
        documents: &DocumentLibrary,
    ) -> GuidanceOutcome {
        let State::Configured(generator) = &self.state else {
            return GuidanceOutcome {
                text: UNCONFIGURED_ADVISORY.to_string(),
                status: GuidanceStatus::Unconfigured,
            };
        };

        let prompt = Prompt::new(GUIDANCE_SYSTEM_PROMPT, guidance_prompt(request, documents));
        match self.attempt(generator.as_ref(), &prompt, self.max_tokens).await {
            Ok(text) => GuidanceOutcome {
                text,
                status: GuidanceStatus::Generated,
            },
            Err(e) => {
                warn!("Custom guidance degraded: {}", e);
                GuidanceOutcome {
                    text: UNAVAILABLE_ADVISORY.to_string(),
                    status: GuidanceStatus::Degraded(e.to_string()),
                }
            }
        }
    }

    /// Ask which documents a request needs. Any failure selects all three.
    pub async fn analyze_request(&self, description: &str) -> DocumentSelection {
        let State::Configured(generator) = &self.state else {
            return DocumentSelection::all();
        };

        let user = format!(
            "Analyze this request and determine which documentation types are needed:\n\n\
             Request: {description}\n\n\
             Respond with JSON only: {{\"rules\": true/false, \"skills\": true/false, \"steering\": true/false}}"
        );
        let prompt = Prompt::new(SELECTION_SYSTEM_PROMPT, user).with_temperature(0.0);

        match self
            .attempt(generator.as_ref(), &prompt, SELECTION_MAX_TOKENS)
            .await
        {
            Ok(text) => parse_selection(&text).unwrap_or_else(|| {
                debug!("Unparseable document selection: {}", text);
                DocumentSelection::all()
            }),
            Err(e) => {
                debug!("Document selection failed, using all documents: {}", e);
                DocumentSelection::all()
            }
        }
    }

    /// One bounded attempt, no retries
    async fn attempt(
        &self,
        generator: &dyn TextGenerator,
        prompt: &Prompt,
        max_tokens: u32,
    ) -> Result<String, ServiceError> {
        tokio::time::timeout(self.timeout, generator.generate(prompt, max_tokens))
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))?
    }
}

fn guidance_prompt(request: &OrchestrationRequest, documents: &DocumentLibrary) -> String {
    let mut prompt = format!("Agent Query: {}", request.query());
    if let Some(context) = request.context() {
        prompt.push_str(&format!("\n\nAdditional Context: {context}"));
    }

    prompt.push_str("\n\nAvailable Documentation:");
    for document in documents.documents() {
        prompt.push_str(&format!(
            "\n\n=== {} ===\n{}",
            document.name.default_title().to_uppercase(),
            document.content
        ));
    }

    prompt.push_str(
        "\n\nBased on the agent's query and the documentation above, provide targeted guidance \
         that will help the agent accomplish their task professionally and effectively. Focus on \
         the most relevant parts of the documentation for this specific situation.",
    );
    prompt
}

/// Accepts bare JSON or JSON inside a markdown fence
fn parse_selection(text: &str) -> Option<DocumentSelection> {
    let trimmed = text.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
