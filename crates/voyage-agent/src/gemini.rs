use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::{AgentError, AgentExecutor, AgentTask};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Agent executor backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiAgent {
    client: reqwest::Client,
    config: GeminiConfig,
}

static SHARED_LLM: OnceLock<GeminiAgent> = OnceLock::new();

/// Process-wide client, built on first use; later configs are ignored.
pub fn shared_llm(config: &GeminiConfig) -> anyhow::Result<&'static GeminiAgent> {
    if let Some(agent) = SHARED_LLM.get() {
        return Ok(agent);
    }
    let agent = GeminiAgent::new(config.clone())?;
    Ok(SHARED_LLM.get_or_init(|| agent))
}

impl GeminiAgent {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

fn build_request(task: &AgentTask) -> GenerateRequest {
    let system = format!(
        "You are {}. {}\nYour personal goal is: {}",
        task.role, task.backstory, task.goal
    );
    let user = format!(
        "{}\n\nThis is the expected criteria for your final answer: {}\nYou MUST return the actual complete content as the final answer, not a summary.",
        task.description, task.expected_output
    );
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part { text: system }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part { text: user }],
        }],
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, AgentError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        Err(AgentError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl AgentExecutor for GeminiAgent {
    async fn kickoff(&self, task: &AgentTask) -> Result<String, AgentError> {
        let span = info_span!("agent_kickoff", role = %task.role, model = %self.config.model);
        async {
            let resp = self
                .client
                .post(self.endpoint())
                .header(API_KEY_HEADER, self.config.api_key.as_str())
                .json(&build_request(task))
                .send()
                .await?;
            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(AgentError::HttpStatus {
                    status: status.as_u16(),
                    message: body.trim().to_string(),
                });
            }
            extract_text(serde_json::from_str(&body)?)
        }
        .instrument(span)
        .await
    }
}
