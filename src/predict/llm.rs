//
//  llm.rs
//  RouteLens
//
//  Text-completion boundary and the predictor built on it.
//

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompt::build_prompt;
use super::response::parse_prediction;
use super::{PayloadPredictor, PredictedPayload};
use crate::config::LlmConfig;
use crate::controller::ControllerContext;
use crate::error::{Result, RouteLensError};
use crate::routes::DetectedRoute;

/// Prompt in, text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You predict HTTP request payloads from backend source code. Reply with JSON only.";

impl HttpCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = config.api_key();
        Ok(Self {
            client,
            config,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RouteLensError::Completion(format!(
                "endpoint returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RouteLensError::Completion("response had no content".to_string()))
    }
}

/// Prompt, complete, parse. One attempt; failures become `None`.
#[derive(Clone)]
pub struct LlmPredictor {
    client: Arc<dyn CompletionClient>,
}

impl LlmPredictor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PayloadPredictor for LlmPredictor {
    async fn predict(
        &self,
        route: &DetectedRoute,
        context: Option<&ControllerContext>,
    ) -> Option<PredictedPayload> {
        let prompt = build_prompt(route, context);
        let raw = match self.client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(route = %route.display_short(), error = %e, "completion failed");
                return None;
            }
        };
        match parse_prediction(&raw) {
            Ok(payload) => {
                debug!(route = %route.display_short(), fields = payload.fields.len(), "prediction parsed");
                Some(payload)
            }
            Err(e) => {
                warn!(route = %route.display_short(), error = %e, raw = %raw, "unparseable prediction");
                None
            }
        }
    }
}
