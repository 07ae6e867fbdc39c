//! Model-backed payload prediction.
//!
//! The model itself is a black box behind [`CompletionClient`]: a prompt goes
//! in, text comes out. [`LlmPredictor`] builds the prompt from a route and its
//! handler source, then digs the JSON answer out of whatever came back.

pub mod llm;
pub mod prompt;
pub mod response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::ControllerContext;
use crate::routes::DetectedRoute;

pub use llm::{CompletionClient, HttpCompletionClient, LlmPredictor};

/// One request-body field as the model sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedField {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub example: Value,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedHeader {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedPayload {
    #[serde(default)]
    pub fields: Vec<PredictedField>,
    #[serde(default)]
    pub headers: Vec<PredictedHeader>,
}

fn default_type() -> String {
    "string".to_string()
}

/// Anything that can guess a request payload for a route.
///
/// `None` means no prediction; failures are logged by the implementation.
#[async_trait]
pub trait PayloadPredictor: Send + Sync {
    async fn predict(
        &self,
        route: &DetectedRoute,
        context: Option<&ControllerContext>,
    ) -> Option<PredictedPayload>;
}
