//! Watson Assistant (v1 message API) client
//!
//! Implements DialogueEngine over HTTP. The assistant's context is stored
//! verbatim; only `context.system.dialog_stack` is read to locate the node
//! the conversation stopped at.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sessionstore::DialogueContext;
use std::time::Duration;
use tracing::{debug, warn};

use super::{DialogueEngine, DialogueError, DialogueTurn};
use crate::config::DialogueConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Node id on top of the dialog stack of a Watson context
pub fn dialog_stack_node(context: &Value) -> Option<String> {
    context
        .pointer("/system/dialog_stack")
        .and_then(Value::as_array)
        .and_then(|stack| stack.last())
        .and_then(|frame| frame.get("dialog_node"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    output: MessageOutput,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageOutput {
    #[serde(default)]
    text: Vec<String>,
}

/// Watson Assistant client
pub struct WatsonAssistant {
    base_url: String,
    workspace_id: String,
    version: String,
    api_key: String,
    http: Client,
}

impl WatsonAssistant {
    /// Create a new client from configuration
    ///
    /// The API key is read from the environment variable named in config.
    pub fn from_config(config: &DialogueConfig) -> Result<Self, DialogueError> {
        debug!(base_url = %config.base_url, workspace_id = %config.workspace_id, "from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| DialogueError::MissingCredentials(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(DialogueError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            workspace_id: config.workspace_id.clone(),
            version: config.version.clone(),
            api_key,
            http,
        })
    }

    fn message_url(&self) -> String {
        format!("{}/v1/workspaces/{}/message", self.base_url, self.workspace_id)
    }

    /// Build the request body for the message API
    fn build_request_body(prior: Option<&DialogueContext>, text: &str) -> Value {
        debug!(has_context = prior.is_some(), "build_request_body: called");
        let mut body = serde_json::json!({
            "input": { "text": text },
        });
        if let Some(context) = prior {
            body["context"] = context.as_value().clone();
        }
        body
    }

    /// Turn an API response into a dialogue turn
    fn parse_response(response: MessageResponse) -> DialogueTurn {
        debug!(?response.output.text, "parse_response: called");
        let reply = response
            .output
            .text
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let node_id = response.context.as_ref().and_then(dialog_stack_node);

        DialogueTurn {
            context: response.context.map(DialogueContext::new),
            reply,
            node_id,
        }
    }
}

impl WatsonAssistant {
    /// One message call with no retries
    async fn send_message(&self, url: &str, body: &Value) -> Result<DialogueTurn, DialogueError> {
        let response = self
            .http
            .post(url)
            .query(&[("version", self.version.as_str())])
            .basic_auth("apikey", Some(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DialogueError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: MessageResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::InvalidResponse(e.to_string()))?;
        Ok(Self::parse_response(api_response))
    }
}

#[async_trait]
impl DialogueEngine for WatsonAssistant {
    async fn advance(&self, prior: Option<&DialogueContext>, text: &str) -> Result<DialogueTurn, DialogueError> {
        debug!(workspace_id = %self.workspace_id, "advance: called");
        let url = self.message_url();
        let body = Self::build_request_body(prior, text);

        let mut attempt = 0;
        loop {
            match self.send_message(&url, &body).await {
                Ok(turn) => {
                    debug!(attempt, "advance: success");
                    return Ok(turn);
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                    warn!(attempt, backoff_ms = backoff, error = %e, "advance: retrying after transient error");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "advance: giving up");
                    return Err(e);
                }
            }
        }
    }

    fn current_node(&self, context: &DialogueContext) -> Option<String> {
        dialog_stack_node(context.as_value())
    }
}
