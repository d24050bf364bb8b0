//! `OpenAI` Assistants API bridge
//!
//! A turn is: create (or reuse) a thread, post the user message, start a
//! run for the configured assistant, poll the run until it is terminal,
//! then read the assistant message the run produced.

use super::types::{AssistantTurn, RunStatus, ToolCallRequest};
use super::{AssistantBridge, AssistantError};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bridge to a hosted `OpenAI` assistant
pub struct OpenAiAssistant {
    client: Client,
    api_key: String,
    base_url: String,
    assistant_id: String,
    poll_interval: Duration,
    run_timeout: Duration,
}

impl OpenAiAssistant {
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            assistant_id: config.assistant_id.clone(),
            poll_interval: config.poll_interval,
            run_timeout: config.run_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn run_turn(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
    ) -> Result<AssistantTurn, AssistantError> {
        let thread_id = match thread_id {
            Some(id) => id.to_string(),
            None => {
                let thread: Thread = self.post("threads", &serde_json::json!({})).await?;
                tracing::debug!(thread_id = %thread.id, "Created assistant thread");
                thread.id
            }
        };

        let _: Value = self
            .post(
                &format!("threads/{thread_id}/messages"),
                &NewMessage {
                    role: "user",
                    content: user_text,
                },
            )
            .await?;

        let mut run: Run = self
            .post(
                &format!("threads/{thread_id}/runs"),
                &NewRun {
                    assistant_id: &self.assistant_id,
                },
            )
            .await?;

        while !run.status.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            run = self
                .get(&format!("threads/{thread_id}/runs/{}", run.id))
                .await?;
            tracing::debug!(run_id = %run.id, status = %run.status, "Polled assistant run");
        }

        if run.status != RunStatus::Completed {
            return Err(AssistantError::run(
                run.status,
                run.last_error.map(|e| format!("{}: {}", e.code, e.message)),
            ));
        }

        let messages: MessageList = self
            .get(&format!("threads/{thread_id}/messages?run_id={}", run.id))
            .await?;

        Ok(extract_turn(thread_id, &messages.data))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AssistantError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AssistantError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }
}

#[async_trait]
impl AssistantBridge for OpenAiAssistant {
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError> {
        tokio::select! {
            () = cancel.cancelled() => Err(AssistantError::Cancelled),
            result = tokio::time::timeout(self.run_timeout, self.run_turn(thread_id, user_text)) => {
                result.unwrap_or(Err(AssistantError::Timeout(self.run_timeout)))
            }
        }
    }
}

fn request_error(e: reqwest::Error) -> AssistantError {
    if e.is_timeout() {
        AssistantError::transport(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        AssistantError::transport(format!("Connection failed: {e}"))
    } else {
        AssistantError::transport(format!("Request failed: {e}"))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AssistantError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AssistantError::transport(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(AssistantError::transport(format!("HTTP {status}: {body}")));
    }

    serde_json::from_str(&body)
        .map_err(|e| AssistantError::transport(format!("Malformed response: {e}")))
}

/// Build the turn from the messages a run produced.
///
/// Only the first assistant-authored message counts. Its text parts are
/// concatenated in API order; tool-call parts are read field by field and
/// anything that does not fit is skipped.
pub fn extract_turn(thread_id: String, messages: &[ThreadMessage]) -> AssistantTurn {
    let Some(message) = messages.iter().find(|m| m.role == "assistant") else {
        return AssistantTurn {
            thread_id,
            ..AssistantTurn::default()
        };
    };

    let text = message.content.iter().filter_map(text_part).collect();
    let tool_calls = message.content.iter().filter_map(tool_call_part).collect();

    AssistantTurn {
        thread_id,
        text,
        tool_calls,
    }
}

fn text_part(part: &Value) -> Option<&str> {
    if part.get("type")?.as_str()? != "text" {
        return None;
    }
    match part.get("text")? {
        Value::String(text) => Some(text),
        other => other.get("value")?.as_str(),
    }
}

fn tool_call_part(part: &Value) -> Option<ToolCallRequest> {
    let kind = part.get("type")?.as_str()?;
    if kind != "tool-call" && kind != "tool_call" {
        return None;
    }
    let name = part
        .get("toolName")
        .or_else(|| part.get("tool_name"))?
        .as_str()?;
    if name.is_empty() {
        return None;
    }
    let args = match part.get("args") {
        // Some producers send arguments as an encoded JSON string
        Some(Value::String(encoded)) => serde_json::from_str(encoded).ok()?,
        Some(args) => args.clone(),
        None => Value::Null,
    };
    Some(ToolCallRequest::new(name, args))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewRun<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Thread {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

/// A thread message; content parts stay untyped so unexpected shapes
/// never fail the whole turn
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<Value>,
}
