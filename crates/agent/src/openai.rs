use std::time::Duration;

use async_trait::async_trait;
use pizzabot_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::conversation::{Message, ToolCallRequest};
use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::tools::ToolSpec;

const MAX_ERROR_BODY: usize = 512;

/// Chat-completions client for OpenAI and API-compatible endpoints (Groq, Ollama).
pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.effective_base_url()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn payload(&self, request: &CompletionRequest<'_>) -> Value {
        build_payload(&self.model, self.temperature, request)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let mut builder = self.client.post(&self.endpoint).json(&self.payload(&request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let body: Value = response.json().await.map_err(map_transport_error)?;
        debug!(event_name = "agent.llm.response_received", model = %self.model, "model responded");
        parse_completion(body)
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout
    } else if error.is_decode() {
        LlmError::Decode(error.to_string())
    } else {
        LlmError::Transport(error.to_string())
    }
}

fn floor_char_boundary(value: &str, max: usize) -> usize {
    if value.len() <= max {
        return value.len();
    }
    (0..=max).rev().find(|index| value.is_char_boundary(*index)).unwrap_or(0)
}

pub(crate) fn build_payload(model: &str, temperature: f32, request: &CompletionRequest<'_>) -> Value {
    let mut messages = vec![json!({"role": "system", "content": request.instructions})];
    messages.extend(request.messages.iter().map(message_to_wire));

    let mut payload = json!({
        "model": model,
        "temperature": temperature,
        "messages": messages,
    });
    if !request.tools.is_empty() {
        payload["tools"] = Value::Array(request.tools.iter().map(tool_to_wire).collect());
        payload["tool_choice"] = json!("auto");
    }
    payload
}

fn tool_to_wire(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn message_to_wire(message: &Message) -> Value {
    match message {
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant { content, tool_calls } => {
            let mut wire = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                wire["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        let arguments = match &call.arguments {
                            Value::String(raw) => raw.clone(),
                            other => other.to_string(),
                        };
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {"name": call.name, "arguments": arguments}
                        })
                    })
                    .collect();
            }
            wire
        }
        Message::Tool { tool_call_id, name, content } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": name,
            "content": content.to_model_text(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

pub(crate) fn parse_completion(body: Value) -> Result<Completion, LlmError> {
    if let Some(error) = body.get("error") {
        return Err(LlmError::Decode(format!("model endpoint reported an error: {error}")));
    }

    let completion: ChatCompletion =
        serde_json::from_value(body).map_err(|error| LlmError::Decode(error.to_string()))?;
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| LlmError::Decode("response contained no choices".to_string()))?;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest {
            id: call.id.filter(|id| !id.trim().is_empty()).unwrap_or_default(),
            name: call.function.name,
            arguments: parse_arguments(call.function.arguments.as_deref()),
        })
        .collect();

    Ok(Completion { text: message.content, tool_calls })
}

/// Arguments arrive as a JSON-encoded string. Unparseable input is kept verbatim
/// so the failure surfaces when the tool decodes it.
fn parse_arguments(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        None | Some("") => json!({}),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}
