use std::collections::HashSet;

use pizzabot_core::errors::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{CartAddition, ToolKind};

/// A tool invocation requested by the model. `id` correlates the request with its result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Payload of a tool-result message.
///
/// Lookup tools produce text meant for display; `add_to_cart` produces a structured
/// record that reconciliation folds into the cart. Anything else a caller sends back
/// is kept as raw JSON so it survives the round trip and is skipped during reconciliation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    CartAddition(CartAddition),
    Text(String),
    Raw(Value),
}

impl ToolOutput {
    /// Rendering handed back to the model.
    pub fn to_model_text(&self) -> String {
        match self {
            Self::CartAddition(addition) => {
                serde_json::to_string(addition).unwrap_or_else(|_| addition.summary())
            }
            Self::Text(text) => text.clone(),
            Self::Raw(value) => value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: ToolOutput,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant { content: Some(content.into()), tool_calls: Vec::new() }
    }

    pub fn tool_result(request: &ToolCallRequest, content: ToolOutput) -> Self {
        Self::Tool { tool_call_id: request.id.clone(), name: request.name.clone(), content }
    }

    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Non-empty assistant text, if this is an assistant message that carries any.
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            Self::Assistant { content: Some(text), .. } if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    pub fn is_cart_result(&self) -> bool {
        matches!(self, Self::Tool { name, .. } if name == ToolKind::AddToCart.name())
    }
}

/// Most recent assistant message with non-empty text.
pub fn latest_reply(history: &[Message]) -> Option<&str> {
    history.iter().rev().find_map(Message::assistant_text)
}

pub fn count_cart_results(history: &[Message]) -> usize {
    history.iter().filter(|message| message.is_cart_result()).count()
}

/// Checks that every tool result answers a correlation id issued earlier in the history.
pub fn validate_history(history: &[Message]) -> Result<(), DomainError> {
    let mut issued = HashSet::new();
    for message in history {
        match message {
            Message::Assistant { tool_calls, .. } => {
                issued.extend(tool_calls.iter().map(|call| call.id.as_str()));
            }
            Message::Tool { tool_call_id, .. } if !issued.contains(tool_call_id.as_str()) => {
                return Err(DomainError::InvariantViolation(format!(
                    "tool result `{tool_call_id}` does not answer any earlier tool call"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
