use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::Message;
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::tools::ToolSpec;

pub const SYSTEM_INSTRUCTIONS: &str = "You are the ordering assistant of a pizzeria. \
Greet customers, show the menu, answer questions about prices and ingredients, and add pizzas \
to the cart when asked. Use the get_price tool for prices and ingredients, list_all to show the \
menu and add_to_cart whenever the customer orders something. Never invent prices or pizzas that \
are not on the menu. After adding items, confirm what was added and tell the customer the \
current total. Keep answers short and friendly.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Reply,
    ToolCalls(usize),
}

/// Asks the model for its next action and appends exactly one assistant message.
pub async fn decide(
    llm: &dyn LlmClient,
    instructions: &str,
    tools: &[ToolSpec],
    history: &mut Vec<Message>,
    correlation_id: &str,
) -> Result<Decision, LlmError> {
    let request = CompletionRequest { instructions, messages: history.as_slice(), tools };
    let completion = llm.complete(request).await.map_err(|error| {
        warn!(
            event_name = "agent.decision.failed",
            correlation_id,
            error = %error,
            "model call failed"
        );
        error
    })?;

    let mut tool_calls = completion.tool_calls;
    for call in &mut tool_calls {
        if call.id.trim().is_empty() {
            call.id = format!("call_{}", Uuid::new_v4().simple());
        }
    }

    let decision =
        if tool_calls.is_empty() { Decision::Reply } else { Decision::ToolCalls(tool_calls.len()) };
    info!(
        event_name = "agent.decision.completed",
        correlation_id,
        tool_calls = tool_calls.len(),
        has_text = completion.text.as_deref().is_some_and(|text| !text.trim().is_empty()),
        "model decision received"
    );

    history.push(Message::Assistant { content: completion.text, tool_calls });
    Ok(decision)
}
