use tracing::{info, warn};

use crate::conversation::{Message, ToolOutput};
use crate::tools::ToolSet;

/// Runs the tool calls carried by the latest assistant message, in request order,
/// appending one tool-result message per call. Returns how many results were appended.
///
/// Unknown tools and failing tools produce error text instead of aborting the batch.
pub async fn execute_pending(tools: &ToolSet, history: &mut Vec<Message>, correlation_id: &str) -> usize {
    let Some(calls) = history.last().map(|message| message.pending_tool_calls().to_vec()) else {
        return 0;
    };

    for call in &calls {
        let output = match tools.resolve(&call.name) {
            None => {
                warn!(
                    event_name = "agent.tool.not_found",
                    correlation_id,
                    tool_name = %call.name,
                    tool_call_id = %call.id,
                    "model requested an unknown tool"
                );
                ToolOutput::Text(format!("Error: tool '{}' not found.", call.name))
            }
            Some(kind) => match tools.execute(kind, &call.arguments).await {
                Ok(output) => {
                    info!(
                        event_name = "agent.tool.executed",
                        correlation_id,
                        tool_name = kind.name(),
                        tool_call_id = %call.id,
                        structured = matches!(output, ToolOutput::CartAddition(_)),
                        "tool executed"
                    );
                    output
                }
                Err(error) => {
                    warn!(
                        event_name = "agent.tool.failed",
                        correlation_id,
                        tool_name = kind.name(),
                        tool_call_id = %call.id,
                        error = %error,
                        "tool execution failed"
                    );
                    ToolOutput::Text(format!("Error executing tool {}: {error}", kind.name()))
                }
            },
        };
        history.push(Message::tool_result(call, output));
    }

    calls.len()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pizzabot_core::domain::product::Product;
    use pizzabot_db::InMemoryProductRepository;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::execute_pending;
    use crate::conversation::{Message, ToolCallRequest, ToolOutput};
    use crate::tools::ToolSet;

    fn tools() -> ToolSet {
        ToolSet::new(Arc::new(InMemoryProductRepository::new(vec![Product::new(
            "Margherita",
            "mussarela, manjericão",
            Decimal::new(3590, 2),
        )])))
    }

    fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest { id: id.to_string(), name: name.to_string(), arguments }
    }

    #[tokio::test]
    async fn no_pending_calls_is_a_no_op() {
        let mut history = vec![Message::user("oi"), Message::assistant("Olá!")];
        let appended = execute_pending(&tools(), &mut history, "test").await;
        assert_eq!(appended, 0);
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn results_follow_request_order_and_keep_correlation_ids() {
        let mut history = vec![Message::Assistant {
            content: None,
            tool_calls: vec![
                call("a", "get_price", json!({"pizza_name": "Margherita"})),
                call("b", "order_drink", json!({})),
                call("c", "get_price", json!({})),
                call("d", "list_all", json!({})),
            ],
        }];

        let appended = execute_pending(&tools(), &mut history, "test").await;

        assert_eq!(appended, 4);
        let results = history[1..]
            .iter()
            .map(|message| match message {
                Message::Tool { tool_call_id, name, content } => {
                    (tool_call_id.as_str(), name.as_str(), content.clone())
                }
                other => panic!("expected tool result, got {other:?}"),
            })
            .collect::<Vec<_>>();

        assert_eq!(results[0].0, "a");
        assert!(matches!(&results[0].2, ToolOutput::Text(text) if text.contains("R$ 35.90")));
        assert_eq!(results[1].1, "order_drink");
        assert!(matches!(&results[1].2, ToolOutput::Text(text) if text.contains("not found")));
        assert!(matches!(&results[2].2, ToolOutput::Text(text) if text.starts_with("Error executing tool get_price")));
        assert_eq!(results[3].0, "d");
    }
}
