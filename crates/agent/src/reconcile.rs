//! Derives the canonical cart from structured `add_to_cart` results.
//!
//! Model prose is never read here. `processed` counts the `add_to_cart` results already
//! folded into the cart, so running a pass twice over the same history is a no-op.

use pizzabot_core::domain::cart::Cart;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::conversation::{Message, ToolOutput};
use crate::tools::CartAddition;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedToolResult {
    #[error("payload is not a cart addition: {0}")]
    Decode(String),
    #[error("payload rejected: {0}")]
    Invalid(&'static str),
    #[error("payload does not fit the cart: {0}")]
    Overflow(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    pub skipped: usize,
}

pub fn cart_addition(output: &ToolOutput) -> Result<CartAddition, MalformedToolResult> {
    let addition = match output {
        ToolOutput::CartAddition(addition) => addition.clone(),
        ToolOutput::Text(text) => serde_json::from_str(text)
            .map_err(|error| MalformedToolResult::Decode(error.to_string()))?,
        ToolOutput::Raw(value) => serde_json::from_value(value.clone())
            .map_err(|error| MalformedToolResult::Decode(error.to_string()))?,
    };

    if addition.pizza_name.trim().is_empty() {
        return Err(MalformedToolResult::Invalid("pizza name is empty"));
    }
    if addition.quantity == 0 {
        return Err(MalformedToolResult::Invalid("quantity must be positive"));
    }
    if addition.price <= Decimal::ZERO {
        return Err(MalformedToolResult::Invalid("price must be positive"));
    }
    Ok(addition)
}

/// Folds every `add_to_cart` result past `processed` into `cart`.
pub fn reconcile(
    history: &[Message],
    cart: &mut Cart,
    processed: &mut usize,
    correlation_id: &str,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen = 0usize;

    for message in history {
        let Message::Tool { tool_call_id, content, .. } = message else {
            continue;
        };
        if !message.is_cart_result() {
            continue;
        }
        seen += 1;
        if seen <= *processed {
            continue;
        }

        let applied = cart_addition(content).and_then(|addition| {
            cart.upsert(&addition.pizza_name, addition.price, addition.quantity)
                .map_err(|error| MalformedToolResult::Overflow(error.to_string()))
        });
        match applied {
            Ok(()) => report.applied += 1,
            Err(error) => {
                warn!(
                    event_name = "agent.reconcile.skipped_malformed",
                    correlation_id,
                    tool_call_id = %tool_call_id,
                    error = %error,
                    "skipping malformed add_to_cart result"
                );
                report.skipped += 1;
            }
        }
    }

    *processed = seen;
    report
}
