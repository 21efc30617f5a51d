//! Agent Runtime - LLM-driven order taking for the pizzeria
//!
//! This crate is the conversational core of pizzabot. A turn takes the caller's
//! history, cart and new message, and:
//! - Asks the model for its next action (`decision`)
//! - Runs any requested tools against the catalog (`execution`, `tools`)
//! - Loops until the model replies without tool calls
//! - Derives the cart from structured `add_to_cart` results (`reconcile`)
//!
//! # Key Types
//!
//! - `AgentRuntime` - turn controller (see `runtime` module)
//! - `LlmClient` - pluggable model trait; `OpenAiCompatibleClient` for HTTP, `ScriptedLlmClient` for tests
//! - `Message` - role-tagged conversation history, returned to the caller after every turn
//!
//! # Safety Principle
//!
//! The model never decides cart contents or prices. The cart is derived only from
//! tool results, and prices come from the catalog.

pub mod conversation;
pub mod decision;
pub mod execution;
pub mod llm;
pub mod openai;
pub mod reconcile;
pub mod runtime;
pub mod tools;

pub use conversation::{Message, ToolCallRequest, ToolOutput};
pub use llm::{Completion, CompletionRequest, LlmClient, LlmError, ScriptedLlmClient};
pub use openai::OpenAiCompatibleClient;
pub use runtime::{AgentRuntime, TurnError, TurnOutcome, TurnRequest, DEFAULT_MAX_STEPS, FALLBACK_REPLY};
pub use tools::{CartAddition, ToolKind, ToolSet};
