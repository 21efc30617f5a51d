use std::sync::Arc;

use pizzabot_core::catalog::CatalogLookup;
use pizzabot_core::domain::cart::{Cart, CartLine};
use pizzabot_core::errors::{ApplicationError, DomainError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::{count_cart_results, latest_reply, validate_history, Message};
use crate::decision::{decide, Decision, SYSTEM_INSTRUCTIONS};
use crate::execution::execute_pending;
use crate::llm::{LlmClient, LlmError};
use crate::reconcile::reconcile;
use crate::tools::{ToolSet, ToolSpec};

pub const DEFAULT_MAX_STEPS: u32 = 8;
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that request.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitingDecision,
    ExecutingTools,
    Reconciling,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnEvent {
    ToolsRequested,
    Replied,
    ToolsExecuted,
    Reconciled,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("invalid turn transition from {from:?} on {event:?}")]
pub struct TransitionError {
    pub from: TurnState,
    pub event: TurnEvent,
}

impl TurnState {
    pub fn on(self, event: TurnEvent) -> Result<TurnState, TransitionError> {
        match (self, event) {
            (Self::AwaitingDecision, TurnEvent::ToolsRequested) => Ok(Self::ExecutingTools),
            (Self::AwaitingDecision, TurnEvent::Replied) => Ok(Self::Reconciling),
            (Self::ExecutingTools, TurnEvent::ToolsExecuted) => Ok(Self::AwaitingDecision),
            (Self::Reconciling, TurnEvent::Reconciled) => Ok(Self::Done),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub correlation_id: String,
    pub user_message: String,
    pub history: Vec<Message>,
    pub cart: Vec<CartLine>,
    pub total: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub cart: Cart,
    pub history: Vec<Message>,
    pub decisions: u32,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("language model unavailable: {0}")]
    ModelUnavailable(#[from] LlmError),
    #[error("turn exceeded {limit} model decisions without producing a reply")]
    LoopBoundExceeded { limit: u32 },
    #[error(transparent)]
    InvalidRequest(#[from] DomainError),
    #[error("turn controller reached an invalid state: {0}")]
    Transition(#[from] TransitionError),
}

impl From<TurnError> for ApplicationError {
    fn from(error: TurnError) -> Self {
        match error {
            TurnError::ModelUnavailable(error) => Self::ModelUnavailable(error.to_string()),
            TurnError::LoopBoundExceeded { limit } => Self::LoopBoundExceeded { limit },
            TurnError::InvalidRequest(error) => Self::Domain(error),
            TurnError::Transition(error) => {
                Self::Domain(DomainError::InvariantViolation(error.to_string()))
            }
        }
    }
}

/// State threaded through one turn.
struct TurnContext {
    history: Vec<Message>,
    cart: Cart,
    processed: usize,
    decisions: u32,
}

/// Runs turns: decision and tool rounds until the model replies, then one reconciliation pass.
///
/// Holds no per-conversation state; history and cart come in with each request and go
/// back out with the outcome.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolSet,
    tool_specs: Vec<ToolSpec>,
    instructions: String,
    max_steps: u32,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn CatalogLookup>, max_steps: u32) -> Self {
        let tools = ToolSet::new(catalog);
        let tool_specs = tools.specs();
        Self {
            llm,
            tools,
            tool_specs,
            instructions: SYSTEM_INSTRUCTIONS.to_string(),
            max_steps: max_steps.max(1),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        let TurnRequest { correlation_id, user_message, history, cart, total } = request;
        let correlation_id = correlation_id.as_str();

        validate_history(&history)?;
        let cart = Cart::from_lines(cart)?;
        if let Some(claimed) = total.filter(|claimed| *claimed != cart.total()) {
            warn!(
                event_name = "agent.turn.total_mismatch",
                correlation_id,
                claimed = %claimed,
                recomputed = %cart.total(),
                "caller total differs from cart lines; using recomputed total"
            );
        }

        let processed = count_cart_results(&history);
        let mut context = TurnContext { history, cart, processed, decisions: 0 };
        context.history.push(Message::user(user_message));
        info!(
            event_name = "agent.turn.started",
            correlation_id,
            history_len = context.history.len(),
            cart_lines = context.cart.lines().len(),
            "turn started"
        );

        let mut state = TurnState::AwaitingDecision;
        while !state.is_terminal() {
            let event = self.step(state, &mut context, correlation_id).await?;
            state = state.on(event)?;
        }

        let reply = latest_reply(&context.history).unwrap_or(FALLBACK_REPLY).to_string();
        info!(
            event_name = "agent.turn.completed",
            correlation_id,
            decisions = context.decisions,
            cart_lines = context.cart.lines().len(),
            total = %context.cart.total(),
            "turn completed"
        );

        Ok(TurnOutcome {
            reply,
            cart: context.cart,
            history: context.history,
            decisions: context.decisions,
        })
    }

    async fn step(
        &self,
        state: TurnState,
        context: &mut TurnContext,
        correlation_id: &str,
    ) -> Result<TurnEvent, TurnError> {
        match state {
            TurnState::AwaitingDecision => {
                if context.decisions >= self.max_steps {
                    warn!(
                        event_name = "agent.turn.loop_bound_exceeded",
                        correlation_id,
                        limit = self.max_steps,
                        "model kept requesting tools"
                    );
                    return Err(TurnError::LoopBoundExceeded { limit: self.max_steps });
                }
                context.decisions += 1;
                let decision = decide(
                    self.llm.as_ref(),
                    &self.instructions,
                    &self.tool_specs,
                    &mut context.history,
                    correlation_id,
                )
                .await?;
                Ok(match decision {
                    Decision::ToolCalls(requested) => {
                        debug!(
                            event_name = "agent.turn.tools_requested",
                            correlation_id,
                            step = context.decisions,
                            requested,
                            "model requested tools"
                        );
                        TurnEvent::ToolsRequested
                    }
                    Decision::Reply => TurnEvent::Replied,
                })
            }
            TurnState::ExecutingTools => {
                execute_pending(&self.tools, &mut context.history, correlation_id).await;
                Ok(TurnEvent::ToolsExecuted)
            }
            TurnState::Reconciling => {
                let report =
                    reconcile(&context.history, &mut context.cart, &mut context.processed, correlation_id);
                info!(
                    event_name = "agent.reconcile.completed",
                    correlation_id,
                    applied = report.applied,
                    skipped = report.skipped,
                    "cart reconciled"
                );
                Ok(TurnEvent::Reconciled)
            }
            TurnState::Done => Err(TransitionError { from: state, event: TurnEvent::Reconciled }.into()),
        }
    }
}
