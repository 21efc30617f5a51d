use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use pizzabot_agent::{AgentRuntime, Message, TurnRequest};
use pizzabot_core::domain::cart::CartLine;
use pizzabot_core::errors::{ApplicationError, DomainError, InterfaceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    #[serde(default)]
    pub cart_items: Vec<CartLine>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub cart_items: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub conversation_history: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error_class: &'static str,
    pub message: String,
    pub correlation_id: String,
}

pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error_class: self.0.error_class(),
            message: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn bad_request(message: String, correlation_id: &str) -> ApiError {
    ApiError(ApplicationError::from(DomainError::InvariantViolation(message)).into_interface(correlation_id))
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(ChatState { runtime })
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        warn!(
            event_name = "system.server.chat.rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "chat request body rejected"
        );
        bad_request(rejection.body_text(), &correlation_id)
    })?;

    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty".to_string(), &correlation_id));
    }

    info!(
        event_name = "system.server.chat.received",
        correlation_id = %correlation_id,
        history_len = request.conversation_history.len(),
        cart_lines = request.cart_items.len(),
        "chat request received"
    );

    let outcome = state
        .runtime
        .handle_turn(TurnRequest {
            correlation_id: correlation_id.clone(),
            user_message: request.message,
            history: request.conversation_history,
            cart: request.cart_items,
            total: request.total,
        })
        .await
        .map_err(|error| {
            let interface = ApplicationError::from(error).into_interface(correlation_id.as_str());
            warn!(
                event_name = "system.server.chat.failed",
                correlation_id = %correlation_id,
                error_class = interface.error_class(),
                error = %interface,
                "chat turn failed"
            );
            ApiError(interface)
        })?;

    let total = outcome.cart.total();
    Ok(Json(ChatResponse {
        response: outcome.reply,
        cart_items: outcome.cart.into_lines(),
        total,
        conversation_history: outcome.history,
    }))
}
