use std::sync::Arc;

use pizzabot_agent::llm::{Completion, LlmError, ScriptedLlmClient};
use pizzabot_agent::runtime::{AgentRuntime, TurnError, TurnRequest, FALLBACK_REPLY};
use pizzabot_agent::{Message, ToolCallRequest, ToolOutput};
use pizzabot_core::domain::cart::CartLine;
use pizzabot_db::{InMemoryProductRepository, MenuSeed};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn runtime(llm: Arc<ScriptedLlmClient>, max_steps: u32) -> AgentRuntime {
    let catalog = Arc::new(InMemoryProductRepository::new(MenuSeed::products()));
    AgentRuntime::new(llm, catalog, max_steps)
}

fn call(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest { id: id.to_string(), name: name.to_string(), arguments }
}

fn request(message: &str, history: Vec<Message>, cart: Vec<CartLine>, total: Option<Decimal>) -> TurnRequest {
    TurnRequest {
        correlation_id: "req-test".to_string(),
        user_message: message.to_string(),
        history,
        cart,
        total,
    }
}

fn tool_results(history: &[Message]) -> Vec<(&str, &ToolOutput)> {
    history
        .iter()
        .filter_map(|message| match message {
            Message::Tool { tool_call_id, content, .. } => Some((tool_call_id.as_str(), content)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn greeting_gets_plain_reply_and_empty_cart() {
    let llm = Arc::new(ScriptedLlmClient::new([Completion::reply("Olá! Bem-vindo à pizzaria.")]));
    let runtime = runtime(llm.clone(), 8);

    let outcome = runtime.handle_turn(request("Oi!", Vec::new(), Vec::new(), None)).await.expect("turn");

    assert_eq!(outcome.reply, "Olá! Bem-vindo à pizzaria.");
    assert!(outcome.cart.is_empty());
    assert_eq!(outcome.cart.total(), Decimal::ZERO);
    assert_eq!(outcome.history, vec![Message::user("Oi!"), Message::assistant("Olá! Bem-vindo à pizzaria.")]);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn price_question_runs_lookup_and_leaves_cart_alone() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Completion::tool_calls(vec![call("call_price", "get_price", json!({"pizza_name": "Margherita"}))]),
        Completion::reply("A Margherita custa R$ 35.90."),
    ]));
    let runtime = runtime(llm.clone(), 8);

    let outcome = runtime
        .handle_turn(request("how much is Margherita", Vec::new(), Vec::new(), None))
        .await
        .expect("turn");

    assert_eq!(outcome.reply, "A Margherita custa R$ 35.90.");
    assert!(outcome.cart.is_empty());
    assert_eq!(outcome.decisions, 2);

    let results = tool_results(&outcome.history);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_price");
    assert!(matches!(results[0].1, ToolOutput::Text(text) if text.contains("35.90")));

    let second_call = &llm.seen_messages()[1];
    assert!(matches!(second_call.last(), Some(Message::Tool { name, .. }) if name == "get_price"));
}

#[tokio::test]
async fn add_two_calabresa_builds_cart_from_tool_output() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Completion::tool_calls(vec![call(
            "call_add",
            "add_to_cart",
            json!({"pizza_name": "Calabresa", "quantity": 2}),
        )]),
        Completion::reply("Adicionei 2 Calabresa ao carrinho."),
    ]));
    let runtime = runtime(llm, 8);

    let outcome = runtime
        .handle_turn(request("add 2 Calabresa", Vec::new(), Vec::new(), Some(Decimal::ZERO)))
        .await
        .expect("turn");

    assert_eq!(
        outcome.cart.lines(),
        &[CartLine { name: "Calabresa".to_string(), price: Decimal::new(3990, 2), quantity: 2 }]
    );
    assert_eq!(outcome.cart.total(), Decimal::new(7980, 2));

    let results = tool_results(&outcome.history);
    let payload = serde_json::to_value(results[0].1).expect("serialize");
    assert_eq!(
        payload,
        json!({
            "action": "add_to_cart",
            "pizza_name": "Calabresa",
            "price": 39.9,
            "quantity": 2,
            "subtotal": 79.8
        })
    );
}

#[tokio::test]
async fn second_turn_accumulates_without_replaying_earlier_additions() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Completion::tool_calls(vec![call(
            "call_first",
            "add_to_cart",
            json!({"pizza_name": "Calabresa", "quantity": 2}),
        )]),
        Completion::reply("Adicionei 2 Calabresa."),
        Completion::tool_calls(vec![call("call_second", "add_to_cart", json!({"pizza_name": "calabresa"}))]),
        Completion::reply("Mais uma Calabresa adicionada."),
    ]));
    let runtime = runtime(llm, 8);

    let first = runtime
        .handle_turn(request("add 2 Calabresa", Vec::new(), Vec::new(), Some(Decimal::ZERO)))
        .await
        .expect("first turn");
    let total = first.cart.total();
    let second = runtime
        .handle_turn(request("add one more Calabresa", first.history, first.cart.into_lines(), Some(total)))
        .await
        .expect("second turn");

    assert_eq!(
        second.cart.lines(),
        &[CartLine { name: "Calabresa".to_string(), price: Decimal::new(3990, 2), quantity: 3 }]
    );
    assert_eq!(second.cart.total(), Decimal::new(11970, 2));
    assert_eq!(second.reply, "Mais uma Calabresa adicionada.");
}

#[tokio::test]
async fn history_survives_a_json_round_trip_between_turns() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Completion::tool_calls(vec![call("c1", "add_to_cart", json!({"pizza_name": "Pepperoni"}))]),
        Completion::reply("Pepperoni adicionada."),
        Completion::reply("Seu total é R$ 43.90."),
    ]));
    let runtime = runtime(llm, 8);

    let first = runtime
        .handle_turn(request("uma pepperoni", Vec::new(), Vec::new(), None))
        .await
        .expect("first turn");
    let wire = serde_json::to_string(&first.history).expect("serialize history");
    let history: Vec<Message> = serde_json::from_str(&wire).expect("deserialize history");
    let second = runtime
        .handle_turn(request("qual o total?", history, first.cart.into_lines(), None))
        .await
        .expect("second turn");

    assert_eq!(second.cart.lines().len(), 1);
    assert_eq!(second.cart.lines()[0].quantity, 1);
    assert_eq!(second.cart.total(), Decimal::new(4390, 2));
}

#[tokio::test]
async fn several_tools_in_one_round_run_in_order() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Completion::tool_calls(vec![
            call("a", "add_to_cart", json!({"pizza_name": "Margherita"})),
            call("b", "make_coffee", json!({})),
            call("c", "add_to_cart", json!({"pizza_name": "Havaiana"})),
            call("d", "add_to_cart", json!({"pizza_name": "Portuguesa", "quantity": 3})),
        ]),
        Completion::reply("Pronto!"),
    ]));
    let runtime = runtime(llm, 8);

    let outcome = runtime
        .handle_turn(request("margherita, havaiana e 3 portuguesa", Vec::new(), Vec::new(), None))
        .await
        .expect("turn");

    let ids = tool_results(&outcome.history).into_iter().map(|(id, _)| id).collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);

    let names = outcome.cart.lines().iter().map(|line| line.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Margherita", "Portuguesa"]);
    assert_eq!(outcome.cart.total(), Decimal::new(3590, 2) + Decimal::new(4290, 2) * Decimal::from(3));
}

#[tokio::test]
async fn caller_total_is_recomputed_from_lines() {
    let llm = Arc::new(ScriptedLlmClient::new([Completion::reply("Seu carrinho está ok.")]));
    let runtime = runtime(llm, 8);
    let cart = vec![CartLine { name: "Napolitana".to_string(), price: Decimal::new(3790, 2), quantity: 2 }];

    let outcome = runtime
        .handle_turn(request("total?", Vec::new(), cart, Some(Decimal::new(100, 0))))
        .await
        .expect("turn");

    assert_eq!(outcome.cart.total(), Decimal::new(7580, 2));
}

#[tokio::test]
async fn model_failure_fails_the_turn() {
    let llm = Arc::new(ScriptedLlmClient::from_results([Err(LlmError::Status {
        status: 502,
        body: "bad gateway".to_string(),
    })]));
    let runtime = runtime(llm, 8);

    let result = runtime.handle_turn(request("oi", Vec::new(), Vec::new(), None)).await;

    assert!(matches!(result, Err(TurnError::ModelUnavailable(LlmError::Status { status: 502, .. }))));
}

#[tokio::test]
async fn model_failure_after_a_tool_round_discards_partial_cart() {
    let llm = Arc::new(ScriptedLlmClient::from_results([
        Ok(Completion::tool_calls(vec![call("x", "add_to_cart", json!({"pizza_name": "Calabresa"}))])),
        Err(LlmError::Timeout),
    ]));
    let runtime = runtime(llm, 8);

    let result = runtime.handle_turn(request("uma calabresa", Vec::new(), Vec::new(), None)).await;

    assert!(matches!(result, Err(TurnError::ModelUnavailable(LlmError::Timeout))));
}

#[tokio::test]
async fn endless_tool_requests_trip_the_loop_bound() {
    let llm = Arc::new(ScriptedLlmClient::repeating(Completion::tool_calls(vec![call(
        "",
        "list_all",
        json!({}),
    )])));
    let runtime = runtime(llm.clone(), 3);

    let result = runtime.handle_turn(request("menu", Vec::new(), Vec::new(), None)).await;

    assert!(matches!(result, Err(TurnError::LoopBoundExceeded { limit: 3 })));
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn empty_final_text_falls_back_to_apology() {
    let llm = Arc::new(ScriptedLlmClient::new([Completion { text: Some(String::new()), tool_calls: Vec::new() }]));
    let runtime = runtime(llm, 8);

    let outcome = runtime.handle_turn(request("???", Vec::new(), Vec::new(), None)).await.expect("turn");

    assert_eq!(outcome.reply, FALLBACK_REPLY);
}

#[tokio::test]
async fn orphan_tool_result_in_history_is_rejected() {
    let llm = Arc::new(ScriptedLlmClient::new([Completion::reply("unused")]));
    let runtime = runtime(llm.clone(), 8);
    let history = vec![Message::Tool {
        tool_call_id: "ghost".to_string(),
        name: "add_to_cart".to_string(),
        content: ToolOutput::Text("{}".to_string()),
    }];

    let result = runtime.handle_turn(request("oi", history, Vec::new(), None)).await;

    assert!(matches!(result, Err(TurnError::InvalidRequest(_))));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn invalid_caller_cart_is_rejected() {
    let llm = Arc::new(ScriptedLlmClient::new([Completion::reply("unused")]));
    let runtime = runtime(llm, 8);
    let cart = vec![CartLine { name: "Calabresa".to_string(), price: Decimal::new(3990, 2), quantity: 0 }];

    let result = runtime.handle_turn(request("oi", Vec::new(), cart, None)).await;

    assert!(matches!(result, Err(TurnError::InvalidRequest(_))));
}
