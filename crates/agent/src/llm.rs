use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::{Message, ToolCallRequest};
use crate::tools::ToolSpec;

#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    pub instructions: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// The model's next action. Any tool calls mean the model wants tools run before replying.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Completion {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), tool_calls: Vec::new() }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self { text: None, tool_calls }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request timed out")]
    Timeout,
    #[error("model transport failure: {0}")]
    Transport(String),
    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError>;
}

enum Script {
    Queue(VecDeque<Result<Completion, LlmError>>),
    Repeat(Completion),
}

/// Serves pre-recorded completions in order. Used by tests and offline demos.
pub struct ScriptedLlmClient {
    script: Mutex<Script>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(completions: impl IntoIterator<Item = Completion>) -> Self {
        Self::from_results(completions.into_iter().map(Ok))
    }

    pub fn from_results(results: impl IntoIterator<Item = Result<Completion, LlmError>>) -> Self {
        Self::with_script(Script::Queue(results.into_iter().collect()))
    }

    /// Returns the same completion on every call.
    pub fn repeating(completion: Completion) -> Self {
        Self::with_script(Script::Repeat(completion))
    }

    fn with_script(script: Script) -> Self {
        Self { script: Mutex::new(script), seen: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }

    /// Message history passed on each call, oldest call first.
    pub fn seen_messages(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.messages.to_vec());
        }

        let mut script =
            self.script.lock().map_err(|_| LlmError::Transport("script lock poisoned".to_string()))?;
        match &mut *script {
            Script::Queue(queue) => queue
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("scripted completions exhausted".to_string()))),
            Script::Repeat(completion) => Ok(completion.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Completion, CompletionRequest, LlmClient, LlmError, ScriptedLlmClient};
    use crate::conversation::Message;

    fn request(messages: &[Message]) -> CompletionRequest<'_> {
        CompletionRequest { instructions: "be helpful", messages, tools: &[] }
    }

    #[tokio::test]
    async fn scripted_client_replays_queue_then_fails() {
        let client = ScriptedLlmClient::new([Completion::reply("one"), Completion::reply("two")]);
        let history = vec![Message::user("hi")];

        let first = client.complete(request(&history)).await.expect("first");
        let second = client.complete(request(&history)).await.expect("second");
        let third = client.complete(request(&history)).await;

        assert_eq!(first.text.as_deref(), Some("one"));
        assert_eq!(second.text.as_deref(), Some("two"));
        assert!(matches!(third, Err(LlmError::Transport(_))));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn repeating_client_never_runs_dry() {
        let client = ScriptedLlmClient::repeating(Completion::reply("again"));
        for _ in 0..5 {
            let completion = client.complete(request(&[])).await.expect("completion");
            assert_eq!(completion.text.as_deref(), Some("again"));
        }
    }
}
