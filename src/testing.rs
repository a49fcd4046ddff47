//! Test doubles shared by unit tests.

use crate::agent::{ChatModel, ModelCall, ModelReply, ToolInvocation};
use crate::error::{AbacusError, Result, UpstreamFailure};
use crate::relay::{Credential, ModelId};
use crate::tools::ToolContext;
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageContent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// What a [`ScriptedModel`] saw on one call.
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub model: ModelId,
    pub temperature: f32,
    pub message_count: usize,
    pub tool_count: usize,
    pub tool_names: Vec<String>,
    pub last_user_text: String,
}

/// A chat model that replays canned replies and counts calls.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenCall>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<SeenCall> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, call: ModelCall<'_>) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let last_user_text = call
            .messages
            .iter()
            .rev()
            .find_map(|m| match m {
                ChatCompletionRequestMessage::User(user) => match &user.content {
                    ChatCompletionRequestUserMessageContent::Text(text) => Some(text.clone()),
                    _ => None,
                },
                _ => None,
            })
            .unwrap_or_default();

        self.seen.lock().unwrap().push(SeenCall {
            model: call.model,
            temperature: call.temperature,
            message_count: call.messages.len(),
            tool_count: call.tools.len(),
            tool_names: call.tools.iter().map(|t| t.function.name.clone()).collect(),
            last_user_text,
        });

        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AbacusError::Upstream(UpstreamFailure::Empty {
                service: "scripted".to_string(),
            }))
        })
    }
}

pub fn answer(text: &str) -> Result<ModelReply> {
    Ok(ModelReply::Answer(text.to_string()))
}

pub fn tool_calls(calls: &[(&str, &str)]) -> Result<ModelReply> {
    Ok(ModelReply::ToolCalls {
        content: None,
        calls: calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolInvocation {
                id: format!("call_{}", i),
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
    })
}

/// Owns the pieces a [`ToolContext`] borrows.
pub struct TestToolContext<'a> {
    chat: &'a dyn ChatModel,
    credential: Credential,
}

impl TestToolContext<'_> {
    pub fn as_ctx(&self) -> ToolContext<'_> {
        ToolContext {
            chat: self.chat,
            model: ModelId::default(),
            temperature: 0.2,
            credential: &self.credential,
        }
    }
}

pub fn tool_context(chat: &dyn ChatModel) -> TestToolContext<'_> {
    TestToolContext {
        chat,
        credential: Credential::parse("gsk_test_key").unwrap(),
    }
}
