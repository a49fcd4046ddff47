//! The chat model seam between the agent loop and the provider.

use crate::error::{AbacusError, Result};
use crate::relay::{Credential, ModelId};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, FunctionCall,
};
use async_trait::async_trait;

/// Everything needed for one chat completion.
pub struct ModelCall<'a> {
    pub model: ModelId,
    pub temperature: f32,
    pub credential: &'a Credential,
    pub messages: Vec<ChatCompletionRequestMessage>,
    /// Tool definitions offered to the model. Empty means plain completion.
    pub tools: Vec<ChatCompletionTool>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// What the model sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A final textual answer.
    Answer(String),
    /// One or more tool calls, with any text the model wrote alongside them.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolInvocation>,
    },
}

/// A hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, call: ModelCall<'_>) -> Result<ModelReply>;
}

pub fn system_message(content: impl Into<String>) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(content.into())
        .build()
        .map_err(build_error)?
        .into())
}

pub fn user_message(content: impl Into<String>) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content.into())
        .build()
        .map_err(build_error)?
        .into())
}

/// The assistant turn that requested `calls`, echoed back into the history.
pub fn tool_request_message(
    content: Option<&str>,
    calls: &[ToolInvocation],
) -> Result<ChatCompletionRequestMessage> {
    let tool_calls: Vec<ChatCompletionMessageToolCall> = calls
        .iter()
        .map(|call| ChatCompletionMessageToolCall {
            id: call.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        })
        .collect();

    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
    args.tool_calls(tool_calls);
    if let Some(text) = content.filter(|t| !t.trim().is_empty()) {
        args.content(text.to_string());
    }
    Ok(args.build().map_err(build_error)?.into())
}

pub fn tool_result_message(
    tool_call_id: &str,
    content: impl Into<String>,
) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestToolMessageArgs::default()
        .tool_call_id(tool_call_id)
        .content(content.into())
        .build()
        .map_err(build_error)?
        .into())
}

fn build_error(e: async_openai::error::OpenAIError) -> AbacusError {
    AbacusError::Configuration(format!("Failed to build chat message: {}", e))
}
