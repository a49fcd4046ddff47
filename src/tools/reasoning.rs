//! Step-by-step worked solutions from a secondary model call.

use super::{required_str, Tool, ToolContext, ToolError};
use crate::agent::{user_message, ModelCall, ModelReply};
use crate::config::Prompts;
use crate::error::{AbacusError, UpstreamFailure};
use crate::relay::ToolId;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

/// Asks the same model, without tools, for a teacher-style worked solution.
pub struct MathReasoning {
    prompts: Prompts,
}

impl MathReasoning {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Tool for MathReasoning {
    fn id(&self) -> ToolId {
        ToolId::MathReasoning
    }

    fn description(&self) -> &str {
        "Solve a math problem step-by-step with detailed explanations. Input the full \
        problem statement."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The problem to work through"
                }
            },
            "required": ["question"]
        })
    }

    #[instrument(skip_all, fields(model = %ctx.model))]
    async fn invoke(&self, args: Value, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let question = required_str(&args, "question")?;
        let prompt = self.prompts.reasoning_for(question);

        let message = user_message(prompt)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let call = ModelCall {
            model: ctx.model,
            temperature: ctx.temperature,
            credential: ctx.credential,
            messages: vec![message],
            tools: Vec::new(),
        };

        match ctx.chat.complete(call).await {
            Ok(ModelReply::Answer(text)) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Err(ToolError::Upstream(UpstreamFailure::Empty {
                service: "math_reasoning".to_string(),
            })),
            Err(AbacusError::Upstream(failure)) => Err(ToolError::Upstream(failure)),
            Err(AbacusError::Request(message)) => Err(ToolError::Credential(message)),
            Err(other) => Err(ToolError::Upstream(UpstreamFailure::Transport {
                service: "math_reasoning".to_string(),
                message: other.to_string(),
            })),
        }
    }
}
