//! Agent runner with tool calling loop.

use super::model::{
    system_message, tool_request_message, tool_result_message, user_message, ChatModel, ModelCall,
    ModelReply, ToolInvocation,
};
use crate::error::{AbacusError, Result, UpstreamFailure};
use crate::relay::{Credential, ModelId, TraceStep};
use crate::tools::{Tool, ToolContext, ToolError};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolType, FunctionObject,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives each trace step as soon as the tool returns.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, step: &TraceStep);
}

impl<F> StepObserver for F
where
    F: Fn(&TraceStep) + Send + Sync,
{
    fn on_step(&self, step: &TraceStep) {
        self(step)
    }
}

/// Per-run model options.
#[derive(Clone, Copy)]
pub struct RunOptions<'a> {
    pub model: ModelId,
    pub temperature: f32,
    pub credential: &'a Credential,
}

/// Agent that lets the model call tools until it produces an answer.
pub struct Agent {
    chat: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
    system_prompt: String,
    final_answer_prompt: String,
}

impl Agent {
    /// Create a new agent over the given model and tools.
    pub fn new(chat: Arc<dyn ChatModel>, tools: Vec<Arc<dyn Tool>>, system_prompt: &str) -> Self {
        Self {
            chat,
            tools,
            max_iterations: 15,
            system_prompt: system_prompt.to_string(),
            final_answer_prompt: crate::config::AgentPrompts::default().final_answer,
        }
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the instruction used when the iteration cap forces an answer.
    pub fn with_final_answer_prompt(mut self, prompt: &str) -> Self {
        self.final_answer_prompt = prompt.to_string();
        self
    }

    /// Run the agent on a problem.
    pub async fn run(
        &self,
        problem: &str,
        options: RunOptions<'_>,
        observer: Option<&dyn StepObserver>,
    ) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            system_message(self.system_prompt.clone())?,
            user_message(problem)?,
        ];
        let definitions = self.tool_definitions();

        let mut iterations = 0;
        let mut steps = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                warn!(
                    "Agent hit the iteration cap ({}), asking for a final answer",
                    self.max_iterations
                );
                messages.push(user_message(self.final_answer_prompt.clone())?);
                let content = match self.call_model(&options, messages, Vec::new()).await? {
                    ModelReply::Answer(text) => text,
                    ModelReply::ToolCalls { content, .. } => content.unwrap_or_default(),
                };
                if content.trim().is_empty() {
                    return Err(AbacusError::Upstream(UpstreamFailure::Empty {
                        service: "agent".to_string(),
                    }));
                }
                return Ok(AgentResponse {
                    content,
                    steps,
                    iterations,
                    forced_final: true,
                });
            }

            debug!("Agent iteration {}", iterations);

            let reply = self
                .call_model(&options, messages.clone(), definitions.clone())
                .await?;

            match reply {
                ModelReply::Answer(content) => {
                    return Ok(AgentResponse {
                        content,
                        steps,
                        iterations,
                        forced_final: false,
                    });
                }
                ModelReply::ToolCalls { content, calls } => {
                    messages.push(tool_request_message(content.as_deref(), &calls)?);

                    for call in &calls {
                        let step = self.execute_tool_call(call, &options).await?;
                        messages.push(tool_result_message(&call.id, step.tool_output.clone())?);
                        if let Some(observer) = observer {
                            observer.on_step(&step);
                        }
                        steps.push(step);
                    }
                }
            }
        }
    }

    async fn call_model(
        &self,
        options: &RunOptions<'_>,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ModelReply> {
        self.chat
            .complete(ModelCall {
                model: options.model,
                temperature: options.temperature,
                credential: options.credential,
                messages,
                tools,
            })
            .await
    }

    /// Execute a single tool call and return a record of it.
    ///
    /// Bad arguments and unknown tools become the step's output so the model
    /// can correct itself. Upstream failures end the run.
    async fn execute_tool_call(
        &self,
        call: &ToolInvocation,
        options: &RunOptions<'_>,
    ) -> Result<TraceStep> {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let output = match self.find_tool(&call.name) {
            None => format!("Unknown tool: {}. Available tools: {}", call.name, self.tool_names()),
            Some(tool) => match parse_arguments(&call.arguments) {
                Err(e) => format!("Failed to parse tool arguments: {}", e),
                Ok(args) => {
                    let ctx = ToolContext {
                        chat: self.chat.as_ref(),
                        model: options.model,
                        temperature: options.temperature,
                        credential: options.credential,
                    };
                    match tool.invoke(args, &ctx).await {
                        Ok(output) => output,
                        Err(ToolError::InvalidInput(e)) => {
                            warn!("Tool {} rejected its input: {}", call.name, e);
                            format!("Tool error: {}", e)
                        }
                        Err(ToolError::Upstream(failure)) => return Err(failure.into()),
                        Err(ToolError::Credential(e)) => return Err(AbacusError::Request(e)),
                    }
                }
            },
        };

        Ok(TraceStep {
            tool_used: call.name.clone(),
            tool_input: call.arguments.clone(),
            tool_output: output,
        })
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    fn tool_names(&self) -> String {
        if self.tools.is_empty() {
            return "none".to_string();
        }
        self.tools
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Function definitions for the enabled tools.
    fn tool_definitions(&self) -> Vec<ChatCompletionTool> {
        self.tools
            .iter()
            .map(|tool| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: tool.name().to_string(),
                    description: Some(tool.description().to_string()),
                    parameters: Some(tool.parameters()),
                    strict: None,
                },
            })
            .collect()
    }
}

/// Models sometimes send an empty string for argument-less calls.
fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Every tool call made during execution, in order.
    pub steps: Vec<TraceStep>,
    /// Number of model round-trips used.
    pub iterations: usize,
    /// True when the iteration cap forced the final answer.
    pub forced_final: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{answer, tool_calls, ScriptedModel};
    use crate::tools::Calculator;
    use std::sync::Mutex;

    fn agent(model: Arc<ScriptedModel>) -> Agent {
        Agent::new(model, vec![Arc::new(Calculator)], "You solve math.")
    }

    fn options(credential: &Credential) -> RunOptions<'_> {
        RunOptions {
            model: ModelId::Llama3_8b,
            temperature: 0.0,
            credential,
        }
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let model = Arc::new(ScriptedModel::new(vec![answer("x = 5")]));
        let credential = Credential::parse("gsk_test").unwrap();

        let response = agent(model.clone())
            .run("2x + 5 = 15", options(&credential), None)
            .await
            .unwrap();

        assert_eq!(response.content, "x = 5");
        assert!(response.steps.is_empty());
        assert_eq!(response.iterations, 1);
        let seen = model.last_call().unwrap();
        assert_eq!(seen.model, ModelId::Llama3_8b);
        assert_eq!(seen.tool_names, vec!["calculator"]);
    }

    #[tokio::test]
    async fn test_tool_results_feed_back_in_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[
                ("calculator", r#"{"expression": "5 - 2"}"#),
                ("calculator", r#"{"expression": "7 - 3"}"#),
            ]),
            tool_calls(&[("calculator", r#"{"expression": "3 + 4 + 12 + 2 * 25"}"#)]),
            answer("You have 69 pieces of fruit."),
        ]));
        let credential = Credential::parse("gsk_test").unwrap();

        let seen = Mutex::new(Vec::new());
        let observer = |step: &TraceStep| seen.lock().unwrap().push(step.tool_output.clone());

        let response = agent(model.clone())
            .run("fruit problem", options(&credential), Some(&observer))
            .await
            .unwrap();

        assert_eq!(response.content, "You have 69 pieces of fruit.");
        assert_eq!(response.iterations, 3);
        let outputs: Vec<_> = response.steps.iter().map(|s| s.tool_output.as_str()).collect();
        assert_eq!(outputs, vec!["Answer: 3", "Answer: 4", "Answer: 69"]);
        assert_eq!(*seen.lock().unwrap(), outputs);

        // system + user + (assistant + 2 tool results) + (assistant + 1 tool result)
        assert_eq!(model.last_call().unwrap().message_count, 7);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_fed_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[("calculator", "{not json")]),
            tool_calls(&[("wolfram", r#"{"q": "x"}"#)]),
            tool_calls(&[("calculator", r#"{"expression": "1/0"}"#)]),
            answer("done"),
        ]));
        let credential = Credential::parse("gsk_test").unwrap();

        let response = agent(model)
            .run("p", options(&credential), None)
            .await
            .unwrap();

        assert_eq!(response.steps.len(), 3);
        assert!(response.steps[0].tool_output.starts_with("Failed to parse tool arguments"));
        assert_eq!(
            response.steps[1].tool_output,
            "Unknown tool: wolfram. Available tools: calculator"
        );
        assert!(response.steps[2].tool_output.contains("division by zero"));
        assert_eq!(response.content, "done");
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[("calculator", r#"{"expression": "1"}"#)]),
            tool_calls(&[("calculator", r#"{"expression": "2"}"#)]),
            answer("best effort: 2"),
        ]));
        let credential = Credential::parse("gsk_test").unwrap();

        let response = agent(model.clone())
            .with_max_iterations(2)
            .run("loop forever", options(&credential), None)
            .await
            .unwrap();

        assert!(response.forced_final);
        assert_eq!(response.content, "best effort: 2");
        assert_eq!(response.steps.len(), 2);
        let last = model.last_call().unwrap();
        assert_eq!(last.tool_count, 0);
        assert!(last.last_user_text.contains("final answer"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(UpstreamFailure::Timeout {
            service: "groq".to_string(),
            after: std::time::Duration::from_secs(60),
        }
        .into())]));
        let credential = Credential::parse("gsk_test").unwrap();

        let err = agent(model)
            .run("p", options(&credential), None)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_parse_empty_arguments() {
        assert_eq!(parse_arguments("").unwrap(), serde_json::json!({}));
        assert!(parse_arguments("[oops").is_err());
    }
}
