//! The prompt relay: validate, forward to the agent, shape the response.

use super::credential::Credential;
use super::request::{ProblemRequest, ProblemSubmission};
use super::response::SolutionResponse;
use crate::agent::{Agent, ChatModel, RunOptions, StepObserver};
use crate::config::{Prompts, Settings, SolverSettings};
use crate::error::{AbacusError, Result};
use crate::openai::OpenAiChatModel;
use crate::tools::Toolbox;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Relays problems to the hosted model.
///
/// Holds no per-request state, so one instance can be shared behind an `Arc`.
pub struct Relay {
    chat: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    prompts: Prompts,
    max_iterations: usize,
}

impl Relay {
    /// Create a relay from settings, talking to the configured provider.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let chat = Arc::new(OpenAiChatModel::new(&settings.provider)?);
        let toolbox = Toolbox::standard(&settings.tools, &prompts)?;

        info!(
            "Relay ready: provider {} with {} tools",
            settings.provider.name,
            toolbox.len()
        );

        Ok(Self::with_parts(
            chat,
            toolbox,
            prompts,
            settings.solver.max_iterations,
        ))
    }

    /// Create a relay from explicit parts.
    pub fn with_parts(
        chat: Arc<dyn ChatModel>,
        toolbox: Toolbox,
        prompts: Prompts,
        max_iterations: usize,
    ) -> Self {
        Self {
            chat,
            toolbox,
            prompts,
            max_iterations,
        }
    }

    /// Solve one problem.
    pub async fn solve(
        &self,
        request: &ProblemRequest,
        credential: Option<&Credential>,
    ) -> Result<SolutionResponse> {
        self.solve_observed(request, credential, None).await
    }

    /// Parse a raw submission against `defaults`, then solve it.
    pub async fn solve_submission(
        &self,
        submission: ProblemSubmission,
        defaults: &SolverSettings,
        credential: Option<&Credential>,
    ) -> Result<SolutionResponse> {
        let request = submission.into_request(defaults)?;
        self.solve(&request, credential).await
    }

    /// Solve one problem, reporting each trace step as it completes.
    ///
    /// The observer is only called when the request asks for reasoning.
    #[instrument(
        skip_all,
        fields(request_id = tracing::field::Empty, model = %request.model)
    )]
    pub async fn solve_observed(
        &self,
        request: &ProblemRequest,
        credential: Option<&Credential>,
        observer: Option<&dyn StepObserver>,
    ) -> Result<SolutionResponse> {
        request.validate()?;
        let credential = credential.ok_or_else(|| {
            AbacusError::Request(
                "No API key provided. Set GROQ_API_KEY, add it to the config file, or pass one with the request."
                    .to_string(),
            )
        })?;

        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let tools = self.toolbox.select(&request.enabled_tools);
        info!(
            "Solving problem with {} and {} tool(s), temperature {}",
            request.model,
            tools.len(),
            request.temperature
        );

        let agent = Agent::new(self.chat.clone(), tools, &self.prompts.agent_system())
            .with_max_iterations(self.max_iterations)
            .with_final_answer_prompt(&self.prompts.agent.final_answer);

        let options = RunOptions {
            model: request.model,
            temperature: request.temperature,
            credential,
        };
        let observer = observer.filter(|_| request.show_reasoning);

        let started = Instant::now();
        let result = agent.run(&request.problem_text, options, observer).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed after {}ms: {}", elapsed_ms, e);
                return Err(e);
            }
        };

        if response.forced_final {
            warn!("Answer was forced by the iteration cap");
        }
        info!(
            "Solved in {}ms after {} iteration(s), {} tool call(s)",
            elapsed_ms,
            response.iterations,
            response.steps.len()
        );

        let reasoning_trace = if request.show_reasoning {
            response.steps
        } else {
            Vec::new()
        };

        Ok(SolutionResponse {
            request_id,
            final_answer: response.content,
            reasoning_trace,
            model: request.model.id().to_string(),
            iterations: response.iterations,
            elapsed_ms,
            solved_at: Utc::now(),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamFailure;
    use crate::relay::{ModelId, ToolId, TraceStep};
    use crate::testing::{answer, tool_calls, ScriptedModel};
    use crate::tools::Calculator;
    use std::sync::Mutex;
    use std::time::Duration;

    fn relay(model: Arc<ScriptedModel>) -> Relay {
        Relay::with_parts(
            model,
            Toolbox::new().with(Calculator),
            Prompts::default(),
            15,
        )
    }

    fn key() -> Credential {
        Credential::parse("gsk_test_key").unwrap()
    }

    #[tokio::test]
    async fn test_blank_problem_is_rejected_before_any_call() {
        let model = Arc::new(ScriptedModel::new(vec![answer("unused")]));
        let relay = relay(model.clone());

        for text in ["", "   ", "\n\t "] {
            let err = relay
                .solve(&ProblemRequest::new(text), Some(&key()))
                .await
                .unwrap_err();
            assert!(err.is_configuration(), "got {:?}", err);
        }
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_is_configuration_error() {
        let model = Arc::new(ScriptedModel::new(vec![answer("unused")]));
        let relay = relay(model.clone());

        let submission = ProblemSubmission {
            model: Some("gpt-5".to_string()),
            ..ProblemSubmission::new("Solve for x: 2x + 5 = 15")
        };
        let err = relay
            .solve_submission(submission, &SolverSettings::default(), Some(&key()))
            .await
            .unwrap_err();

        assert!(err.is_configuration(), "got {:?}", err);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_temperature_are_rejected() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let relay = relay(model.clone());

        let submission = ProblemSubmission {
            enabled_tools: Some(vec!["calculator".to_string(), "oracle".to_string()]),
            ..ProblemSubmission::new("1 + 1")
        };
        let err = relay
            .solve_submission(submission, &SolverSettings::default(), Some(&key()))
            .await
            .unwrap_err();
        assert!(err.is_configuration());

        let request = ProblemRequest::new("1 + 1").with_temperature(1.5);
        let err = relay.solve(&request, Some(&key())).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_request_error() {
        let model = Arc::new(ScriptedModel::new(vec![answer("x = 5")]));
        let relay = relay(model.clone());

        let err = relay
            .solve(&ProblemRequest::new("Solve for x: 2x + 5 = 15"), None)
            .await
            .unwrap_err();

        assert!(err.is_request(), "got {:?}", err);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_is_relayed() {
        let model = Arc::new(ScriptedModel::new(vec![answer("x = 5")]));
        let relay = relay(model.clone());

        let request = ProblemRequest::new("Solve for x: 2x + 5 = 15")
            .with_model(ModelId::Llama3_70b)
            .with_temperature(0.7);
        let response = relay.solve(&request, Some(&key())).await.unwrap();

        assert_eq!(response.final_answer, "x = 5");
        assert_eq!(response.model, "llama3-70b-8192");
        assert_eq!(response.iterations, 1);
        assert!(response.error.is_none());

        let seen = model.last_call().unwrap();
        assert_eq!(seen.model, ModelId::Llama3_70b);
        assert!((seen.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_hidden_reasoning_clears_trace() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[("calculator", r#"{"expression": "60 * 3"}"#)]),
            answer("180 miles"),
        ]));
        let relay = relay(model);

        let observed = Mutex::new(0);
        let observer = |_: &TraceStep| *observed.lock().unwrap() += 1;

        let request = ProblemRequest::new("train problem").with_reasoning(false);
        let response = relay
            .solve_observed(&request, Some(&key()), Some(&observer))
            .await
            .unwrap();

        assert_eq!(response.final_answer, "180 miles");
        assert!(response.reasoning_trace.is_empty());
        assert_eq!(response.iterations, 2);
        assert_eq!(*observed.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shown_reasoning_keeps_trace() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[("calculator", r#"{"expression": "pi * 4^2"}"#)]),
            answer("About 50.27 square cm"),
        ]));
        let relay = relay(model);

        let request = ProblemRequest::new("circle area").with_reasoning(true);
        let response = relay.solve(&request, Some(&key())).await.unwrap();

        assert_eq!(response.reasoning_trace.len(), 1);
        assert_eq!(response.reasoning_trace[0].tool_used, "calculator");
        assert!(response.reasoning_trace[0].tool_output.starts_with("Answer: 50.26"));
    }

    #[tokio::test]
    async fn test_only_enabled_tools_are_offered() {
        let model = Arc::new(ScriptedModel::new(vec![answer("ok")]));
        let relay = relay(model.clone());

        let request = ProblemRequest::new("1 + 1").with_tools([ToolId::Wikipedia]);
        relay.solve(&request, Some(&key())).await.unwrap();
        assert_eq!(model.last_call().unwrap().tool_count, 0);

        let request = ProblemRequest::new("1 + 1").with_tools([ToolId::Calculator]);
        relay.solve(&request, Some(&key())).await.unwrap();
        assert_eq!(model.last_call().unwrap().tool_names, vec!["calculator"]);
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_surfaced() {
        let model = Arc::new(ScriptedModel::new(vec![Err(UpstreamFailure::Timeout {
            service: "groq".to_string(),
            after: Duration::from_secs(300),
        }
        .into())]));
        let relay = relay(model);

        let err = relay
            .solve(&ProblemRequest::new("Solve for x: 2x + 5 = 15"), Some(&key()))
            .await
            .unwrap_err();

        assert!(err.is_upstream());
        assert!(err.to_string().contains("timed out after 300s"), "got {}", err);
    }
}
