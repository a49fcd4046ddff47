//! OpenAI-compatible chat client (Groq by default).

use crate::agent::{ChatModel, ModelCall, ModelReply, ToolInvocation};
use crate::config::ProviderSettings;
use crate::error::{AbacusError, Result, UpstreamFailure};
use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::CreateChatCompletionRequestArgs, Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, instrument};

/// Create the HTTP client used for model requests.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AbacusError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Backoff policy that gives up after the first failure.
///
/// Rate-limit responses surface to the caller as-is instead of being retried.
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Chat model served by an OpenAI-compatible `/chat/completions` endpoint.
///
/// The credential arrives with each call, so one instance serves every
/// user of the process.
pub struct OpenAiChatModel {
    http: reqwest::Client,
    provider: String,
    api_base: String,
    timeout: Duration,
}

impl OpenAiChatModel {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            http: create_http_client(settings.timeout())?,
            provider: settings.name.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
        })
    }

    fn client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_base(&self.api_base)
            .with_api_key(api_key);
        Client::with_config(config)
            .with_http_client(self.http.clone())
            .with_backoff(no_retry())
    }

    /// Sort a client error into the relay's error kinds.
    fn classify(&self, err: OpenAIError) -> AbacusError {
        match err {
            OpenAIError::Reqwest(e) => {
                UpstreamFailure::from_reqwest(&self.provider, &e, self.timeout).into()
            }
            OpenAIError::ApiError(api) => {
                let code = api.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
                let kind = api.r#type.clone().unwrap_or_default();
                if code.contains("invalid_api_key") || kind.contains("authentication") {
                    AbacusError::Request(format!(
                        "{} rejected the API key: {}",
                        self.provider, api.message
                    ))
                } else {
                    UpstreamFailure::Transport {
                        service: self.provider.clone(),
                        message: api.message,
                    }
                    .into()
                }
            }
            other => UpstreamFailure::Transport {
                service: self.provider.clone(),
                message: other.to_string(),
            }
            .into(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip_all, fields(provider = %self.provider, model = %call.model, messages = call.messages.len()))]
    async fn complete(&self, call: ModelCall<'_>) -> Result<ModelReply> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(call.model.id())
            .messages(call.messages)
            .temperature(call.temperature);
        if !call.tools.is_empty() {
            args.tools(call.tools);
        }
        let request = args
            .build()
            .map_err(|e| AbacusError::Configuration(format!("Invalid model request: {}", e)))?;

        let response = self
            .client(call.credential.expose_secret())
            .chat()
            .create(request)
            .await
            .map_err(|e| self.classify(e))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamFailure::Empty {
                service: self.provider.clone(),
            })?;

        let message = choice.message;
        match message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                debug!("Model requested {} tool call(s)", calls.len());
                Ok(ModelReply::ToolCalls {
                    content: message.content,
                    calls: calls
                        .into_iter()
                        .map(|c| ToolInvocation {
                            id: c.id,
                            name: c.function.name,
                            arguments: c.function.arguments,
                        })
                        .collect(),
                })
            }
            _ => Ok(ModelReply::Answer(message.content.unwrap_or_default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::user_message;
    use crate::relay::{Credential, ModelId};
    use crate::testing::spawn_server;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn completion(message: Value) -> Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gemma2-9b-it",
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        })
    }

    async fn model_for(router: Router, timeout_secs: u64) -> OpenAiChatModel {
        let base = spawn_server(router).await;
        OpenAiChatModel::new(&ProviderSettings {
            api_base: format!("{}/v1", base),
            timeout_secs,
            ..ProviderSettings::default()
        })
        .unwrap()
    }

    fn call(credential: &Credential) -> ModelCall<'_> {
        ModelCall {
            model: ModelId::Gemma2_9b,
            temperature: 0.2,
            credential,
            messages: vec![user_message("Solve for x: 2x + 5 = 15").unwrap()],
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "gemma2-9b-it");
                Json(completion(json!({"role": "assistant", "content": "x = 5"})))
            }),
        );
        let model = model_for(router, 30).await;
        let credential = Credential::parse("gsk_test").unwrap();

        let reply = model.complete(call(&credential)).await.unwrap();
        assert_eq!(reply, ModelReply::Answer("x = 5".to_string()));
    }

    #[tokio::test]
    async fn test_tool_calls_are_parsed() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(completion(json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "calculator", "arguments": "{\"expression\":\"10/2\"}"}
                    }]
                })))
            }),
        );
        let model = model_for(router, 30).await;
        let credential = Credential::parse("gsk_test").unwrap();

        match model.complete(call(&credential)).await.unwrap() {
            ModelReply::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].name, "calculator");
                assert_eq!(calls[0].arguments, r#"{"expression":"10/2"}"#);
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_timeout() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(completion(json!({"role": "assistant", "content": "too late"})))
            }),
        );
        let base = spawn_server(router).await;
        let mut model = OpenAiChatModel::new(&ProviderSettings {
            api_base: format!("{}/v1", base),
            ..ProviderSettings::default()
        })
        .unwrap();
        model.http = create_http_client(Duration::from_millis(200)).unwrap();
        model.timeout = Duration::from_millis(200);
        let credential = Credential::parse("gsk_test").unwrap();

        let err = model.complete(call(&credential)).await.unwrap_err();
        assert!(err.is_upstream(), "got {:?}", err);
        assert!(err.to_string().contains("timed out"), "got {}", err);
    }

    #[tokio::test]
    async fn test_invalid_key_is_request_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {
                        "message": "Invalid API Key",
                        "type": "invalid_request_error",
                        "code": "invalid_api_key"
                    }})),
                )
            }),
        );
        let model = model_for(router, 30).await;
        let credential = Credential::parse("gsk_wrong").unwrap();

        let err = model.complete(call(&credential)).await.unwrap_err();
        assert!(err.is_request(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_rejected_request_is_upstream() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {
                        "message": "The model has been decommissioned",
                        "type": "invalid_request_error",
                        "code": "model_decommissioned"
                    }})),
                )
            }),
        );
        let model = model_for(router, 30).await;
        let credential = Credential::parse("gsk_test").unwrap();

        let err = model.complete(call(&credential)).await.unwrap_err();
        assert!(err.is_upstream(), "got {:?}", err);
        assert!(err.to_string().contains("decommissioned"));
    }

    #[tokio::test]
    async fn test_rate_limit_fails_without_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({"error": {
                            "message": "Rate limit reached for model gemma2-9b-it",
                            "type": "tokens",
                            "code": "rate_limit_exceeded"
                        }})),
                    )
                }
            }),
        );
        let model = model_for(router, 30).await;
        let credential = Credential::parse("gsk_test").unwrap();

        let err = tokio::time::timeout(Duration::from_secs(10), model.complete(call(&credential)))
            .await
            .expect("rate-limited call should fail promptly")
            .unwrap_err();
        assert!(err.is_upstream(), "got {:?}", err);
        assert!(err.to_string().contains("Rate limit reached"), "got {}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
