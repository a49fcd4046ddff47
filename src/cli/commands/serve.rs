//! Web interface and JSON API.
//!
//! Serves the single-page UI plus endpoints for solving problems, either in
//! one response or as a stream of Server-Sent Events.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::agent::StepObserver;
use crate::error::{AbacusError, Result};
use crate::relay::{
    ModelId, ProblemSubmission, Relay, SolutionResponse, ToolId, TraceStep, EXAMPLE_PROBLEMS,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    relay: Relay,
    settings: Settings,
}

impl AppState {
    pub fn new(relay: Relay, settings: Settings) -> Self {
        Self { relay, settings }
    }
}

/// Run the web server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if preflight::check(Operation::Serve, &settings, None)?.is_none() {
        Output::warning(&format!(
            "{} is not set. Users will need to enter an API key in the page.",
            settings.provider.api_key_env
        ));
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let relay = Relay::new(&settings)?;
    let app = router(Arc::new(AppState::new(relay, settings)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Abacus Web Server");
    println!();
    Output::success(&format!("Open http://{} in your browser", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Web UI", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Models", "GET  /api/models");
    Output::kv("Tools", "GET  /api/tools");
    Output::kv("Examples", "GET  /api/examples");
    Output::kv("Solve", "POST /api/solve");
    Output::kv("Solve (SSE)", "POST /api/solve/stream");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/tools", get(list_tools))
        .route("/api/examples", get(list_examples))
        .route("/api/solve", post(solve))
        .route("/api/solve/stream", post(solve_stream))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

/// A submission from the page, with the key typed into the sidebar.
#[derive(Deserialize)]
struct SolveBody {
    #[serde(flatten)]
    submission: ProblemSubmission,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ModelsResponse {
    default: ModelId,
    temperature: f32,
    show_reasoning: bool,
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ModelInfo {
    id: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct ToolsResponse {
    tools: Vec<ToolInfo>,
}

#[derive(Serialize)]
struct ToolInfo {
    id: &'static str,
    label: &'static str,
    enabled: bool,
}

#[derive(Serialize)]
struct ExamplesResponse {
    examples: Vec<ExampleInfo>,
}

#[derive(Serialize)]
struct ExampleInfo {
    number: usize,
    problem: &'static str,
}

#[derive(Serialize)]
struct StreamError {
    kind: &'static str,
    error: String,
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let solver = &state.settings.solver;
    Json(ModelsResponse {
        default: solver.model,
        temperature: solver.temperature,
        show_reasoning: solver.show_reasoning,
        models: ModelId::ALL
            .iter()
            .map(|m| ModelInfo {
                id: m.id(),
                label: m.label(),
            })
            .collect(),
    })
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let enabled = &state.settings.solver.enabled_tools;
    Json(ToolsResponse {
        tools: ToolId::ALL
            .iter()
            .map(|t| ToolInfo {
                id: t.name(),
                label: t.label(),
                enabled: enabled.contains(t),
            })
            .collect(),
    })
}

async fn list_examples() -> impl IntoResponse {
    Json(ExamplesResponse {
        examples: EXAMPLE_PROBLEMS
            .iter()
            .enumerate()
            .map(|(i, problem)| ExampleInfo {
                number: i + 1,
                problem,
            })
            .collect(),
    })
}

async fn solve(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SolveBody>, JsonRejection>,
) -> impl IntoResponse {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(e) => {
            let model = state.settings.solver.model.id();
            return (
                status_for(&e),
                Json(SolutionResponse::failed(Uuid::new_v4(), model, e.to_string())),
            )
                .into_response();
        }
    };
    let model = requested_model(&body.submission, &state.settings);
    let credential = state.settings.resolve_credential(body.api_key.as_deref());

    match state
        .relay
        .solve_submission(body.submission, &state.settings.solver, credential.as_ref())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => (
            status_for(&e),
            Json(SolutionResponse::failed(Uuid::new_v4(), &model, e.to_string())),
        )
            .into_response(),
    }
}

async fn solve_stream(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SolveBody>, JsonRejection>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let body = parse_body(body);

    tokio::spawn(async move {
        let step_tx = tx.clone();
        let observer = move |step: &TraceStep| {
            if let Some(event) = sse_event("step", step) {
                let _ = step_tx.send(event);
            }
        };

        let result = solve_body(&state, body, &observer).await;

        let event = match result {
            Ok(response) => sse_event("solution", &response),
            Err(e) => sse_event(
                "error",
                &StreamError {
                    kind: e.kind(),
                    error: e.to_string(),
                },
            ),
        };
        if let Some(event) = event {
            let _ = tx.send(event);
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok(event);
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Turn a body the extractor could not read into a configuration error.
fn parse_body(body: std::result::Result<Json<SolveBody>, JsonRejection>) -> Result<SolveBody> {
    body.map(|Json(body)| body).map_err(|rejection| {
        AbacusError::Configuration(format!("Invalid request body: {}", rejection.body_text()))
    })
}

async fn solve_body(
    state: &AppState,
    body: Result<SolveBody>,
    observer: &dyn StepObserver,
) -> Result<SolutionResponse> {
    let body = body?;
    let credential = state.settings.resolve_credential(body.api_key.as_deref());
    let request = body.submission.into_request(&state.settings.solver)?;
    state
        .relay
        .solve_observed(&request, credential.as_ref(), Some(observer))
        .await
}

/// Serialize one SSE event, logging instead of failing the stream.
fn sse_event<T: Serialize>(name: &str, payload: &T) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            error!("Failed to serialize {} event: {}", name, e);
            None
        }
    }
}

/// HTTP status for each error kind.
fn status_for(err: &AbacusError) -> StatusCode {
    let status = match err {
        AbacusError::Configuration(_) => StatusCode::BAD_REQUEST,
        AbacusError::Request(_) => StatusCode::UNAUTHORIZED,
        AbacusError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    info!("Request failed ({}): {}", status.as_u16(), err);
    status
}

/// The model id to report on a failed response.
fn requested_model(submission: &ProblemSubmission, settings: &Settings) -> String {
    submission
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| settings.solver.model.id().to_string())
}
