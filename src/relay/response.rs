//! Solutions returned by the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tool invocation made while answering a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Name of the tool called.
    pub tool_used: String,
    /// Arguments as sent by the model.
    pub tool_input: String,
    /// What the tool returned (or the error fed back to the model).
    pub tool_output: String,
}

impl std::fmt::Display for TraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tool_used, self.tool_input)
    }
}

/// The answer to exactly one problem request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionResponse {
    pub request_id: Uuid,
    pub final_answer: String,
    /// Tool calls in invocation order. Empty unless reasoning was requested.
    #[serde(default)]
    pub reasoning_trace: Vec<TraceStep>,
    pub model: String,
    /// Number of model round-trips.
    pub iterations: usize,
    pub elapsed_ms: u64,
    pub solved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SolutionResponse {
    /// A response carrying only an error, for surfaces that render failures inline.
    pub fn failed(request_id: Uuid, model: &str, error: String) -> Self {
        Self {
            request_id,
            final_answer: String::new(),
            reasoning_trace: Vec::new(),
            model: model.to_string(),
            iterations: 0,
            elapsed_ms: 0,
            solved_at: Utc::now(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_step_display() {
        let step = TraceStep {
            tool_used: "calculator".to_string(),
            tool_input: r#"{"expression": "2 + 3"}"#.to_string(),
            tool_output: "5".to_string(),
        };
        assert_eq!(format!("{}", step), r#"calculator({"expression": "2 + 3"})"#);
    }

    #[test]
    fn test_failed_response_serializes_error() {
        let response = SolutionResponse::failed(Uuid::nil(), "gemma2-9b-it", "boom".to_string());
        assert!(response.is_error());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["final_answer"], "");
        assert_eq!(json["reasoning_trace"].as_array().unwrap().len(), 0);
    }
}
