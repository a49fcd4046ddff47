//! Prompt relay: the request and response types and the [`Relay`] that
//! carries a problem to the hosted model and back.

mod credential;
mod engine;
mod request;
mod response;

pub use credential::Credential;
pub use engine::Relay;
pub use request::{
    example_problem, ModelId, ProblemRequest, ProblemSubmission, ToolId, EXAMPLE_PROBLEMS,
};
pub use response::{SolutionResponse, TraceStep};
