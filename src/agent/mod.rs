//! Agent system for solving problems with tool calling.
//!
//! The agent hands the problem and the enabled tools' definitions to a
//! [`ChatModel`], runs whatever tools the model asks for, and feeds the
//! results back until the model answers. Tool choice is entirely the model's.

mod model;
mod runner;

pub use model::{
    system_message, tool_request_message, tool_result_message, user_message, ChatModel,
    ModelCall, ModelReply, ToolInvocation,
};
pub use runner::{Agent, AgentResponse, RunOptions, StepObserver};
