//! Abacus - Math Problem Solver
//!
//! Relays math word problems to a hosted, OpenAI-compatible chat model (Groq by
//! default) and lets the model call a handful of knowledge tools before it answers.
//!
//! # Overview
//!
//! Abacus allows you to:
//! - Solve a problem from the terminal, with the model's tool calls shown as they happen
//! - Work through problems in an interactive session
//! - Serve a small web page and JSON/SSE API for the same thing
//!
//! Which tool to call, and when, is decided by the remote model. Abacus
//! validates the request, runs the tools the model asks for and shapes the answer.
//!
//! # Architecture
//!
//! - `config` - Settings file and prompt templates
//! - `relay` - Request validation and the [`relay::Relay`] entry point
//! - `agent` - Tool-calling loop over a [`agent::ChatModel`]
//! - `openai` - OpenAI-compatible chat model
//! - `tools` - Wikipedia, arXiv, web search, calculator and step-by-step reasoning
//! - `cli` - Command line and web server
//!
//! # Example
//!
//! ```rust,no_run
//! use abacus::config::Settings;
//! use abacus::relay::{ProblemRequest, Relay};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let relay = Relay::new(&settings)?;
//!     let credential = settings.resolve_credential(None);
//!
//!     let request = ProblemRequest::with_defaults("Solve for x: 2x + 5 = 15", &settings.solver);
//!     let solution = relay.solve(&request, credential.as_ref()).await?;
//!     println!("{}", solution.final_answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod relay;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AbacusError, Result};
