//! CLI command implementations.

mod chat;
mod config;
mod doctor;
mod init;
mod list;
mod serve;
mod solve;

pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use init::run_init;
pub use list::{run_examples, run_models};
pub use serve::{router, run_serve, AppState};
pub use solve::{run_solve, SolveOptions};
