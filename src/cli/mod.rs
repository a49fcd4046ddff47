//! CLI module for Abacus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Abacus - Math Problem Solver
///
/// Relays math word problems to a hosted language model that can look things up,
/// calculate and reason step by step before answering.
#[derive(Parser, Debug)]
#[command(name = "abacus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up Abacus and write a default configuration file
    Init,

    /// Check API key and configuration
    Doctor,

    /// Solve a single math problem
    Solve {
        /// The problem to solve (omit when using --example)
        problem: Option<String>,

        /// Model to use (see `abacus models`)
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature between 0.0 and 1.0
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Hide the reasoning trace
        #[arg(long)]
        no_reasoning: bool,

        /// Comma-separated tools to enable (default: all configured tools)
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// Solve preset example N instead (see `abacus examples`)
        #[arg(short, long, conflicts_with = "problem")]
        example: Option<usize>,

        /// API key for this call (overrides config and environment)
        #[arg(long)]
        api_key: Option<String>,

        /// Print the solution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive problem-solving session
    Chat {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// API key for this session (overrides config and environment)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// List preset example problems
    Examples,

    /// List supported models
    Models,

    /// Start the web interface
    Serve {
        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
