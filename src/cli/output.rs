//! CLI output formatting utilities.

use crate::relay::{SolutionResponse, TraceStep};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one reasoning step as it happens.
    pub fn trace_step(index: usize, step: &TraceStep) {
        println!(
            "  {} {} {}",
            style(format!("[{}]", index)).dim(),
            style(&step.tool_used).cyan().bold(),
            style(content_preview(&step.tool_input, 120)).dim()
        );
        println!("      {}", content_preview(&step.tool_output, 200));
    }

    /// Print a solution with its footer.
    pub fn solution(response: &SolutionResponse) {
        println!("\n{}\n", response.final_answer.trim());
        println!(
            "{}",
            style(format!(
                "{} · {} iteration(s) · {}",
                response.model,
                response.iterations,
                format_elapsed(response.elapsed_ms)
            ))
            .dim()
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format elapsed milliseconds to a human-readable string.
fn format_elapsed(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let secs = total_seconds % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else if total_seconds > 0 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Flatten and truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
