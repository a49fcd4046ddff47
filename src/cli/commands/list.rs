//! List commands: preset examples and supported models.

use crate::cli::Output;
use crate::config::Settings;
use crate::relay::{ModelId, EXAMPLE_PROBLEMS};
use console::style;

/// Run the examples command.
pub fn run_examples() {
    Output::header(&format!("Example Problems ({})", EXAMPLE_PROBLEMS.len()));
    println!();

    for (i, problem) in EXAMPLE_PROBLEMS.iter().enumerate() {
        println!("  {} {}", style(format!("{}.", i + 1)).cyan().bold(), problem);
    }

    println!();
    Output::info("Solve one with: abacus solve --example <N>");
}

/// Run the models command.
pub fn run_models(settings: &Settings) {
    Output::header("Supported Models");
    println!();

    for model in ModelId::ALL {
        let marker = if model == settings.solver.model {
            style("(default)").green().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {:<20} {} {}",
            style("*").cyan(),
            model.id(),
            style(model.label()).dim(),
            marker
        );
    }

    println!();
    Output::kv("Provider", &settings.provider.name);
    Output::kv("API base", &settings.provider.api_base);
}
