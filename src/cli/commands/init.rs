//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Abacus Setup");
    println!();
    println!("Welcome to Abacus! Let's make sure everything is configured correctly.\n");

    // Step 1: Check API key
    println!("{}", style("Step 1: Checking API configuration").bold().cyan());
    println!();

    let key_env = &settings.provider.api_key_env;
    match settings.resolve_credential(None) {
        Some(credential) => {
            Output::success(&format!("API key is configured ({})", credential.masked()));
        }
        None => {
            Output::warning(&format!("{} environment variable is not set.", key_env));
            println!();
            println!("  Abacus sends problems to {} and needs an API key.", settings.provider.name);
            println!(
                "  Get your API key from: {}",
                style("https://console.groq.com/keys").underlined()
            );
            println!();
            println!("  Set it in your shell configuration or a .env file:");
            println!("  {}", style(format!("export {}='gsk_...'", key_env)).green());
            println!();

            if !prompt_continue("Continue without API key?")? {
                println!();
                Output::info("Setup cancelled. Set your API key and run 'abacus init' again.");
                return Ok(());
            }
        }
    }

    println!();

    // Step 2: Create config file
    println!("{}", style("Step 2: Configuration file").bold().cyan());
    println!();

    let config_path = config_path
        .cloned()
        .unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("abacus config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    // Summary
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check configuration", style("abacus doctor").cyan());
    println!("  {} See the preset problems", style("abacus examples").cyan());
    println!(
        "  {} Solve your first problem",
        style("abacus solve \"Solve for x: 2x + 5 = 15\"").cyan()
    );
    println!("  {} Open the web interface", style("abacus serve").cyan());
    println!();
    println!("For more help: {}", style("abacus --help").cyan());

    Ok(())
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }
}
