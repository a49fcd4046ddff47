//! Doctor command - verify credential and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::relay::ModelId;
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Abacus Doctor");
    println!();
    println!("Checking API key and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let group = vec![check_api_key(settings), check_provider(settings)];
    for check in &group {
        check.print();
    }
    checks.extend(group);

    println!();

    println!("{}", style("Solver").bold());
    let group = check_solver(settings);
    for check in &group {
        check.print();
    }
    checks.extend(group);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Abacus.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Abacus is ready to use.");
    }

    Ok(())
}

/// Check that a credential can be resolved.
fn check_api_key(settings: &Settings) -> CheckResult {
    let env = &settings.provider.api_key_env;
    match settings.resolve_credential(None) {
        Some(credential) => {
            let source = if settings.provider.api_key.is_some() {
                "config file"
            } else {
                env.as_str()
            };
            CheckResult::ok(
                "API key",
                &format!("configured via {} ({})", source, credential.masked()),
            )
        }
        None => CheckResult::error(
            "API key",
            "not set",
            &format!("Set with: export {}='gsk_...' or add it to a .env file", env),
        ),
    }
}

/// Check that the provider endpoint looks usable.
fn check_provider(settings: &Settings) -> CheckResult {
    let name = format!("Provider ({})", settings.provider.name);
    match url::Url::parse(&settings.provider.api_base) {
        Ok(url) if url.scheme() == "https" => CheckResult::ok(&name, url.as_str()),
        Ok(url) => CheckResult::warning(
            &name,
            &format!("{} (not https)", url),
            "The API key is sent with every request",
        ),
        Err(e) => CheckResult::error(
            &name,
            &format!("invalid api_base: {}", e),
            "Fix [provider] api_base in the config file",
        ),
    }
}

/// Check solver defaults.
fn check_solver(settings: &Settings) -> Vec<CheckResult> {
    let solver = &settings.solver;
    let mut results = vec![CheckResult::ok(
        "Default model",
        &format!("{} ({})", solver.model.id(), solver.model.label()),
    )];

    if (0.0..=1.0).contains(&solver.temperature) {
        results.push(CheckResult::ok(
            "Temperature",
            &format!("{}", solver.temperature),
        ));
    } else {
        results.push(CheckResult::error(
            "Temperature",
            &format!("{} is out of range", solver.temperature),
            "Set [solver] temperature between 0.0 and 1.0",
        ));
    }

    if solver.enabled_tools.is_empty() {
        results.push(CheckResult::warning(
            "Tools",
            "none enabled",
            "The model will answer without looking anything up",
        ));
    } else {
        let names: Vec<_> = solver.enabled_tools.iter().map(|t| t.name()).collect();
        results.push(CheckResult::ok("Tools", &names.join(", ")));
    }

    let known: Vec<_> = ModelId::ALL.iter().map(|m| m.id()).collect();
    results.push(CheckResult::ok("Available models", &known.join(", ")));

    results
}

/// Check if config file exists.
fn check_config_file(config_path: Option<&PathBuf>) -> CheckResult {
    let config_path = config_path
        .cloned()
        .unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: abacus init (or abacus config edit)",
        )
    }
}
