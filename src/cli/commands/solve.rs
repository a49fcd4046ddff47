//! Solve command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::relay::{example_problem, ProblemRequest, ProblemSubmission, Relay, TraceStep};
use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Options collected from the `solve` command line.
#[derive(Debug, Default)]
pub struct SolveOptions {
    pub problem: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub no_reasoning: bool,
    pub tools: Option<Vec<String>>,
    pub example: Option<usize>,
    pub api_key: Option<String>,
    pub json: bool,
}

impl SolveOptions {
    /// Turn the flags into a validated request, falling back to configured defaults.
    pub fn into_request(self, settings: &Settings) -> crate::Result<ProblemRequest> {
        let problem_text = match self.example {
            Some(n) => example_problem(n)?.to_string(),
            None => self.problem.unwrap_or_default(),
        };

        let submission = ProblemSubmission {
            problem_text,
            model: self.model,
            temperature: self.temperature,
            show_reasoning: self.no_reasoning.then_some(false),
            enabled_tools: self.tools,
        };
        submission.into_request(&settings.solver)
    }
}

/// Run the solve command.
pub async fn run_solve(mut options: SolveOptions, settings: Settings) -> Result<()> {
    let api_key = options.api_key.take();
    let json = options.json;

    let request = match options.into_request(&settings) {
        Ok(request) => request,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    let credential = match preflight::check(Operation::Solve, &settings, api_key.as_deref()) {
        Ok(credential) => credential,
        Err(e) => {
            Output::error(&e.to_string());
            Output::info("Run 'abacus doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let relay = Relay::new(&settings)?;

    if !json {
        Output::info(&format!("Problem: {}", request.problem_text));
    }
    let spinner = if json {
        ProgressBar::hidden()
    } else {
        Output::spinner(&format!("Solving with {}...", request.model.label()))
    };

    let count = AtomicUsize::new(0);
    let show_step = |step: &TraceStep| {
        let n = count.fetch_add(1, Ordering::SeqCst) + 1;
        spinner.suspend(|| Output::trace_step(n, step));
    };
    let observer: Option<&dyn crate::agent::StepObserver> = if json { None } else { Some(&show_step) };

    let result = relay
        .solve_observed(&request, credential.as_ref(), observer)
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(response) if json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Ok(response) => {
            Output::solution(&response);
        }
        Err(e) => {
            Output::error(&format!("Failed to solve problem: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
