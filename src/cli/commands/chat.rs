//! Interactive problem-solving session.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::relay::{
    example_problem, Credential, ModelId, ProblemRequest, Relay, TraceStep, EXAMPLE_PROBLEMS,
};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

const GREETING: &str =
    "Hi, I'm your Math Problem Solver! Ask me any math question or problem, and I'll solve it step-by-step.";

/// What the user typed at the prompt.
#[derive(Debug, PartialEq)]
enum ChatInput {
    Empty,
    Exit,
    Clear,
    History,
    ListExamples,
    Example(usize),
    Problem(String),
}

fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    let lower = line.to_lowercase();

    match lower.as_str() {
        "" => ChatInput::Empty,
        "exit" | "quit" => ChatInput::Exit,
        "clear" => ChatInput::Clear,
        "history" => ChatInput::History,
        "examples" => ChatInput::ListExamples,
        _ => match lower
            .strip_prefix("example ")
            .and_then(|n| n.trim().parse::<usize>().ok())
        {
            Some(n) => ChatInput::Example(n),
            None => ChatInput::Problem(line.to_string()),
        },
    }
}

/// Run the interactive chat command.
pub async fn run_chat(
    model: Option<String>,
    api_key: Option<String>,
    settings: Settings,
) -> Result<()> {
    let credential = match preflight::check(Operation::Solve, &settings, api_key.as_deref()) {
        Ok(credential) => credential,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'abacus doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let model = match model {
        Some(m) => m.parse::<ModelId>()?,
        None => settings.solver.model,
    };

    let relay = Relay::new(&settings)?;
    let mut session = ChatSession::new(relay, credential, model, settings);

    println!("\n{}", style("Abacus Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type a problem, 'examples' to list presets, 'example N' to solve one, 'clear' to reset, or 'exit' to quit.").dim()
    );
    println!("{} {}\n", style("Abacus:").cyan().bold(), GREETING);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let problem = match parse_input(&input) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Clear => {
                session.history.clear();
                Output::info("Conversation history cleared.");
                continue;
            }
            ChatInput::History => {
                session.print_history();
                continue;
            }
            ChatInput::ListExamples => {
                for (i, example) in EXAMPLE_PROBLEMS.iter().enumerate() {
                    println!("  {} {}", style(format!("{}.", i + 1)).cyan(), example);
                }
                continue;
            }
            ChatInput::Example(n) => match example_problem(n) {
                Ok(problem) => {
                    println!("  {}", style(problem).dim());
                    problem.to_string()
                }
                Err(e) => {
                    Output::warning(&e.to_string());
                    continue;
                }
            },
            ChatInput::Problem(problem) => problem,
        };

        match session.solve(&problem).await {
            Ok(answer) => {
                println!("\n{} {}\n", style("Abacus:").cyan().bold(), answer.trim());
            }
            Err(e) => {
                Output::error(&format!("Error generating response: {}", e));
            }
        }
    }

    Ok(())
}

/// One terminal session. History is for display only; every problem is
/// relayed on its own.
struct ChatSession {
    relay: Relay,
    credential: Option<Credential>,
    model: ModelId,
    settings: Settings,
    history: Vec<(String, String)>,
}

impl ChatSession {
    fn new(relay: Relay, credential: Option<Credential>, model: ModelId, settings: Settings) -> Self {
        Self {
            relay,
            credential,
            model,
            settings,
            history: Vec::new(),
        }
    }

    async fn solve(&mut self, problem: &str) -> crate::Result<String> {
        let request = ProblemRequest::with_defaults(problem, &self.settings.solver).with_model(self.model);

        let spinner = Output::spinner("Thinking...");
        let count = AtomicUsize::new(0);
        let show_step = |step: &TraceStep| {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            spinner.suspend(|| Output::trace_step(n, step));
        };

        let result = self
            .relay
            .solve_observed(&request, self.credential.as_ref(), Some(&show_step))
            .await;
        spinner.finish_and_clear();

        let response = result?;
        self.history
            .push((problem.to_string(), response.final_answer.clone()));
        Ok(response.final_answer)
    }

    fn print_history(&self) {
        if self.history.is_empty() {
            Output::info("No problems solved yet.");
            return;
        }
        for (problem, answer) in &self.history {
            println!("{} {}", style("You:").green().bold(), problem);
            println!("{} {}\n", style("Abacus:").cyan().bold(), answer.trim());
        }
    }
}
