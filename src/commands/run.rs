//! Interactive tracking console.
//!
//! Drives a [`SessionEngine`] over the in-memory backend from stdin, one
//! command per line. The stop prompt reads the next line as the session
//! title; a blank line takes the generated default and `:cancel` keeps
//! tracking.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{info, warn};

use worktrack::accumulator::{format_hm, format_hms};
use worktrack::backend::MemoryBackend;
use worktrack::clock::{Clock, SystemClock};
use worktrack::config::{Config, ConfigError, ConfigLoader};
use worktrack::engine::{
    Collaborators, CommandOutcome, EngineError, PollIntervals, SessionEngine, StopOutcome,
    TitlePrompt,
};
use worktrack::{logging, RemoteConfig};

/// Title-prompt reply that cancels the stop.
const CANCEL_INPUT: &str = ":cancel";

#[derive(Debug, Error)]
enum ConsoleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

type InputLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Reads the session title from the console's input.
struct StdinPrompt {
    lines: InputLines,
}

impl TitlePrompt for StdinPrompt {
    fn ask<'a>(&'a self, prefill: &'a str) -> BoxFuture<'a, Option<String>> {
        async move {
            println!(
                "Title for \"{prefill}\" (blank for a generated title, {CANCEL_INPUT} to keep tracking):"
            );
            prompt_marker("title> ");
            match self.lines.lock().await.next_line().await {
                Ok(Some(line)) if line.trim() == CANCEL_INPUT => None,
                Ok(Some(line)) => Some(line),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "failed to read session title");
                    None
                }
            }
        }
        .boxed()
    }
}

/// Runs the console until `quit` or end of input.
pub(crate) fn run_console_command(config_path: Option<&Path>, task_titles: &[String]) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.logging.level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    match rt.block_on(console(&config, task_titles)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::load_default()?,
    };
    config.validate()?;
    Ok(config)
}

async fn console(config: &Config, task_titles: &[String]) -> Result<(), ConsoleError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = MemoryBackend::new(clock.clone());
    let screenshot_interval = config.tracking.screenshot_interval()?;
    backend.set_remote_config(RemoteConfig {
        screenshot_interval_ms: screenshot_interval.as_millis() as u64,
    });
    for title in task_titles {
        let id = backend.add_task(title.clone(), true);
        info!(id, title = %title, "manual task created");
    }

    let engine = SessionEngine::new(Collaborators::from_memory(backend.clone(), clock));
    engine.mount().await?;
    let pollers = engine.spawn_pollers(PollIntervals::try_from(&config.polling)?);

    let lines: InputLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let prompt = StdinPrompt {
        lines: lines.clone(),
    };
    print_help();
    let result = command_loop(&engine, &backend, &lines, &prompt).await;

    engine.teardown();
    pollers.join().await;
    result
}

async fn command_loop(
    engine: &SessionEngine,
    backend: &MemoryBackend,
    lines: &InputLines,
    prompt: &StdinPrompt,
) -> Result<(), ConsoleError> {
    loop {
        prompt_marker("> ");
        let line = lines.lock().await.next_line().await?;
        let Some(line) = line else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match command {
            "start" => {
                let task_id = match words.next().map(str::parse::<i64>) {
                    None => None,
                    Some(Ok(id)) => Some(id),
                    Some(Err(_)) => {
                        eprintln!("Error: task id must be a number");
                        continue;
                    }
                };
                report_command(engine.start(task_id, None).await, "Started");
            }
            "pause" => report_command(engine.pause().await, "Paused"),
            "resume" => report_command(engine.resume().await, "Resumed"),
            "stop" => report_stop(engine.request_stop(prompt).await),
            "status" => print_status(engine).await,
            "tasks" => print_tasks(engine).await,
            "capture" => {
                backend.capture_screenshot();
                engine.refresh_local_count().await;
                println!("Screenshot captured");
            }
            "help" => print_help(),
            "quit" | "exit" => break,
            other => eprintln!("Unknown command: {other} (type `help`)"),
        }
    }

    if engine.status().await.is_live() {
        warn!("exiting with a session still open");
    }
    Ok(())
}

fn report_command(result: Result<CommandOutcome, EngineError>, done: &str) {
    match result {
        Ok(CommandOutcome::Applied) => println!("{done}"),
        Ok(CommandOutcome::Skipped(reason)) => println!("Nothing to do: {reason}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn report_stop(result: Result<StopOutcome, EngineError>) {
    match result {
        Ok(StopOutcome::Stopped { title }) => println!("Saved \"{title}\""),
        Ok(StopOutcome::Cancelled { resumed: true }) => {
            println!("Save cancelled, tracking resumed")
        }
        Ok(StopOutcome::Cancelled { resumed: false }) => println!("Save cancelled"),
        Ok(StopOutcome::AwaitingTitle { prefill }) => {
            println!("Waiting for a title for \"{prefill}\"")
        }
        Ok(StopOutcome::Skipped(reason)) => println!("Nothing to do: {reason}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

async fn print_status(engine: &SessionEngine) {
    let snap = engine.snapshot().await;
    let title = snap
        .binding
        .as_ref()
        .or(snap.status.current_binding.as_ref())
        .map(|b| b.title.as_str())
        .unwrap_or("-");

    println!("State:        {}", snap.status.state);
    println!("Task:         {title}");
    println!("Elapsed:      {}", format_hms(snap.status.elapsed_ms));
    println!("Paused:       {}", format_hms(snap.status.paused_ms));
    println!("Today:        {}", format_hm(snap.total_today_ms));
    match snap.estimated_screenshots {
        Some(estimated) => println!(
            "Screenshots:  {} (estimated {estimated})",
            snap.screenshots_today
        ),
        None => println!("Screenshots:  {}", snap.screenshots_today),
    }
    if let Some(err) = &snap.last_error {
        println!("Last error:   {err}");
    }
}

async fn print_tasks(engine: &SessionEngine) {
    engine.refresh_tasks().await;
    let tasks = engine.snapshot().await.tasks;
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    for task in tasks {
        let kind = if task.is_manual { "manual" } else { "auto" };
        let tracked = task.duration_ms.map(format_hm).unwrap_or_default();
        println!("{:>4}  {:<6}  {:<8}  {}", task.id, kind, tracked, task.title);
    }
}

fn print_help() {
    println!("Commands: start [task-id], pause, resume, stop, status, tasks, capture, help, quit");
}

fn prompt_marker(marker: &str) {
    print!("{marker}");
    let _ = std::io::stdout().flush();
}
