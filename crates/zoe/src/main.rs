//! The ZOE command line: pick a mode, a model and tools, then chat with the
//! wallet or let it run a prompt on a timer.

#[macro_use]
extern crate tracing;

use std::io::{self, Write as _};
use std::ops::ControlFlow;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::BufReader;
use zoe::core::AgentEvent;
use zoe::core::tool::ToolOutcome;
use zoe::driver::{self, Schedule};
use zoe::menu::{self, select_many, select_one};
use zoe::{Config, Mode, ProviderKind, Startup, config};

const BAR_CHAR: &str = "▎";
const INTERVALS: [&str; 5] = ["1", "5", "15", "30", "60"];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let startup = match Startup::new(config) {
        Ok(startup) => startup,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();

    let Some(mode) = answered(
        select_one(
            &mut stdin,
            &mut stdout,
            "Select operation mode",
            &["Assistant Mode", "Autonomous Mode"],
        )
        .await,
    ) else {
        return;
    };
    let mode = if mode == 0 {
        Mode::Interactive
    } else {
        Mode::Autonomous
    };

    let labels = ProviderKind::ALL.map(ProviderKind::label);
    let Some(provider) =
        answered(select_one(&mut stdin, &mut stdout, "Select LLM provider", &labels).await)
    else {
        return;
    };
    let provider = ProviderKind::ALL[provider];
    let api_key = match config::api_key(provider.api_key_var()) {
        Ok(api_key) => api_key,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    let keys = startup.registry().list();
    let Some(selected) = answered(
        select_many(
            &mut stdin,
            &mut stdout,
            "Select the tools you want to use (numbers separated by commas)",
            &keys,
        )
        .await,
    ) else {
        return;
    };
    let selected: Vec<&str> = selected.into_iter().map(|idx| keys[idx]).collect();

    let schedule = if mode == Mode::Autonomous {
        let Some(minutes) = answered(
            select_one(
                &mut stdin,
                &mut stdout,
                "Select interval (in minutes)",
                &INTERVALS,
            )
            .await,
        ) else {
            return;
        };
        print!("Enter the prompt to run: ");
        stdout.flush().ok();
        let Some(prompt) = answered(menu::read_line(&mut stdin).await) else {
            return;
        };
        let minutes = INTERVALS[minutes].parse().unwrap_or(1);
        Some(Schedule::every_minutes(prompt, minutes))
    } else {
        None
    };

    info!("using {provider} ({}) with tools {selected:?}", provider.model());

    let mut session = startup
        .session_builder(provider, api_key, mode, selected)
        .on_event(event_printer(mode == Mode::Interactive))
        .build();

    match schedule {
        None => {
            if let Err(err) =
                driver::run_interactive(&mut session, &mut stdin, &mut stdout).await
            {
                error!("terminal error: {err}");
            }
        }
        Some(schedule) => {
            driver::run_autonomous(&mut session, &schedule, |report| {
                let mut stdout = io::stdout();
                match &report.result {
                    Ok(outcome) => {
                        println!(
                            "{}\n",
                            driver::format_tick_line(&report.at, &outcome.text)
                        );
                    }
                    Err(err) => {
                        driver::report_error(&mut stdout, err).ok();
                    }
                }
                ControlFlow::Continue(())
            })
            .await;
        }
    }
}

fn answered<T>(result: io::Result<Option<T>>) -> Option<T> {
    result.unwrap_or_else(|err| {
        error!("error reading input: {err}");
        None
    })
}

/// Prints streamed text and shows a spinner while a tool runs.
fn event_printer(stream_text: bool) -> impl Fn(AgentEvent) + Send + Sync + 'static {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let running: Mutex<Option<(String, ProgressBar)>> = Mutex::new(None);

    move |event| match event {
        AgentEvent::TextDelta(delta) => {
            if stream_text {
                print!("{delta}");
                io::stdout().flush().ok();
            }
        }
        AgentEvent::ToolCallStarted { tool_key, .. } => {
            let progress_bar = ProgressBar::new_spinner();
            progress_bar.set_style(progress_style.clone());
            progress_bar.set_message(format!("🔧 Running {tool_key}..."));
            progress_bar.enable_steady_tick(Duration::from_millis(100));
            if let Ok(mut running) = running.lock() {
                *running = Some((tool_key, progress_bar));
            }
        }
        AgentEvent::ToolCallFinished { outcome, .. } => {
            let Some((tool_key, progress_bar)) =
                running.lock().ok().and_then(|mut running| running.take())
            else {
                return;
            };
            progress_bar.finish_and_clear();
            if let ToolOutcome::Failure { kind, message } = outcome {
                let bar = BAR_CHAR.bright_yellow();
                println!("\n{bar}⚠️  {tool_key}: {kind}: {}", message.bright_white());
            }
        }
    }
}
