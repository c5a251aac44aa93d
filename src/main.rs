use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::{Notify, mpsc};
use tokio::task::LocalSet;

use examtimer::config::{Config, default_config_path};
use examtimer::countdown::{self, Countdown, State};
use examtimer::duration::{format_duration, parse_duration};
use examtimer::{LocalScheduler, TerminalRenderer, logging};

type Timer = Countdown<LocalScheduler, TerminalRenderer<std::io::Stdout>>;

#[derive(Parser)]
#[command(version, about = "Exam countdown timer that ticks at preset marks")]
struct Cli {
    /// Config file, defaults to examtimer/config.json in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not run the start/finish hooks
    #[arg(long, global = true)]
    no_hooks: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one countdown, e.g. `start 25m`, `start 90`, `start 1m30s`
    Start { duration: String },
    /// Print the ticks a countdown would show and when they fire
    Plan {
        duration: String,
        #[arg(long)]
        json: bool,
    },
    /// Start and reset countdowns from stdin
    Interactive,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    logging::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    LocalSet::new().run_until(run(cli, config)).await
}

async fn run(cli: Cli, config: Config) -> Result<(), String> {
    if let Some(Commands::Plan { duration, json }) = &cli.command {
        return print_plan(&config, duration, *json);
    }

    let mut countdown = Countdown::from_config(&config, LocalScheduler, TerminalRenderer::stdout())
        .map_err(|e| e.to_string())?;
    if !cli.no_hooks {
        countdown = countdown.with_hooks(config.hooks.clone());
    }

    let interrupt = Arc::new(Notify::new());
    let handler = Arc::clone(&interrupt);
    ctrlc::set_handler(move || handler.notify_one())
        .map_err(|e| format!("failed to set Ctrl-C handler: {e}"))?;

    match cli.command {
        Some(Commands::Start { duration }) => run_once(countdown, &duration, &interrupt).await,
        _ => interactive(countdown, &interrupt).await,
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    Config::load(&path).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "using default config");
        Config::default()
    })
}

fn print_plan(config: &Config, input: &str, json: bool) -> Result<(), String> {
    let total_secs = parse_duration(input).map_err(|e| e.to_string())?;
    let generator = config.generator().map_err(|e| e.to_string())?;
    let lead = Duration::from_millis(config.anim_duration_ms);
    let planned = countdown::plan(&generator, total_secs, lead).map_err(|e| e.to_string())?;

    if json {
        let out = serde_json::to_string_pretty(&planned).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    println!(
        "{} countdown, {} ticks",
        format_duration(total_secs),
        planned.len()
    );
    for p in &planned {
        println!(
            "  +{:>8.1}s  {:>4}{}  ({}s left)",
            p.delay_ms as f64 / 1000.0,
            p.tick.label,
            p.tick.units.suffix(),
            p.tick.time
        );
    }
    Ok(())
}

async fn run_once(mut countdown: Timer, input: &str, interrupt: &Notify) -> Result<(), String> {
    let total_secs = countdown
        .start(input)
        .map_err(|e| e.to_string())?
        .total_secs();
    println!(
        "⏳ Starting {} countdown... (Ctrl-C to reset)",
        format_duration(total_secs)
    );

    let done = countdown.completion().ok_or("countdown did not start")?;
    tokio::select! {
        _ = done.notified() => {}
        _ = interrupt.notified() => {
            countdown.reset();
            println!("\n🛑 Countdown reset.");
        }
    }
    Ok(())
}

async fn interactive(mut countdown: Timer, interrupt: &Notify) -> Result<(), String> {
    println!("Enter a duration (90, 25m, 1m30s) to start, 'r' to reset, 'q' to quit.");
    let mut lines = spawn_stdin_reader();

    loop {
        let done = countdown.completion();
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                match line.trim() {
                    "" => {}
                    "q" | "quit" | "exit" => break,
                    "r" | "reset" => {
                        if countdown.reset() {
                            println!("\n🛑 Countdown reset.");
                        } else {
                            println!("Nothing to reset.");
                        }
                    }
                    input => match countdown.start(input) {
                        Ok(session) => println!(
                            "⏳ Starting {} countdown...",
                            format_duration(session.total_secs())
                        ),
                        Err(err) => println!("Error: {err}"),
                    },
                }
            }
            _ = wait_for(done.as_deref()) => {
                println!("Type 'r' to reset or 'q' to quit.");
            }
            _ = interrupt.notified() => {
                if countdown.state() == State::Setup {
                    break;
                }
                countdown.reset();
                println!("\n🛑 Countdown reset.");
            }
        }
    }

    countdown.reset();
    Ok(())
}

async fn wait_for(done: Option<&Notify>) {
    match done {
        Some(done) => done.notified().await,
        None => std::future::pending().await,
    }
}

// Blocking stdin reads cannot be cancelled, so they run on a detached thread
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
