mod input;
mod runtime;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hypr_bridge_llm::{BridgeClient, Env};
use hypr_prompter_core::{SessionArgs, SessionMsg, spawn_session};
use hypr_script_align::{BridgeGenerator, CharSpan};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::input::Command;
use crate::runtime::{OfflineGenerator, PrompterEvent, StdoutRuntime};

#[derive(Parser)]
#[command(name = "prompter", about = "Follow a spoken presentation along its script")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read transcript lines from stdin and print alignment events as JSON.
    Live {
        #[arg(long, env = "PROMPTER_SCRIPT")]
        script: PathBuf,

        #[arg(long, env = "PROMPTER_DEBOUNCE_MS")]
        debounce_ms: Option<u64>,

        /// Never call the generation service.
        #[arg(long, env = "PROMPTER_OFFLINE")]
        offline: bool,
    },
    /// Align one piece of spoken text against a script.
    Compare {
        #[arg(long, env = "PROMPTER_SCRIPT")]
        script: PathBuf,

        #[arg(long, default_value_t = 0)]
        index: usize,

        spoken: String,
    },
    /// Generate a bridge for the given skipped char ranges (`start..end`).
    Reconstruct {
        #[arg(long, env = "PROMPTER_SCRIPT")]
        script: PathBuf,

        #[arg(long)]
        at: usize,

        #[arg(required = true, value_parser = parse_range)]
        ranges: Vec<CharSpan>,
    },
}

fn parse_range(value: &str) -> Result<CharSpan, String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected start..end, got {value}"))?;
    let start = start.trim().parse().map_err(|e| format!("{e}"))?;
    let end = end.trim().parse().map_err(|e| format!("{e}"))?;
    Ok(CharSpan::new(start, end))
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generator(offline: bool) -> Arc<dyn BridgeGenerator> {
    if offline {
        return Arc::new(OfflineGenerator);
    }

    let env = Env::from_env().expect("invalid BRIDGE_LLM_* environment");
    let client = BridgeClient::new(&env).expect("failed to build http client");
    tracing::info!(model = client.model(), "bridge_client_ready");
    Arc::new(client)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(error) => tracing::error!(%error, "failed_to_serialize_output"),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    setup_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Live {
            script,
            debounce_ms,
            offline,
        } => live(script, debounce_ms, offline).await,
        Commands::Compare {
            script,
            index,
            spoken,
        } => {
            let reference = read_script(&script).await;
            print_json(&hypr_script_align::compare(&spoken, &reference, index));
        }
        Commands::Reconstruct { script, at, ranges } => {
            let reference = read_script(&script).await;
            let generator = generator(false);
            let result =
                hypr_script_align::reconstruct(generator.as_ref(), &reference, &ranges, at).await;
            print_json(&result);
        }
    }
}

async fn read_script(path: &PathBuf) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(error) => {
            eprintln!("failed to read {}: {error}", path.display());
            std::process::exit(1);
        }
    }
}

async fn live(script: PathBuf, debounce_ms: Option<u64>, offline: bool) {
    let text = read_script(&script).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PrompterEvent>();
    let runtime = Arc::new(StdoutRuntime::new(tx));

    let mut args = SessionArgs::new(text, generator(offline), runtime);
    if let Some(ms) = debounce_ms {
        args.config.trigger.debounce = Duration::from_millis(ms);
    }

    let session = spawn_session(args)
        .await
        .expect("failed to spawn session actor");

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_json(&event);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(%error, "stdin_read_failed");
                break;
            }
        };

        let Some(command) = input::parse(&line) else {
            continue;
        };

        let sent = match command {
            Command::Transcript(event) => session.cast(SessionMsg::Transcript(event)).is_ok(),
            Command::Load(path) => {
                let text = read_script(&PathBuf::from(path)).await;
                session.cast(SessionMsg::LoadScript(text)).is_ok()
            }
            Command::Accept => match hypr_prompter_core::accept(&session).await {
                Ok(None) => {
                    tracing::info!("no_suggestion_to_accept");
                    true
                }
                Ok(Some(_)) => true,
                Err(_) => false,
            },
            Command::Dismiss => hypr_prompter_core::dismiss(&session).await.is_ok(),
            Command::Snapshot => match hypr_prompter_core::snapshot(&session).await {
                Ok(snapshot) => {
                    print_json(&snapshot);
                    true
                }
                Err(_) => false,
            },
            Command::Quit => break,
        };

        if !sent {
            tracing::error!("session_actor_unreachable");
            break;
        }
    }

    // let a generation already in flight land before shutting down
    if let Ok(snapshot) = hypr_prompter_core::snapshot(&session).await
        && snapshot.pending_request.is_some()
    {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    session.stop(None);
    drop(session);
    let _ = printer.await;
}
