//! Roborace text driver.
//!
//! Runs one game session on the practice course. Reads commands from stdin
//! and writes every published event envelope to stdout as a JSON line.
//! Rejected commands print `{"error": ...}`; logs go to stderr.
//!
//! Usage:
//!   roborace [--config FILE]

use std::env;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roborace::board::layouts::practice_course;
use roborace::config::GameConfig;
use roborace::game::Envelope;
use roborace::protocol::{format_envelope, format_error, format_session_error};
use roborace::protocol::parser::{parse_command, Command};
use roborace::session::{Session, SessionHandle};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config() {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            std::process::exit(1);
        }
    };

    let board = match practice_course() {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "failed to build the practice course");
            std::process::exit(1);
        }
    };

    let handle = Session::spawn(board, config);
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(print_output(handle.subscribe(), line_rx));
    info!("session ready");

    run_commands(&handle, &line_tx).await;

    // Dropping the last handle closes the session, which closes the event
    // stream and lets the printer finish.
    drop(handle);
    drop(line_tx);
    if printer.await.is_err() {
        error!("output task panicked");
    }
}

/// Reads stdin until EOF or `quit`, forwarding each command to the session.
async fn run_commands(handle: &SessionHandle, out: &mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        let result = match cmd {
            Command::Join { name } => handle.join(&name).await.map(|_| ()),
            Command::Start => handle.start().await,
            Command::Act { player, action } => handle.act(player, action).await,
            Command::State => match handle.snapshot().await {
                Ok(snapshot) => {
                    match serde_json::to_string(&snapshot) {
                        Ok(json) => {
                            let _ = out.send(json);
                        }
                        Err(e) => {
                            let _ = out.send(format_error(&e.to_string()));
                        }
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Command::Quit => break,
        };

        if let Err(e) = result {
            let _ = out.send(format_session_error(&e));
        }
    }
}

/// Writes events and reply lines to stdout until the session closes.
async fn print_output(
    mut events: broadcast::Receiver<Envelope>,
    mut replies: mpsc::UnboundedReceiver<String>,
) {
    let mut stdout = tokio::io::stdout();
    let mut replies_open = true;

    loop {
        // Events first, so a reply never overtakes the events it follows.
        let line = tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(envelope) => format_envelope(&envelope),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "output fell behind the event stream");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            reply = replies.recv(), if replies_open => match reply {
                Some(l) => l,
                None => {
                    replies_open = false;
                    continue;
                }
            },
        };
        if write_line(&mut stdout, &line).await.is_err() {
            return;
        }
    }

    while let Ok(line) = replies.try_recv() {
        if write_line(&mut stdout, &line).await.is_err() {
            return;
        }
    }
    let _ = stdout.flush().await;
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

fn load_config() -> Result<GameConfig, String> {
    let args: Vec<String> = env::args().collect();
    let mut path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --config")?;
                path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }

    match path {
        Some(p) => {
            let config = GameConfig::from_json_file(&p).map_err(|e| e.to_string())?;
            info!(path = %p.display(), "loaded config");
            Ok(config)
        }
        None => Ok(GameConfig::default()),
    }
}

fn print_usage() {
    eprintln!("Usage: roborace [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config FILE    Game config as JSON (default: built-in)");
    eprintln!("  --help           Show this help");
    eprintln!();
    eprintln!("Commands (stdin, one per line):");
    eprintln!("  join <name> | leave <p> | start | startpoint <p> <row> <col>");
    eprintln!("  buy <p> <card|none> | program <p> <register> <card> | admin <p> <register>");
    eprintln!("  play <p> <card> | pick <p> <pile>... | rebootdir <p> <dir> | state | quit");
}
