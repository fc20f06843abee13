//! Self-play CLI.
//!
//! Plays random-action games on the practice course and writes one JSON
//! summary per game.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N        Number of games to play (default: 10)
//!   --players N      Players per game, 2-6 (default: 4)
//!   --threads N      Number of parallel threads (default: 4)
//!   --seed N         Random seed, 0 for entropy (default: 0)
//!   --max-rounds N   Rounds before a game is abandoned (default: 50)
//!   --config FILE    Game config as JSON (default: built-in)
//!   --output FILE    Output file path (default: stdout)
//!   --quiet          Suppress progress and summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use roborace::config::GameConfig;
use roborace::selfplay::{self, SelfPlayConfig};

fn parse_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => {
                i += 1;
                config.num_games = parse_value(&args, i, "--games");
            }
            "--players" => {
                i += 1;
                config.players = parse_value(&args, i, "--players");
            }
            "--threads" => {
                i += 1;
                config.threads = parse_value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = parse_value(&args, i, "--seed");
            }
            "--max-rounds" => {
                i += 1;
                config.max_rounds = parse_value(&args, i, "--max-rounds");
            }
            "--config" => {
                i += 1;
                let path: String = parse_value(&args, i, "--config");
                config.game = match GameConfig::from_json_file(Path::new(&path)) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                };
            }
            "--output" => {
                i += 1;
                output_path = Some(parse_value(&args, i, "--output"));
            }
            "--quiet" => {
                config.quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if config.players < config.game.min_players || config.players > config.game.max_players {
        eprintln!(
            "--players must be between {} and {}",
            config.game.min_players, config.game.max_players
        );
        std::process::exit(1);
    }

    let quiet = config.quiet;
    if !quiet {
        eprintln!(
            "Self-play: {} games, {} players, max {} rounds, {} threads",
            config.num_games, config.players, config.max_rounds, config.threads
        );
    }

    let start = Instant::now();
    let games = match selfplay::run_self_play(&config) {
        Ok(games) => games,
        Err(e) => {
            eprintln!("failed to build the board: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!(
            "Completed {} games in {:.1}s ({:.1} games/s)",
            games.len(),
            elapsed.as_secs_f64(),
            games.len() as f64 / elapsed.as_secs_f64().max(1e-9)
        );
        selfplay::print_summary(&games);
    }

    let written = match output_path {
        Some(path) => {
            let result = File::create(&path).and_then(|file| {
                let mut writer = BufWriter::new(file);
                selfplay::write_jsonl(&games, &mut writer)
            });
            if result.is_ok() && !quiet {
                eprintln!("Wrote {} games to {}", games.len(), path);
            }
            result
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer)
        }
    };
    if let Err(e) = written {
        eprintln!("failed to write output: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N        Number of games to play (default: 10)");
    eprintln!("  --players N      Players per game, 2-6 (default: 4)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --max-rounds N   Rounds before a game is abandoned (default: 50)");
    eprintln!("  --config FILE    Game config as JSON (default: built-in)");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress progress and summary output");
    eprintln!("  --help           Show this help");
}
