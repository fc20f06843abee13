//! Integration tests for the roborace text driver.
//!
//! Spawns the binary, feeds commands on stdin, and checks the JSON lines it
//! prints on stdout.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use serde_json::Value;

/// Sends a sequence of commands to the driver and collects stdout lines.
fn run_driver(args: &[&str], commands: &[&str]) -> (bool, Vec<String>) {
    let exe = env!("CARGO_BIN_EXE_roborace");
    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start roborace");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for cmd in commands {
        // The driver may already have exited on a bad argument.
        if writeln!(stdin, "{}", cmd).is_err() {
            break;
        }
    }
    let _ = stdin.flush();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    (status.success(), lines)
}

fn run(commands: &[&str]) -> Vec<Value> {
    let (ok, lines) = run_driver(&[], commands);
    assert!(ok, "driver exited with failure");
    lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|_| panic!("not JSON: {}", l)))
        .collect()
}

fn events_of<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines
        .iter()
        .filter(|l| l["event"]["type"] == kind)
        .map(|l| &l["event"])
        .collect()
}

fn errors(lines: &[Value]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|l| l.get("error").and_then(|e| e.as_str()).map(String::from))
        .collect()
}

#[test]
fn join_reports_player_and_figure() {
    let lines = run(&["join Ada", "join Bob", "quit"]);
    let joined = events_of(&lines, "playerJoined");
    assert_eq!(joined.len(), 2);
    assert_eq!(joined[0]["player"], 1);
    assert_eq!(joined[0]["name"], "Ada");
    assert_eq!(joined[1]["player"], 2);
    assert_ne!(joined[0]["figure"], joined[1]["figure"]);
    assert_eq!(lines[0]["audience"]["to"], "all");
}

#[test]
fn start_without_players_prints_error() {
    let lines = run(&["start", "quit"]);
    assert_eq!(errors(&lines), vec!["need at least 2 players, have 0".to_string()]);
}

#[test]
fn setup_to_programming() {
    let lines = run(&[
        "join Ada",
        "join Bob",
        "start",
        "startpoint 1 1 1",
        "startpoint 2 2 0",
        // Upgrade order follows antenna distance; one of these is out of turn.
        "buy 1 none",
        "buy 2 none",
        "buy 1 none",
        "state",
    ]);

    let phases: Vec<&str> = events_of(&lines, "phaseChanged")
        .iter()
        .filter_map(|e| e["phase"].as_str())
        .collect();
    assert_eq!(phases, vec!["setup", "upgrade", "programming"]);

    let moved = events_of(&lines, "robotMoved");
    assert!(moved
        .iter()
        .any(|e| e["player"] == 1 && e["position"]["row"] == 1 && e["position"]["col"] == 1));

    // Hands go to their owner only, others just learn the size.
    let dealt: Vec<&Value> = lines
        .iter()
        .filter(|l| l["event"]["type"] == "handDealt")
        .collect();
    assert_eq!(dealt.len(), 2);
    for line in dealt {
        assert_eq!(line["audience"]["to"], "player");
        assert_eq!(line["audience"]["player"], line["event"]["player"]);
        assert_eq!(line["event"]["cards"].as_array().unwrap().len(), 9);
    }

    let snapshot = lines.last().unwrap();
    assert_eq!(snapshot["phase"], "programming");
    assert_eq!(snapshot["players"].as_array().unwrap().len(), 2);
}

#[test]
fn rejected_actions_print_errors() {
    let lines = run(&[
        "join Ada",
        "join Bob",
        "start",
        "startpoint 2 2 0",
        "startpoint 1 0 5",
        "startpoint 1 1 1",
        "startpoint 2 1 1",
        "quit",
    ]);
    assert_eq!(
        errors(&lines),
        vec![
            "it is not your turn".to_string(),
            "(0, 5) is not a start point".to_string(),
            "start point (1, 1) is already taken".to_string(),
        ]
    );
}

#[test]
fn unknown_and_empty_lines_are_ignored() {
    let lines = run(&["", "   ", "# comment", "fly 1 north", "program x", "quit"]);
    assert!(lines.is_empty());
}

#[test]
fn eof_exits_cleanly() {
    let (ok, lines) = run_driver(&[], &["join Ada"]);
    assert!(ok);
    assert_eq!(lines.len(), 1);
}

#[test]
fn bad_config_path_fails() {
    let (ok, lines) = run_driver(&["--config", "/nonexistent/roborace.json"], &["quit"]);
    assert!(!ok);
    assert!(lines.is_empty());
}
