//! Text command parser.
//!
//! Parses driver input lines into structured `Command` variants that the
//! main loop dispatches to a session. Players are addressed by their
//! numeric id as returned by `join`; registers are numbered 0..4.

use crate::board::{Direction, Position};
use crate::player::PlayerId;
use crate::session::PlayerAction;

/// A parsed driver command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `join <name>`
    Join { name: String },

    /// `start`
    Start,

    /// Any player action: `leave`, `startpoint`, `buy`, `program`, `admin`,
    /// `play`, `pick`, `rebootdir`.
    Act { player: PlayerId, action: PlayerAction },

    /// `state`: print a snapshot of the game.
    State,

    /// `quit`
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines and comments. Unknown commands and
/// malformed arguments also return `None` after logging to stderr.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    match tokens[0] {
        "start" => Some(Command::Start),
        "state" => Some(Command::State),
        "quit" => Some(Command::Quit),
        "join" => parse_join(&tokens),

        "leave" | "startpoint" | "buy" | "program" | "admin" | "play" | "pick" | "rebootdir" => {
            parse_action(&tokens)
        }

        other => {
            eprintln!("unknown command: {}", other);
            None
        }
    }
}

/// Parses `join <name...>`. The name may contain spaces.
fn parse_join(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 2 {
        eprintln!("malformed join: expected 'join <name>'");
        return None;
    }
    Some(Command::Join {
        name: tokens[1..].join(" "),
    })
}

fn parse_player(token: Option<&&str>, cmd: &str) -> Option<PlayerId> {
    match token.map(|t| t.parse::<u32>()) {
        Some(Ok(id)) => Some(PlayerId(id)),
        _ => {
            eprintln!("malformed {}: expected a numeric player id", cmd);
            None
        }
    }
}

fn parse_number<T: std::str::FromStr>(token: Option<&&str>, cmd: &str, what: &str) -> Option<T> {
    match token.map(|t| t.parse::<T>()) {
        Some(Ok(n)) => Some(n),
        _ => {
            eprintln!("malformed {}: expected a numeric {}", cmd, what);
            None
        }
    }
}

fn parse_word(token: Option<&&str>, cmd: &str, what: &str) -> Option<String> {
    match token {
        Some(t) => Some(t.to_string()),
        None => {
            eprintln!("malformed {}: missing {}", cmd, what);
            None
        }
    }
}

/// Parses `<verb> <player> [args...]`.
fn parse_action(tokens: &[&str]) -> Option<Command> {
    let cmd = tokens[0];
    let player = parse_player(tokens.get(1), cmd)?;
    let action = match cmd {
        "leave" => PlayerAction::Leave,
        "startpoint" => {
            let row = parse_number(tokens.get(2), cmd, "row")?;
            let col = parse_number(tokens.get(3), cmd, "column")?;
            PlayerAction::SelectStartingPoint(Position::new(row, col))
        }
        "buy" => {
            let card = parse_word(tokens.get(2), cmd, "card name or 'none'")?;
            if card.eq_ignore_ascii_case("none") {
                PlayerAction::BuyUpgrade(None)
            } else {
                PlayerAction::BuyUpgrade(Some(card))
            }
        }
        "program" => {
            let register = parse_number(tokens.get(2), cmd, "register")?;
            let card = parse_word(tokens.get(3), cmd, "card name")?;
            PlayerAction::ChooseCard { card, register }
        }
        "admin" => PlayerAction::ChooseAdminRegister(parse_number(tokens.get(2), cmd, "register")?),
        "play" => PlayerAction::PlayQueuedCard(parse_word(tokens.get(2), cmd, "card name")?),
        "pick" => {
            if tokens.len() < 3 {
                eprintln!("malformed pick: expected 'pick <player> <pile>...'");
                return None;
            }
            PlayerAction::ResolveDamagePick(tokens[2..].iter().map(|t| t.to_string()).collect())
        }
        "rebootdir" => {
            let word = parse_word(tokens.get(2), cmd, "direction")?;
            match word.parse::<Direction>() {
                Ok(dir) => PlayerAction::ChooseRebootDirection(dir),
                Err(e) => {
                    eprintln!("malformed rebootdir: {}", e);
                    return None;
                }
            }
        }
        _ => return None,
    };
    Some(Command::Act { player, action })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act(player: u32, action: PlayerAction) -> Option<Command> {
        Some(Command::Act {
            player: PlayerId(player),
            action,
        })
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("start"), Some(Command::Start));
        assert_eq!(parse_command("  quit  "), Some(Command::Quit));
        assert_eq!(parse_command("state"), Some(Command::State));
    }

    #[test]
    fn parse_empty_and_comment_lines() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("# setup"), None);
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(parse_command("fly 1 north"), None);
    }

    #[test]
    fn parse_join_with_spaces() {
        assert_eq!(
            parse_command("join Ada Lovelace"),
            Some(Command::Join {
                name: "Ada Lovelace".into()
            })
        );
        assert_eq!(parse_command("join"), None);
    }

    #[test]
    fn parse_startpoint() {
        assert_eq!(
            parse_command("startpoint 2 5 1"),
            act(2, PlayerAction::SelectStartingPoint(Position::new(5, 1)))
        );
        assert_eq!(parse_command("startpoint 2 5"), None);
        assert_eq!(parse_command("startpoint x 5 1"), None);
    }

    #[test]
    fn parse_buy_and_decline() {
        assert_eq!(
            parse_command("buy 1 RearLaser"),
            act(1, PlayerAction::BuyUpgrade(Some("RearLaser".into())))
        );
        assert_eq!(parse_command("buy 1 none"), act(1, PlayerAction::BuyUpgrade(None)));
    }

    #[test]
    fn parse_program_and_play() {
        assert_eq!(
            parse_command("program 3 0 MoveII"),
            act(
                3,
                PlayerAction::ChooseCard {
                    card: "MoveII".into(),
                    register: 0
                }
            )
        );
        assert_eq!(
            parse_command("play 3 MoveII"),
            act(3, PlayerAction::PlayQueuedCard("MoveII".into()))
        );
        assert_eq!(parse_command("program 3 MoveII"), None);
    }

    #[test]
    fn parse_pick_and_rebootdir() {
        assert_eq!(
            parse_command("pick 1 Worm Virus"),
            act(
                1,
                PlayerAction::ResolveDamagePick(vec!["Worm".into(), "Virus".into()])
            )
        );
        assert_eq!(
            parse_command("rebootdir 1 UP"),
            act(1, PlayerAction::ChooseRebootDirection(Direction::Top))
        );
        assert_eq!(parse_command("rebootdir 1 sideways"), None);
        assert_eq!(parse_command("admin 1 3"), act(1, PlayerAction::ChooseAdminRegister(3)));
    }
}
