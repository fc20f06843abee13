//! Text driver protocol.
//!
//! Line-oriented commands in, one JSON object per line out: event
//! envelopes as the game publishes them, and `{"error": ...}` for rejected
//! commands.

pub mod parser;

use serde::Serialize;

use crate::game::Envelope;
use crate::session::SessionError;

pub use parser::{parse_command, Command};

/// Serializes an event envelope as one JSON line.
pub fn format_envelope(envelope: &Envelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|e| format_error(&e.to_string()))
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    error: &'a str,
}

/// Formats an error message as `{"error": "..."}`.
pub fn format_error(message: &str) -> String {
    serde_json::to_string(&ErrorLine { error: message })
        .unwrap_or_else(|_| String::from(r#"{"error":"unprintable error"}"#))
}

pub fn format_session_error(err: &SessionError) -> String {
    format_error(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Audience, GameEvent, GamePhase};
    use crate::player::PlayerId;

    #[test]
    fn error_line_is_json() {
        assert_eq!(format_error("it is \"not\" your turn"), r#"{"error":"it is \"not\" your turn"}"#);
    }

    #[test]
    fn envelope_line_names_audience() {
        let line = format_envelope(&Envelope {
            audience: Audience::Player(PlayerId(2)),
            event: GameEvent::PhaseChanged {
                phase: GamePhase::Upgrade,
            },
        });
        assert_eq!(
            line,
            r#"{"audience":{"to":"player","player":2},"event":{"type":"phaseChanged","phase":"upgrade"}}"#
        );
    }
}
