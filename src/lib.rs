//! Roborace engine library.
//!
//! Exposes the board and its spatial rules, the card and player model, the
//! phase state machine, game sessions, and the text protocol for use by
//! integration tests and the binary entry points.

pub mod board;
pub mod cards;
pub mod config;
pub mod effects;
pub mod game;
pub mod player;
pub mod priority;
pub mod protocol;
pub mod selfplay;
pub mod session;
pub mod timer;
