//! Reasons a player action is rejected.
//!
//! A rejected action leaves the game untouched; the error goes back to the
//! acting player only.

use serde::Serialize;

use super::event::GamePhase;
use crate::board::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum ActionError {
    #[error("not allowed during the {current:?} phase")]
    WrongPhase { current: GamePhase },

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("unknown player")]
    UnknownPlayer,

    #[error("the game has not started")]
    GameNotStarted,

    #[error("the game has already started")]
    AlreadyStarted,

    #[error("the lobby is full")]
    LobbyFull,

    #[error("need at least {min} players, have {have}")]
    NotEnoughPlayers { min: usize, have: usize },

    #[error("{position} is not a start point")]
    InvalidStartPoint { position: Position },

    #[error("start point {position} is already taken")]
    StartPointTaken { position: Position },

    #[error("unknown card '{name}'")]
    UnknownCard { name: String },

    #[error("card '{name}' is not in your hand")]
    CardNotInHand { name: String },

    #[error("register {register} does not exist")]
    InvalidRegister { register: usize },

    #[error("Again cannot be programmed into the first register")]
    AgainInFirstRegister,

    #[error("your registers are already filled")]
    RegistersAlreadyFilled,

    #[error("upgrade '{name}' is not in the shop")]
    CardUnavailable { name: String },

    #[error("need {cost} energy, have {have}")]
    InsufficientEnergy { cost: u32, have: u32 },

    #[error("you own no Admin Privilege upgrade")]
    NoAdminPrivilege,

    #[error("admin privilege already used for this round or register")]
    PrivilegeAlreadyUsed,

    #[error("register {register} has already been activated")]
    RegisterAlreadyActive { register: usize },

    #[error("'{name}' is not the card in your active register")]
    NotYourCard { name: String },

    #[error("you already played this register")]
    AlreadyPlayed,

    #[error("no damage pick is pending")]
    NoPendingDamage,

    #[error("invalid damage pick")]
    InvalidDamagePick,

    #[error("your robot is not rebooting")]
    NotRebooting,

    #[error("the game is over")]
    GameOver,
}
