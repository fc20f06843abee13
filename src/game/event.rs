//! Outbound game events and who gets to see them.

use serde::Serialize;

use crate::board::{Position, Rotation, RobotId};
use crate::cards::{Card, DamageCard, UpgradeCard};
use crate::player::PlayerId;

/// The four phases of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Setup,
    Upgrade,
    Programming,
    Activation,
}

/// Stages of the tile activation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Conveyors,
    PushPanels,
    Gears,
    WallLasers,
    RobotLasers,
    EnergySpaces,
    Checkpoints,
}

pub const PIPELINE: [PipelineStage; 7] = [
    PipelineStage::Conveyors,
    PipelineStage::PushPanels,
    PipelineStage::Gears,
    PipelineStage::WallLasers,
    PipelineStage::RobotLasers,
    PipelineStage::EnergySpaces,
    PipelineStage::Checkpoints,
];

impl PipelineStage {
    /// The stage after this one, or None after checkpoints.
    pub fn next(self) -> Option<PipelineStage> {
        let idx = PIPELINE.iter().position(|s| *s == self)?;
        PIPELINE.get(idx + 1).copied()
    }
}

/// Why a player's energy changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergySource {
    EnergySpace,
    PowerUp,
    Purchase,
}

/// One player's card for the register being revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedCard {
    pub player: PlayerId,
    pub card: Option<Card>,
}

/// A state change reported by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    PhaseChanged {
        phase: GamePhase,
    },
    CurrentPlayerChanged {
        player: PlayerId,
    },
    PlayerJoined {
        player: PlayerId,
        name: String,
        robot: RobotId,
        figure: &'static str,
    },
    PlayerLeft {
        player: PlayerId,
    },
    RobotMoved {
        player: PlayerId,
        position: Position,
    },
    RobotTurned {
        player: PlayerId,
        rotation: Rotation,
    },
    RobotRebooted {
        player: PlayerId,
    },
    TileAnimation {
        stage: PipelineStage,
    },
    RegisterCardsRevealed {
        register: usize,
        cards: Vec<RevealedCard>,
    },
    CheckpointReached {
        player: PlayerId,
        number: u8,
    },
    CheckpointTileMoved {
        number: u8,
        position: Position,
    },
    /// `amount` is the player's new energy total.
    EnergyChanged {
        player: PlayerId,
        amount: u32,
        source: EnergySource,
    },
    DamageDrawn {
        player: PlayerId,
        cards: Vec<DamageCard>,
    },
    DamagePickRequired {
        player: PlayerId,
        count: u32,
        piles: Vec<DamageCard>,
    },
    UpgradeShopRefilled {
        cards: Vec<UpgradeCard>,
    },
    UpgradeShopExchanged {
        cards: Vec<UpgradeCard>,
    },
    UpgradeBought {
        player: PlayerId,
        card: UpgradeCard,
    },
    HandDealt {
        player: PlayerId,
        cards: Vec<Card>,
    },
    OthersHandSize {
        player: PlayerId,
        size: usize,
    },
    SelectionFinished {
        player: PlayerId,
    },
    RegistersAutoFilled {
        player: PlayerId,
        cards: Vec<Card>,
    },
    SelectionTimerStarted {
        duration_ms: u64,
    },
    SelectionTimerEnded,
    CardPlayed {
        player: PlayerId,
        card: Card,
        register: usize,
    },
    PriorityOrder {
        register: usize,
        order: Vec<PlayerId>,
    },
    GameOver {
        winner: PlayerId,
    },
}

/// Recipients of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "to", content = "player", rename_all = "camelCase")]
pub enum Audience {
    All,
    Player(PlayerId),
    AllExcept(PlayerId),
}

impl Audience {
    pub fn includes(self, player: PlayerId) -> bool {
        match self {
            Audience::All => true,
            Audience::Player(p) => p == player,
            Audience::AllExcept(p) => p != player,
        }
    }
}

/// An event addressed to an audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub audience: Audience,
    pub event: GameEvent,
}
