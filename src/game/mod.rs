//! The four-phase game state machine.
//!
//! `Game` is synchronous: every entry point either rejects an action with
//! an [`ActionError`] without touching state, or applies it and queues the
//! resulting events. Pacing goes through a [`TurnTimer`]; whoever owns the
//! game delivers expiries back through [`Game::on_timer`].
//!
//! Phase flow:
//! - Setup        -> Upgrade once every player has picked a start tile
//! - Upgrade      -> Programming once every player bought or declined
//! - Programming  -> Activation when all registers are filled or time runs out
//! - Activation   -> Upgrade after register 5, or game over on a win

mod activation;
mod error;
mod event;
mod programming;
mod setup;
mod upgrade;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::board::{Board, BoardEffect, Direction, RobotId};
use crate::cards::{Card, DamageCard, DamagePiles, UpgradeShop};
use crate::config::GameConfig;
use crate::effects::{CardEffect, StandardEffects};
use crate::player::{FigurePool, Player, PlayerId};
use crate::timer::{Scheduler, TimerToken, TurnTimer};

pub use error::ActionError;
pub use event::{
    Audience, EnergySource, Envelope, GameEvent, GamePhase, PipelineStage, RevealedCard, PIPELINE,
};

/// What a pending timer is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    SelectionTimeout,
    ActivationWindow,
    StageDone(PipelineStage),
}

/// One game from lobby to game over.
pub struct Game {
    config: GameConfig,
    board: Board,
    /// Registration order.
    players: Vec<Player>,
    next_player_id: u32,
    figures: FigurePool,
    started: bool,
    phase: GamePhase,
    current: Option<PlayerId>,
    priority: Vec<PlayerId>,
    register: usize,
    round: u32,
    winner: Option<PlayerId>,
    shop: UpgradeShop,
    damage: DamagePiles,
    rng: SmallRng,
    timer: TurnTimer<Tick>,
    effects: Box<dyn CardEffect>,
    /// Players still to act in the current register.
    queue: Vec<PlayerId>,
    /// Players whose card for the current register already ran.
    played: Vec<PlayerId>,
    selection_started: bool,
    events: Vec<Envelope>,
}

impl Game {
    pub fn new(
        mut board: Board,
        config: GameConfig,
        effects: Box<dyn CardEffect>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let mut rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };
        board.set_movement_checks(config.movement_checks);
        let shop = UpgradeShop::new(config.upgrade_copies, &mut rng);
        Game {
            config,
            board,
            players: Vec::new(),
            next_player_id: 1,
            figures: FigurePool::default(),
            started: false,
            phase: GamePhase::Setup,
            current: None,
            priority: Vec::new(),
            register: 0,
            round: 0,
            winner: None,
            shop,
            damage: DamagePiles::default(),
            rng,
            timer: TurnTimer::new(scheduler),
            effects,
            queue: Vec::new(),
            played: Vec::new(),
            selection_started: false,
            events: Vec::new(),
        }
    }

    /// A game using the base card effects.
    pub fn with_standard_effects(
        board: Board,
        config: GameConfig,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        Self::new(board, config, Box::new(StandardEffects), scheduler)
    }

    // --- accessors ---

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Register being activated. Only meaningful during activation.
    pub fn register(&self) -> usize {
        self.register
    }

    /// Completed rounds.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.current
    }

    pub fn priority(&self) -> &[PlayerId] {
        &self.priority
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn shop(&self) -> &UpgradeShop {
        &self.shop
    }

    pub fn damage_piles(&self) -> &DamagePiles {
        &self.damage
    }

    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.timer.pending()
    }

    pub fn pending_tick(&self) -> Option<Tick> {
        self.timer.pending_tick()
    }

    /// Takes every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.events)
    }

    /// Delivers a timer expiry. Stale tokens are ignored.
    pub fn on_timer(&mut self, token: TimerToken) {
        let Some(tick) = self.timer.fire(token) else {
            return;
        };
        if self.winner.is_some() {
            return;
        }
        match tick {
            Tick::SelectionTimeout => self.selection_timeout(),
            Tick::ActivationWindow => self.window_elapsed(),
            Tick::StageDone(stage) => self.stage_done(stage),
        }
    }

    // --- actions valid in any phase ---

    /// Takes the damage cards owed after the Spam pile ran out.
    pub fn resolve_damage_pick(
        &mut self,
        player: PlayerId,
        piles: &[String],
    ) -> Result<(), ActionError> {
        let idx = self.started_player(player)?;
        let owed = self.players[idx].pending_damage;
        if owed == 0 {
            return Err(ActionError::NoPendingDamage);
        }
        if piles.len() != owed as usize {
            return Err(ActionError::InvalidDamagePick);
        }

        let mut picks = Vec::with_capacity(piles.len());
        let mut scratch = self.damage.clone();
        for name in piles {
            let kind = DamageCard::from_name(name).ok_or(ActionError::InvalidDamagePick)?;
            if kind == DamageCard::Spam || !scratch.take(kind) {
                return Err(ActionError::InvalidDamagePick);
            }
            picks.push(kind);
        }

        self.damage = scratch;
        let p = &mut self.players[idx];
        p.pending_damage = 0;
        p.discard_pile.extend(picks.iter().map(|d| Card::Damage(*d)));
        self.emit(GameEvent::DamageDrawn {
            player,
            cards: picks,
        });
        Ok(())
    }

    /// Turns a rebooting robot to face `dir`.
    pub fn choose_reboot_direction(
        &mut self,
        player: PlayerId,
        dir: Direction,
    ) -> Result<(), ActionError> {
        let idx = self.started_player(player)?;
        let robot = self.players[idx].robot.id;
        if !self.board.is_rebooting(robot) {
            return Err(ActionError::NotRebooting);
        }
        self.board.set_facing(robot, dir);
        self.flush_board();
        Ok(())
    }

    // --- shared helpers ---

    fn emit(&mut self, event: GameEvent) {
        self.emit_to(Audience::All, event);
    }

    fn emit_to(&mut self, audience: Audience, event: GameEvent) {
        self.events.push(Envelope { audience, event });
    }

    fn set_phase(&mut self, phase: GamePhase) {
        info!(?phase, round = self.round, "phase change");
        self.phase = phase;
        self.emit(GameEvent::PhaseChanged { phase });
    }

    fn set_current(&mut self, player: Option<PlayerId>) {
        self.current = player;
        if let Some(player) = player {
            self.emit(GameEvent::CurrentPlayerChanged { player });
        }
    }

    fn index_of(&self, player: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == player)
    }

    fn owner_of(&self, robot: RobotId) -> Option<usize> {
        self.players.iter().position(|p| p.robot.id == robot)
    }

    /// Common guard: game running and player known.
    fn started_player(&self, player: PlayerId) -> Result<usize, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if !self.started {
            return Err(ActionError::GameNotStarted);
        }
        self.index_of(player).ok_or(ActionError::UnknownPlayer)
    }

    /// [`Self::started_player`] plus a phase check.
    fn player_in_phase(&self, player: PlayerId, phase: GamePhase) -> Result<usize, ActionError> {
        let idx = self.started_player(player)?;
        if self.phase != phase {
            return Err(ActionError::WrongPhase {
                current: self.phase,
            });
        }
        Ok(idx)
    }

    fn registration_robots(&self) -> Vec<(PlayerId, RobotId)> {
        self.players.iter().map(|p| (p.id, p.robot.id)).collect()
    }

    /// Translates board effects into events, dealing damage for hits and
    /// reboots.
    fn flush_board(&mut self) {
        for effect in self.board.take_effects() {
            match effect {
                BoardEffect::CheckpointMoved(number, position) => {
                    self.emit(GameEvent::CheckpointTileMoved { number, position });
                }
                BoardEffect::Moved(robot, position) => {
                    if let Some(idx) = self.owner_of(robot) {
                        let player = self.players[idx].id;
                        self.emit(GameEvent::RobotMoved { player, position });
                    }
                }
                BoardEffect::Turned(robot, rotation) => {
                    if let Some(idx) = self.owner_of(robot) {
                        let player = self.players[idx].id;
                        self.emit(GameEvent::RobotTurned { player, rotation });
                    }
                }
                BoardEffect::Rebooted(robot) => {
                    if let Some(idx) = self.owner_of(robot) {
                        let player = self.players[idx].id;
                        self.emit(GameEvent::RobotRebooted { player });
                        self.deal_damage(idx, DamageCard::Spam, self.config.reboot_damage);
                    }
                }
                BoardEffect::Shot(robot, amount) => {
                    if let Some(idx) = self.owner_of(robot) {
                        self.deal_damage(idx, DamageCard::Spam, amount);
                    }
                }
            }
        }
    }

    /// Moves `count` cards of `kind` from the shared pile into the player's
    /// discard pile. Whatever the pile cannot cover becomes a pending pick
    /// from the remaining piles.
    fn deal_damage(&mut self, idx: usize, kind: DamageCard, count: u32) {
        let mut drawn = Vec::new();
        let mut missing = 0;
        for _ in 0..count {
            if self.damage.take(kind) {
                drawn.push(kind);
            } else {
                missing += 1;
            }
        }

        let player = self.players[idx].id;
        let p = &mut self.players[idx];
        p.discard_pile.extend(drawn.iter().map(|d| Card::Damage(*d)));
        if !drawn.is_empty() {
            self.emit(GameEvent::DamageDrawn {
                player,
                cards: drawn,
            });
        }
        if missing == 0 {
            return;
        }

        let piles = self.damage.pickable();
        if piles.is_empty() {
            warn!(%player, missing, "every damage pile is empty");
            return;
        }
        let p = &mut self.players[idx];
        p.pending_damage += missing;
        let count = p.pending_damage;
        self.emit_to(
            Audience::Player(player),
            GameEvent::DamagePickRequired {
                player,
                count,
                piles,
            },
        );
    }
}
