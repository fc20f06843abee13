//! Activation phase: five registers, each a round of player windows in
//! priority order followed by the tile pipeline.
//!
//! Every step ends by arming the turn timer, so the whole register loop is
//! driven by expiries and never blocks.

use std::time::Duration;

use tracing::{debug, info};

use super::{ActionError, EnergySource, Game, GameEvent, GamePhase, PipelineStage, RevealedCard, Tick};
use crate::board::RobotId;
use crate::cards::Card;
use crate::effects::{EffectContext, Followup};
use crate::player::{PlayerId, REGISTER_COUNT};
use crate::priority::PriorityResolver;

impl Game {
    pub(super) fn enter_activation(&mut self) {
        self.set_phase(GamePhase::Activation);
        self.board.clear_rebooting();
        self.register = 0;
        self.begin_register();
    }

    fn begin_register(&mut self) {
        let register = self.register;
        let geometric = PriorityResolver::geometric_order(&self.board, &self.registration_robots());
        let privileged: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.admin_registers.contains(&register))
            .map(|p| p.id)
            .collect();
        self.priority = PriorityResolver::apply_admin_privilege(&geometric, &privileged);
        self.emit(GameEvent::PriorityOrder {
            register,
            order: self.priority.clone(),
        });

        let cards = self
            .priority
            .iter()
            .filter_map(|id| self.player(*id))
            .map(|p| RevealedCard {
                player: p.id,
                card: p.mat.registers[register],
            })
            .collect();
        self.emit(GameEvent::RegisterCardsRevealed { register, cards });

        self.queue = self.priority.clone();
        self.played.clear();
        self.next_window();
    }

    /// Opens the next player's window, or starts the pipeline once every
    /// player has had theirs.
    fn next_window(&mut self) {
        while !self.queue.is_empty() {
            let id = self.queue.remove(0);
            let Some(idx) = self.index_of(id) else {
                continue;
            };
            let p = &self.players[idx];
            if self.board.is_rebooting(p.robot.id) || p.mat.registers[self.register].is_none() {
                debug!(player = %id, register = self.register, "window skipped");
                continue;
            }
            self.set_current(Some(id));
            let window = self.config.activation_window();
            self.timer.start(Tick::ActivationWindow, window);
            return;
        }
        self.set_current(None);
        self.run_stage(PipelineStage::Conveyors);
    }

    pub(super) fn window_elapsed(&mut self) {
        if let Some(player) = self.current {
            debug!(%player, register = self.register, "window elapsed, playing card");
            self.execute_register(player);
        }
        self.next_window();
    }

    /// Plays the card in the current register before the window runs out.
    pub fn play_queued_card(&mut self, player: PlayerId, card_name: &str) -> Result<(), ActionError> {
        let idx = self.player_in_phase(player, GamePhase::Activation)?;
        if self.played.contains(&player) {
            return Err(ActionError::AlreadyPlayed);
        }
        if self.current != Some(player) {
            return Err(ActionError::NotYourTurn);
        }
        let card: Card = card_name.parse().map_err(|_| ActionError::UnknownCard {
            name: card_name.to_string(),
        })?;
        if self.players[idx].mat.registers[self.register] != Some(card) {
            return Err(ActionError::NotYourCard {
                name: card_name.to_string(),
            });
        }

        self.timer.cancel();
        self.execute_register(player);
        self.next_window();
        Ok(())
    }

    fn execute_register(&mut self, player: PlayerId) {
        let Some(idx) = self.index_of(player) else {
            return;
        };
        self.played.push(player);
        let register = self.register;
        let Some(card) = self.players[idx].mat.registers[register] else {
            return;
        };
        self.emit(GameEvent::CardPlayed {
            player,
            card,
            register,
        });
        self.resolve_card(idx, card, true);
        self.flush_board();
    }

    /// Runs a card for a player. Again stands for the last card played.
    fn resolve_card(&mut self, idx: usize, card: Card, allow_top_card: bool) {
        let card = if card.is_again() {
            match self.players[idx].last_played {
                Some(last) => last,
                None => return,
            }
        } else {
            card
        };
        let robot = self.players[idx].robot.id;
        if self.board.is_rebooting(robot) {
            return;
        }

        let mut ctx = EffectContext {
            board: &mut self.board,
            robot,
            register: self.register,
        };
        let followup = self.effects.apply(card, &mut ctx);
        self.players[idx].last_played = Some(card);
        self.apply_followup(idx, robot, followup, allow_top_card);
    }

    fn apply_followup(&mut self, idx: usize, robot: RobotId, followup: Followup, allow_top_card: bool) {
        if followup.energy > 0 {
            let p = &mut self.players[idx];
            p.energy += followup.energy;
            let (player, amount) = (p.id, p.energy);
            self.emit(GameEvent::EnergyChanged {
                player,
                amount,
                source: EnergySource::PowerUp,
            });
        }
        for (kind, count) in followup.damage {
            self.deal_damage(idx, kind, count);
        }
        if followup.reboot {
            if let Some(pos) = self.board.robot_position(robot) {
                let region = self.board.region(pos);
                self.board.reboot(robot, &region);
            }
        }
        if followup.play_top_card && allow_top_card {
            self.play_top_card(idx);
        }
    }

    /// Plays the first programming card from the top of the player's deck.
    /// Damage cards turned up on the way go back to their shared piles.
    fn play_top_card(&mut self, idx: usize) {
        let p = &self.players[idx];
        let limit = p.draw_pile.len() + p.discard_pile.len();
        for _ in 0..=limit {
            let Some(top) = self.players[idx].draw_card(&mut self.rng) else {
                break;
            };
            match top.damage() {
                Some(kind) => self.damage.give_back(kind),
                None => {
                    self.players[idx].discard_pile.push(top);
                    self.resolve_card(idx, top, false);
                    return;
                }
            }
        }
    }

    fn stage_delay(&self, stage: PipelineStage) -> Duration {
        let d = &self.config.stage_delays;
        let ms = match stage {
            PipelineStage::Conveyors => d.conveyors_ms,
            PipelineStage::PushPanels => d.push_panels_ms,
            PipelineStage::Gears => d.gears_ms,
            PipelineStage::WallLasers => d.wall_lasers_ms,
            PipelineStage::RobotLasers => d.robot_lasers_ms,
            PipelineStage::EnergySpaces => d.energy_spaces_ms,
            PipelineStage::Checkpoints => d.checkpoints_ms,
        };
        Duration::from_millis(ms)
    }

    fn run_stage(&mut self, stage: PipelineStage) {
        debug!(?stage, register = self.register, "pipeline stage");
        match stage {
            PipelineStage::Conveyors => self.board.activate_conveyors(),
            PipelineStage::PushPanels => self.board.activate_push_panels(self.register),
            PipelineStage::Gears => self.board.activate_gears(),
            PipelineStage::WallLasers => self.board.fire_wall_lasers(),
            PipelineStage::RobotLasers => {
                let rear: Vec<RobotId> = self
                    .players
                    .iter()
                    .filter(|p| p.has_rear_laser())
                    .map(|p| p.robot.id)
                    .collect();
                self.board.fire_robot_lasers(&rear);
            }
            PipelineStage::EnergySpaces => self.collect_energy(),
            PipelineStage::Checkpoints => self.reach_checkpoints(),
        }
        self.flush_board();
        self.emit(GameEvent::TileAnimation { stage });
        let delay = self.stage_delay(stage);
        self.timer.start(Tick::StageDone(stage), delay);
    }

    pub(super) fn stage_done(&mut self, stage: PipelineStage) {
        match stage.next() {
            Some(next) => self.run_stage(next),
            None => self.finish_register(),
        }
    }

    /// Robots on energy spaces take a cube; in the last register they gain
    /// energy even from an empty space.
    fn collect_energy(&mut self) {
        let last_register = self.register == REGISTER_COUNT - 1;
        for idx in 0..self.players.len() {
            let Some(pos) = self.board.robot_position(self.players[idx].robot.id) else {
                continue;
            };
            if !self.board.is_energy_space(pos) {
                continue;
            }
            if self.board.take_energy_cube(pos) || last_register {
                let p = &mut self.players[idx];
                p.energy += 1;
                let (player, amount) = (p.id, p.energy);
                self.emit(GameEvent::EnergyChanged {
                    player,
                    amount,
                    source: EnergySource::EnergySpace,
                });
            }
        }
    }

    fn reach_checkpoints(&mut self) {
        for idx in 0..self.players.len() {
            let Some(pos) = self.board.robot_position(self.players[idx].robot.id) else {
                continue;
            };
            let Some(number) = self.board.checkpoint_at(pos) else {
                continue;
            };
            let p = &mut self.players[idx];
            if number == p.checkpoints + 1 {
                p.checkpoints = number;
                let player = p.id;
                debug!(%player, number, "checkpoint reached");
                self.emit(GameEvent::CheckpointReached { player, number });
            }
        }
    }

    fn finish_register(&mut self) {
        let target = self.board.checkpoint_count();
        let winner = self
            .players
            .iter()
            .find(|p| target > 0 && p.checkpoints as usize == target)
            .map(|p| p.id);
        if let Some(winner) = winner {
            info!(%winner, round = self.round, register = self.register, "game over");
            self.winner = Some(winner);
            self.timer.cancel();
            self.queue.clear();
            self.set_current(None);
            self.emit(GameEvent::GameOver { winner });
            return;
        }

        if self.register + 1 < REGISTER_COUNT {
            self.register += 1;
            self.begin_register();
        } else {
            self.end_round();
        }
    }

    /// Clears every register: damage back to the shared piles, programming
    /// cards to their owner's discard pile.
    fn end_round(&mut self) {
        self.round += 1;
        for idx in 0..self.players.len() {
            let cards = self.players[idx].mat.clear();
            for card in cards {
                match card.damage() {
                    Some(kind) => self.damage.give_back(kind),
                    None => self.players[idx].discard_pile.push(card),
                }
            }
            let p = &mut self.players[idx];
            p.admin_registers.clear();
            p.last_played = None;
        }
        self.register = 0;
        info!(round = self.round, "round complete");
        self.enter_upgrade();
    }
}
