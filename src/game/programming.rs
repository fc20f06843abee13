//! Programming phase: deal hands, fill registers, and the selection timer.

use tracing::{debug, info, warn};

use super::{ActionError, Audience, Game, GameEvent, GamePhase, Tick};
use crate::cards::{Card, ALL_DAMAGE};
use crate::player::{PlayerId, REGISTER_COUNT};

impl Game {
    pub(super) fn enter_programming(&mut self) {
        self.set_phase(GamePhase::Programming);
        self.set_current(None);
        self.selection_started = false;

        let hand_size = self.config.hand_size;
        for idx in 0..self.players.len() {
            let p = &mut self.players[idx];
            p.has_chosen = false;
            p.top_up_hand(hand_size, &mut self.rng);
            let player = p.id;
            let cards = p.hand.clone();
            let size = cards.len();
            self.emit_to(Audience::Player(player), GameEvent::HandDealt { player, cards });
            self.emit_to(
                Audience::AllExcept(player),
                GameEvent::OthersHandSize { player, size },
            );
        }
    }

    /// Moves a card from the player's hand into a register slot.
    ///
    /// A card already in that slot goes back to the hand. Filling the last
    /// empty slot discards the rest of the hand and locks the registers.
    pub fn choose_card_for_register(
        &mut self,
        player: PlayerId,
        card_name: &str,
        register: usize,
    ) -> Result<(), ActionError> {
        let idx = self.player_in_phase(player, GamePhase::Programming)?;
        if register >= REGISTER_COUNT {
            return Err(ActionError::InvalidRegister { register });
        }
        if self.players[idx].has_chosen {
            return Err(ActionError::RegistersAlreadyFilled);
        }
        let card: Card = card_name.parse().map_err(|_| ActionError::UnknownCard {
            name: card_name.to_string(),
        })?;
        if register == 0 && card.is_again() {
            return Err(ActionError::AgainInFirstRegister);
        }

        let p = &mut self.players[idx];
        if !p.take_from_hand(card) {
            return Err(ActionError::CardNotInHand {
                name: card_name.to_string(),
            });
        }
        if let Some(old) = p.mat.registers[register].replace(card) {
            p.hand.push(old);
        }
        debug!(%player, card = card.name(), register, "register programmed");

        if p.register_filled() {
            p.discard_hand();
            p.has_chosen = true;
            self.emit(GameEvent::SelectionFinished { player });
            self.on_selection_finished();
        }
        Ok(())
    }

    /// Claims priority for a future register with an Admin Privilege card.
    ///
    /// Allowed while programming, or during activation for registers that
    /// have not started yet.
    pub fn choose_admin_privilege_register(
        &mut self,
        player: PlayerId,
        register: usize,
    ) -> Result<(), ActionError> {
        let idx = self.started_player(player)?;
        match self.phase {
            GamePhase::Programming => {}
            GamePhase::Activation if register > self.register => {}
            GamePhase::Activation => return Err(ActionError::RegisterAlreadyActive { register }),
            current => return Err(ActionError::WrongPhase { current }),
        }
        if register >= REGISTER_COUNT {
            return Err(ActionError::InvalidRegister { register });
        }
        let p = &mut self.players[idx];
        let owned = p.admin_privileges();
        if owned == 0 {
            return Err(ActionError::NoAdminPrivilege);
        }
        if p.admin_registers.contains(&register) || p.admin_registers.len() >= owned {
            return Err(ActionError::PrivilegeAlreadyUsed);
        }
        p.admin_registers.push(register);
        debug!(%player, register, "admin privilege claimed");
        Ok(())
    }

    fn on_selection_finished(&mut self) {
        if self.players.iter().all(|p| p.has_chosen) {
            if self.selection_started {
                self.timer.cancel();
                self.emit(GameEvent::SelectionTimerEnded);
            }
            self.enter_activation();
            return;
        }
        if !self.selection_started {
            self.selection_started = true;
            let timeout = self.config.programming_timeout();
            self.timer.start(Tick::SelectionTimeout, timeout);
            self.emit(GameEvent::SelectionTimerStarted {
                duration_ms: self.config.programming_timeout_ms,
            });
        }
    }

    /// Fills the empty registers of everyone who did not finish in time.
    ///
    /// Slots are filled from the top of the player's deck. Again never goes
    /// into the first register. A slot the deck cannot fill takes a card from
    /// the shared damage piles, Spam first.
    pub(super) fn selection_timeout(&mut self) {
        info!("selection timer expired");
        self.emit(GameEvent::SelectionTimerEnded);

        for idx in 0..self.players.len() {
            if self.players[idx].has_chosen {
                continue;
            }
            let p = &mut self.players[idx];
            p.discard_hand();
            let mut placed = Vec::new();
            for slot in p.mat.empty_slots() {
                let mut drawn = p.draw_card(&mut self.rng);
                if slot == 0 {
                    let mut set_aside = Vec::new();
                    while let Some(card) = drawn.filter(|c| c.is_again()) {
                        set_aside.push(card);
                        drawn = p.draw_card(&mut self.rng);
                    }
                    p.discard_pile.append(&mut set_aside);
                }
                let card = drawn.or_else(|| {
                    ALL_DAMAGE
                        .into_iter()
                        .find(|kind| self.damage.take(*kind))
                        .map(Card::Damage)
                });
                match card {
                    Some(card) => {
                        p.mat.registers[slot] = Some(card);
                        placed.push(card);
                    }
                    None => warn!(player = %p.id, slot, "no card left to fill register"),
                }
            }
            p.has_chosen = true;
            let player = p.id;
            self.emit_to(
                Audience::Player(player),
                GameEvent::RegistersAutoFilled {
                    player,
                    cards: placed,
                },
            );
        }
        self.enter_activation();
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{decline_all, events, game_in_upgrade};
    use super::*;
    use crate::cards::{DamageCard, ProgramCard, UpgradeCard};

    fn non_again(game: &Game, player: PlayerId) -> Card {
        *game
            .player(player)
            .unwrap()
            .hand
            .iter()
            .find(|c| !c.is_again())
            .unwrap()
    }

    fn fill(game: &mut Game, player: PlayerId) {
        for register in 0..REGISTER_COUNT {
            let card = non_again(game, player);
            game.choose_card_for_register(player, card.name(), register)
                .unwrap();
        }
    }

    #[test]
    fn hands_are_dealt_privately() {
        let (mut game, _, ids) = game_in_upgrade(2);
        decline_all(&mut game);
        let envs = game.drain_events();
        let dealt = envs
            .iter()
            .find(|e| matches!(e.event, GameEvent::HandDealt { player, .. } if player == ids[0]))
            .unwrap();
        assert_eq!(dealt.audience, Audience::Player(ids[0]));
        assert!(envs.iter().any(|e| e.audience == Audience::AllExcept(ids[0])
            && e.event == GameEvent::OthersHandSize { player: ids[0], size: 9 }));
        assert_eq!(game.player(ids[1]).unwrap().hand.len(), 9);
    }

    #[test]
    fn again_rejected_in_first_register() {
        let (mut game, _, ids) = game_in_upgrade(2);
        decline_all(&mut game);
        let idx = game.index_of(ids[0]).unwrap();
        game.players[idx].hand.push(Card::Program(ProgramCard::Again));
        assert_eq!(
            game.choose_card_for_register(ids[0], "Again", 0),
            Err(ActionError::AgainInFirstRegister)
        );
        game.choose_card_for_register(ids[0], "Again", 1).unwrap();
    }

    #[test]
    fn replacing_a_slot_returns_card_to_hand() {
        let (mut game, _, ids) = game_in_upgrade(2);
        decline_all(&mut game);
        let idx = game.index_of(ids[0]).unwrap();
        game.players[idx].hand = vec![
            Card::Program(ProgramCard::MoveI),
            Card::Program(ProgramCard::TurnLeft),
        ];
        game.choose_card_for_register(ids[0], "MoveI", 2).unwrap();
        game.choose_card_for_register(ids[0], "TurnLeft", 2).unwrap();
        let p = game.player(ids[0]).unwrap();
        assert_eq!(p.hand, vec![Card::Program(ProgramCard::MoveI)]);
        assert_eq!(p.mat.registers[2], Some(Card::Program(ProgramCard::TurnLeft)));
        assert_eq!(
            game.choose_card_for_register(ids[0], "UTurn", 1),
            Err(ActionError::CardNotInHand {
                name: "UTurn".into()
            })
        );
        assert_eq!(
            game.choose_card_for_register(ids[0], "MoveI", 5),
            Err(ActionError::InvalidRegister { register: 5 })
        );
    }

    #[test]
    fn first_finisher_starts_timer_and_last_cancels_it() {
        let (mut game, scheduler, ids) = game_in_upgrade(2);
        decline_all(&mut game);
        fill(&mut game, ids[0]);
        assert!(game.player(ids[0]).unwrap().hand.is_empty());
        assert_eq!(game.pending_tick(), Some(Tick::SelectionTimeout));
        let token = game.pending_timer().unwrap();
        assert_eq!(
            game.choose_card_for_register(ids[0], "MoveI", 0),
            Err(ActionError::RegistersAlreadyFilled)
        );

        fill(&mut game, ids[1]);
        assert!(scheduler.cancelled().contains(&token));
        assert_eq!(game.phase(), GamePhase::Activation);
        game.on_timer(token);
        assert_eq!(game.phase(), GamePhase::Activation);
    }

    #[test]
    fn timeout_fills_only_unfinished_players() {
        let (mut game, _, ids) = game_in_upgrade(3);
        decline_all(&mut game);
        fill(&mut game, ids[0]);
        fill(&mut game, ids[1]);
        let before: Vec<_> = game.player(ids[0]).unwrap().mat.registers.to_vec();

        let card = non_again(&game, ids[2]);
        game.choose_card_for_register(ids[2], card.name(), 3)
            .unwrap();
        game.drain_events();
        let token = game.pending_timer().unwrap();
        game.on_timer(token);

        assert_eq!(game.player(ids[0]).unwrap().mat.registers.to_vec(), before);
        let late = game.player(ids[2]).unwrap();
        assert!(late.register_filled());
        assert!(late.hand.is_empty());
        assert_eq!(late.mat.registers[3], Some(card));
        assert!(!late.mat.registers[0].unwrap().is_again());
        let evs = events(&mut game);
        assert!(evs.iter().any(|e| matches!(e,
            GameEvent::RegistersAutoFilled { player, cards } if *player == ids[2] && cards.len() == 4)));
        assert!(evs.contains(&GameEvent::PhaseChanged {
            phase: GamePhase::Activation
        }));
    }

    #[test]
    fn timeout_with_only_again_left_takes_spam() {
        let (mut game, _, ids) = game_in_upgrade(2);
        decline_all(&mut game);
        fill(&mut game, ids[0]);

        let again = Card::Program(ProgramCard::Again);
        let idx = game.index_of(ids[1]).unwrap();
        game.players[idx].hand = vec![again, again];
        game.players[idx].draw_pile = vec![again];
        game.players[idx].discard_pile.clear();
        let piles_before = game.damage_piles().total();

        let token = game.pending_timer().unwrap();
        game.on_timer(token);

        let spam = Card::Damage(DamageCard::Spam);
        let late = game.player(ids[1]).unwrap();
        assert!(late.register_filled());
        assert_eq!(
            late.mat.registers.to_vec(),
            vec![Some(spam), Some(again), Some(again), Some(again), Some(spam)]
        );
        assert_eq!(game.damage_piles().total(), piles_before - 2);
    }

    #[test]
    fn admin_privilege_rules() {
        let (mut game, _, ids) = game_in_upgrade(2);
        assert_eq!(
            game.choose_admin_privilege_register(ids[0], 1),
            Err(ActionError::WrongPhase {
                current: GamePhase::Upgrade
            })
        );
        decline_all(&mut game);
        assert_eq!(
            game.choose_admin_privilege_register(ids[0], 1),
            Err(ActionError::NoAdminPrivilege)
        );
        let idx = game.index_of(ids[0]).unwrap();
        game.players[idx].mat.install(UpgradeCard::AdminPrivilege);
        assert_eq!(
            game.choose_admin_privilege_register(ids[0], 7),
            Err(ActionError::InvalidRegister { register: 7 })
        );
        game.choose_admin_privilege_register(ids[0], 2).unwrap();
        assert_eq!(
            game.choose_admin_privilege_register(ids[0], 3),
            Err(ActionError::PrivilegeAlreadyUsed)
        );
    }
}
