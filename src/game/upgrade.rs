//! Upgrade phase: refresh the shop, then each player in priority order
//! buys one card or passes.

use super::{ActionError, EnergySource, Game, GameEvent, GamePhase};
use crate::cards::{ShopRefresh, UpgradeCard};
use crate::player::PlayerId;
use crate::priority::PriorityResolver;

impl Game {
    pub(super) fn enter_upgrade(&mut self) {
        self.set_phase(GamePhase::Upgrade);
        for p in self.players.iter_mut() {
            p.has_chosen = false;
        }

        let capacity = self.players.len();
        match self.shop.refresh(capacity, &mut self.rng) {
            ShopRefresh::Refilled(cards) => self.emit(GameEvent::UpgradeShopRefilled { cards }),
            ShopRefresh::Exchanged(cards) => self.emit(GameEvent::UpgradeShopExchanged { cards }),
        }

        self.priority = PriorityResolver::geometric_order(&self.board, &self.registration_robots());
        self.emit(GameEvent::PriorityOrder {
            register: self.register,
            order: self.priority.clone(),
        });
        let first = self.priority.first().copied();
        self.set_current(first);
    }

    /// Buys `card` from the shop, or declines with `None`.
    pub fn buy_upgrade(&mut self, player: PlayerId, card: Option<&str>) -> Result<(), ActionError> {
        let idx = self.player_in_phase(player, GamePhase::Upgrade)?;
        if self.current != Some(player) {
            return Err(ActionError::NotYourTurn);
        }

        if let Some(name) = card {
            let upgrade = UpgradeCard::from_name(name).ok_or_else(|| ActionError::UnknownCard {
                name: name.to_string(),
            })?;
            if !self.shop.offered().contains(&upgrade) {
                return Err(ActionError::CardUnavailable {
                    name: name.to_string(),
                });
            }
            let have = self.players[idx].energy;
            if have < upgrade.cost() {
                return Err(ActionError::InsufficientEnergy {
                    cost: upgrade.cost(),
                    have,
                });
            }

            self.shop.take(upgrade);
            let p = &mut self.players[idx];
            p.energy -= upgrade.cost();
            p.mat.install(upgrade);
            let amount = p.energy;
            self.emit(GameEvent::UpgradeBought {
                player,
                card: upgrade,
            });
            self.emit(GameEvent::EnergyChanged {
                player,
                amount,
                source: EnergySource::Purchase,
            });
        }

        self.players[idx].has_chosen = true;
        let next = self
            .priority
            .iter()
            .copied()
            .find(|id| self.player(*id).map_or(false, |p| !p.has_chosen));
        match next {
            Some(next) => self.set_current(Some(next)),
            None => self.enter_programming(),
        }
        Ok(())
    }
}
