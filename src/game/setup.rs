//! Lobby and start tile selection.

use tracing::info;

use super::{ActionError, Game, GameEvent, GamePhase};
use crate::board::Position;
use crate::cards::starter_deck;
use crate::player::{Player, PlayerId};

impl Game {
    /// Adds a player to the lobby and hands them a free robot figure.
    pub fn join(&mut self, name: &str) -> Result<PlayerId, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if self.started {
            return Err(ActionError::AlreadyStarted);
        }
        if self.players.len() >= self.config.max_players {
            return Err(ActionError::LobbyFull);
        }
        let robot = self.figures.claim().ok_or(ActionError::LobbyFull)?;

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let mut player = Player::new(id, name, robot, self.config.starting_energy);
        player.draw_pile = starter_deck(&mut self.rng);
        self.players.push(player);

        info!(%id, name, figure = robot.name, "player joined");
        self.emit(GameEvent::PlayerJoined {
            player: id,
            name: name.to_string(),
            robot: robot.id,
            figure: robot.name,
        });
        Ok(id)
    }

    /// Removes a player from the lobby. Not possible once the game started.
    pub fn leave(&mut self, player: PlayerId) -> Result<(), ActionError> {
        if self.started {
            return Err(ActionError::AlreadyStarted);
        }
        let idx = self.index_of(player).ok_or(ActionError::UnknownPlayer)?;
        let removed = self.players.remove(idx);
        self.figures.release(removed.robot.id);
        self.emit(GameEvent::PlayerLeft { player });
        Ok(())
    }

    /// Closes the lobby. The first registered player picks a start tile.
    pub fn start_game(&mut self) -> Result<(), ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if self.started {
            return Err(ActionError::AlreadyStarted);
        }
        if self.players.len() < self.config.min_players {
            return Err(ActionError::NotEnoughPlayers {
                min: self.config.min_players,
                have: self.players.len(),
            });
        }
        self.started = true;
        self.set_phase(GamePhase::Setup);
        let first = self.players.first().map(|p| p.id);
        self.set_current(first);
        Ok(())
    }

    /// Places the current player's robot on an unclaimed start tile.
    pub fn select_starting_point(
        &mut self,
        player: PlayerId,
        position: Position,
    ) -> Result<(), ActionError> {
        let idx = self.player_in_phase(player, GamePhase::Setup)?;
        if self.current != Some(player) {
            return Err(ActionError::NotYourTurn);
        }
        if !self.board.start_points().contains(&position) {
            return Err(ActionError::InvalidStartPoint { position });
        }
        if self.board.robot_at(position).is_some() {
            return Err(ActionError::StartPointTaken { position });
        }

        let robot = self.players[idx].robot.id;
        self.board
            .place_robot(robot, position, self.config.start_facing);
        self.players[idx].has_chosen = true;
        self.flush_board();

        let next = self.players.iter().find(|p| !p.has_chosen).map(|p| p.id);
        match next {
            Some(next) => self.set_current(Some(next)),
            None => self.enter_upgrade(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{events, new_game, seeded};
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn lobby_fills_up() {
        let (mut game, _) = new_game(GameConfig {
            max_players: 2,
            ..seeded()
        });
        let a = game.join("a").unwrap();
        game.join("b").unwrap();
        assert_eq!(game.join("c"), Err(ActionError::LobbyFull));
        game.leave(a).unwrap();
        assert!(game.join("c").is_ok());
    }

    #[test]
    fn start_needs_enough_players() {
        let (mut game, _) = new_game(seeded());
        game.join("solo").unwrap();
        assert_eq!(
            game.start_game(),
            Err(ActionError::NotEnoughPlayers { min: 2, have: 1 })
        );
        game.join("duo").unwrap();
        game.start_game().unwrap();
        assert_eq!(game.start_game(), Err(ActionError::AlreadyStarted));
        assert_eq!(game.join("late"), Err(ActionError::AlreadyStarted));
    }

    #[test]
    fn actions_before_start_are_rejected() {
        let (mut game, _) = new_game(seeded());
        let a = game.join("a").unwrap();
        assert_eq!(
            game.select_starting_point(a, Position::new(5, 1)),
            Err(ActionError::GameNotStarted)
        );
    }

    #[test]
    fn start_points_in_registration_order() {
        let (mut game, _) = new_game(seeded());
        let a = game.join("a").unwrap();
        let b = game.join("b").unwrap();
        game.start_game().unwrap();
        assert_eq!(game.current_player(), Some(a));

        assert_eq!(
            game.select_starting_point(b, Position::new(5, 1)),
            Err(ActionError::NotYourTurn)
        );
        assert_eq!(
            game.select_starting_point(a, Position::new(2, 2)),
            Err(ActionError::InvalidStartPoint {
                position: Position::new(2, 2)
            })
        );
        game.select_starting_point(a, Position::new(5, 1)).unwrap();
        assert_eq!(game.current_player(), Some(b));
        assert_eq!(
            game.select_starting_point(b, Position::new(5, 1)),
            Err(ActionError::StartPointTaken {
                position: Position::new(5, 1)
            })
        );
        game.drain_events();
        game.select_starting_point(b, Position::new(5, 3)).unwrap();

        assert_eq!(game.phase(), GamePhase::Upgrade);
        assert_eq!(game.priority().len(), 2);
        let evs = events(&mut game);
        assert!(evs.contains(&GameEvent::RobotMoved {
            player: b,
            position: Position::new(5, 3)
        }));
        assert!(evs.contains(&GameEvent::PhaseChanged {
            phase: GamePhase::Upgrade
        }));
    }
}
