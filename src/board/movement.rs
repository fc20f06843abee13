//! Robot movement, pushing, and reboot placement.
//!
//! `move_robot` evaluates a fixed list of named predicates. Two of them
//! (leaving the board, entering a pit) reboot the robot as a side effect,
//! so under [`MovementChecks::Exhaustive`] every predicate runs even after
//! an earlier one has already failed.

use tracing::{debug, warn};

use super::position::{Direction, Position};
use super::state::{Board, BoardEffect, MovementChecks, RobotId};
use super::tile::{Region, Tile};

/// Push direction used when clearing an occupied start tile during reboot.
const START_PUSH_DIRECTION: Direction = Direction::Bottom;

/// The movement predicates, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCheck {
    NoWallOnCurrent,
    TargetInBounds,
    NoWallOnTarget,
    TargetNotPit,
    TargetNotAntenna,
    TargetFreeOrPushed,
}

pub const MOVE_CHECKS: [MoveCheck; 6] = [
    MoveCheck::NoWallOnCurrent,
    MoveCheck::TargetInBounds,
    MoveCheck::NoWallOnTarget,
    MoveCheck::TargetNotPit,
    MoveCheck::TargetNotAntenna,
    MoveCheck::TargetFreeOrPushed,
];

impl Board {
    /// Moves a robot one cell in `dir`, pushing any robot in the way.
    ///
    /// Returns true if the robot now stands on the target cell. Leaving the
    /// board or entering a pit reboots the robot and returns false.
    pub fn move_robot(&mut self, robot: RobotId, dir: Direction) -> bool {
        let Some(current) = self.robot_position(robot) else {
            return false;
        };
        let target = current.neighbor(dir);

        let mut all_hold = true;
        for check in MOVE_CHECKS {
            if !all_hold && self.checks == MovementChecks::ShortCircuit {
                break;
            }
            let holds = self.evaluate(check, robot, current, target, dir);
            if !holds {
                debug!(robot = robot.0, ?check, %current, ?dir, "move check failed");
            }
            all_hold &= holds;
        }

        if all_hold {
            self.relocate(robot, target);
        }
        all_hold
    }

    fn evaluate(
        &mut self,
        check: MoveCheck,
        robot: RobotId,
        current: Position,
        target: Position,
        dir: Direction,
    ) -> bool {
        let in_bounds = self.in_bounds(target);
        match check {
            MoveCheck::NoWallOnCurrent => !self.wall_blocks(current, dir),
            MoveCheck::TargetInBounds => {
                if !in_bounds {
                    let region = self.region(current);
                    self.reboot(robot, &region);
                }
                in_bounds
            }
            MoveCheck::NoWallOnTarget => !in_bounds || !self.wall_blocks(target, dir.invert()),
            MoveCheck::TargetNotPit => {
                if in_bounds && self.is_pit(target) {
                    let region = self.region(target);
                    self.reboot(robot, &region);
                    return false;
                }
                true
            }
            MoveCheck::TargetNotAntenna => !in_bounds || !self.has_antenna(target),
            MoveCheck::TargetFreeOrPushed => match self.robot_at(target) {
                Some(other) if other != robot => self.attempt_push(other, dir),
                _ => true,
            },
        }
    }

    /// Pushes `robot` one cell in `dir`, vacating its cell.
    ///
    /// Walks the chain of robots lined up in `dir`. Each link must be free of
    /// walls on its own cell and on the cell ahead; any blocked link blocks
    /// the whole chain. The chain is then moved from the far end. Returns true
    /// if the first robot's cell is free afterwards, which includes robots
    /// shoved off the board or into a pit.
    pub fn attempt_push(&mut self, robot: RobotId, dir: Direction) -> bool {
        let Some(origin) = self.robot_position(robot) else {
            return true;
        };

        let mut chain = vec![robot];
        let mut pos = origin;
        loop {
            if self.wall_blocks(pos, dir) {
                return false;
            }
            let next = pos.neighbor(dir);
            if self.in_bounds(next) && self.wall_blocks(next, dir.invert()) {
                return false;
            }
            match self.robot_at(next) {
                Some(other) if !chain.contains(&other) => {
                    chain.push(other);
                    pos = next;
                }
                _ => break,
            }
        }

        while let Some(link) = chain.pop() {
            let Some(from) = self.robot_position(link) else {
                continue;
            };
            self.move_robot(link, dir);
            if self.robot_at(from) == Some(link) {
                return false;
            }
        }
        self.robot_at(origin).is_none()
    }

    /// Moves a robot to a reboot tile after it fell off the board or into a
    /// pit in `region`.
    ///
    /// Candidates: reboot tokens of the same region, then the robot's start
    /// tile (start regions only), then any reboot token. The first candidate
    /// whose occupant can be pushed away wins.
    pub fn reboot(&mut self, robot: RobotId, region: &Region) {
        let Some(state) = self.robots.get(&robot).copied() else {
            return;
        };

        let mut candidates: Vec<(Position, Direction, Option<Direction>)> = self
            .reboot_tokens()
            .iter()
            .filter_map(|&p| {
                let (tag, push) = self.tiles(p).iter().find_map(Tile::reboot_push)?;
                (tag == region.as_str()).then_some((p, push, Some(push)))
            })
            .collect();
        if region.is_start() {
            candidates.push((state.start, START_PUSH_DIRECTION, None));
        } else {
            for &p in self.reboot_tokens() {
                if let Some((_, push)) = self.tiles(p).iter().find_map(Tile::reboot_push) {
                    candidates.push((p, push, Some(push)));
                }
            }
        }

        let placed = candidates
            .into_iter()
            .find_map(|(pos, push, facing)| self.vacate_for(robot, pos, push).then_some((pos, facing)));

        match placed {
            Some((pos, facing)) => {
                debug!(robot = robot.0, %pos, region = region.as_str(), "robot rebooted");
                self.relocate(robot, pos);
                if let Some(facing) = facing {
                    self.set_facing(robot, facing);
                }
            }
            None => {
                warn!(robot = robot.0, region = region.as_str(), "no free reboot tile, robot stays");
            }
        }

        if let Some(state) = self.robots.get_mut(&robot) {
            state.rebooting = true;
        }
        self.push_effect(BoardEffect::Rebooted(robot));
    }

    /// Clears `pos` for `robot` by pushing any other occupant in `push`.
    fn vacate_for(&mut self, robot: RobotId, pos: Position, push: Direction) -> bool {
        if self.reserved.contains(&pos) {
            return false;
        }
        match self.robot_at(pos) {
            None => true,
            Some(other) if other == robot => true,
            Some(other) => {
                self.reserved.push(pos);
                let pushed = self.attempt_push(other, push);
                self.reserved.retain(|p| *p != pos);
                pushed && self.robot_at(pos).is_none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::tests::bare_board;
    use crate::board::state::BoardBuilder;
    use crate::board::position::Rotation;

    fn antenna(b: BoardBuilder) -> BoardBuilder {
        b.tile(Position::new(0, 0), Tile::Antenna { facing: Direction::Right })
    }

    #[test]
    fn moves_into_empty_cell() {
        let mut board = antenna(bare_board(3, 3)).build().unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        assert!(board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 2)));
    }

    #[test]
    fn wall_on_current_cell_blocks() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(1, 1), Tile::wall(&[Direction::Right]))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 1)));
    }

    #[test]
    fn wall_on_target_cell_blocks() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(1, 2), Tile::wall(&[Direction::Left]))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 1)));
    }

    #[test]
    fn antenna_blocks() {
        let mut board = antenna(bare_board(3, 3)).build().unwrap();
        board.place_robot(RobotId(1), Position::new(0, 1), Direction::Left);
        assert!(!board.move_robot(RobotId(1), Direction::Left));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(0, 1)));
    }

    #[test]
    fn push_moves_both_robots() {
        let mut board = antenna(bare_board(3, 4)).build().unwrap();
        board.place_robot(RobotId(1), Position::new(1, 0), Direction::Right);
        board.place_robot(RobotId(2), Position::new(1, 1), Direction::Top);
        assert!(board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 1)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(1, 2)));
    }

    #[test]
    fn wall_beyond_pushed_robot_blocks_both() {
        let mut board = antenna(bare_board(3, 4))
            .tile(Position::new(1, 1), Tile::wall(&[Direction::Right]))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 0), Direction::Right);
        board.place_robot(RobotId(2), Position::new(1, 1), Direction::Top);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 0)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(1, 1)));
    }

    #[test]
    fn blocked_chain_end_blocks_whole_chain() {
        let mut board = antenna(bare_board(3, 5))
            .tile(Position::new(1, 3), Tile::wall(&[Direction::Left]))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 0), Direction::Right);
        board.place_robot(RobotId(2), Position::new(1, 1), Direction::Right);
        board.place_robot(RobotId(3), Position::new(1, 2), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 0)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(1, 1)));
        assert_eq!(board.robot_position(RobotId(3)), Some(Position::new(1, 2)));
    }

    #[test]
    fn chain_push_moves_three() {
        let mut board = antenna(bare_board(3, 5)).build().unwrap();
        for (i, col) in [0, 1, 2].iter().enumerate() {
            board.place_robot(RobotId(i as u8 + 1), Position::new(1, *col), Direction::Right);
        }
        assert!(board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 1)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(1, 2)));
        assert_eq!(board.robot_position(RobotId(3)), Some(Position::new(1, 3)));
    }

    #[test]
    fn falling_off_reboots_on_region_token() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(2, 2), Tile::reboot_token("A", Direction::Top))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 0), Direction::Left);
        board.take_effects();
        assert!(!board.move_robot(RobotId(1), Direction::Left));
        let state = board.robot(RobotId(1)).unwrap();
        assert_eq!(state.position, Position::new(2, 2));
        assert!(state.rebooting);
        assert_eq!(state.facing, Direction::Top);
        assert!(board.take_effects().contains(&BoardEffect::Rebooted(RobotId(1))));
    }

    #[test]
    fn pit_reboots_and_pushes_token_occupant() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(1, 2), Tile::Pit)
            .tile(Position::new(2, 1), Tile::reboot_token("A", Direction::Left))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        board.place_robot(RobotId(2), Position::new(2, 1), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(2, 1)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(2, 0)));
        assert!(!board.is_rebooting(RobotId(2)));
    }

    #[test]
    fn start_region_falls_back_to_start_tile() {
        let mut board = antenna(BoardBuilder::new(3, 3).region_all("Start A"))
            .tile(Position::new(2, 0), Tile::StartPoint)
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(2, 0), Direction::Right);
        assert!(board.move_robot(RobotId(1), Direction::Top));
        assert!(!board.move_robot(RobotId(1), Direction::Left));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(2, 0)));
        assert!(board.is_rebooting(RobotId(1)));
    }

    #[test]
    fn other_region_falls_back_to_any_token() {
        let mut board = antenna(BoardBuilder::new(3, 4).region_all("5B").region_columns(0..2, "1A"))
            .tile(Position::new(2, 0), Tile::StartPoint)
            .tile(Position::new(0, 1), Tile::reboot_token("1A", Direction::Right))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 3), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(0, 1)));
    }

    #[test]
    fn exhaustive_checks_reboot_through_wall() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(1, 1), Tile::wall(&[Direction::Right]))
            .tile(Position::new(1, 2), Tile::Pit)
            .tile(Position::new(2, 2), Tile::reboot_token("A", Direction::Top))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert!(board.is_rebooting(RobotId(1)));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(2, 2)));
    }

    #[test]
    fn short_circuit_checks_stop_at_wall() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(1, 1), Tile::wall(&[Direction::Right]))
            .tile(Position::new(1, 2), Tile::Pit)
            .tile(Position::new(2, 2), Tile::reboot_token("A", Direction::Top))
            .build()
            .unwrap();
        board.set_movement_checks(MovementChecks::ShortCircuit);
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        assert!(!board.move_robot(RobotId(1), Direction::Right));
        assert!(!board.is_rebooting(RobotId(1)));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 1)));
    }

    #[test]
    fn pushing_off_the_board_lets_pusher_in() {
        let mut board = antenna(bare_board(3, 3))
            .tile(Position::new(2, 0), Tile::reboot_token("A", Direction::Top))
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right);
        board.place_robot(RobotId(2), Position::new(1, 2), Direction::Right);
        assert!(board.move_robot(RobotId(1), Direction::Right));
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 2)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(2, 0)));
        assert!(board.is_rebooting(RobotId(2)));
    }

    #[test]
    fn set_facing_reports_turns() {
        let mut board = antenna(bare_board(3, 3)).build().unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Top);
        board.take_effects();
        board.set_facing(RobotId(1), Direction::Bottom);
        assert_eq!(
            board.take_effects(),
            vec![
                BoardEffect::Turned(RobotId(1), Rotation::Clockwise),
                BoardEffect::Turned(RobotId(1), Rotation::Clockwise)
            ]
        );
    }
}
