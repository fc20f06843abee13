//! Turn priority from board geometry.
//!
//! Players are ordered by Manhattan distance from their robot to the
//! antenna, ties broken by the angle swept from the antenna's facing.
//! Admin Privilege holders for the current register then jump the queue.

use std::cmp::Ordering;
use std::f64::consts::{PI, TAU};

use crate::board::{Board, Direction, Position, RobotId};
use crate::player::PlayerId;

/// Offset subtracted from the raw angle so the cell straight ahead of the
/// antenna sits at angle zero.
fn facing_offset(facing: Direction) -> f64 {
    match facing {
        Direction::Top => PI / 2.0,
        Direction::Right => 0.0,
        Direction::Bottom => -PI / 2.0,
        Direction::Left => PI,
    }
}

/// Sort key of a robot position relative to the antenna.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityKey {
    pub distance: u32,
    /// Radians in `[0, 2π)`.
    pub angle: f64,
}

impl PriorityKey {
    pub fn new(antenna: Position, facing: Direction, robot: Position) -> Self {
        let d_row = f64::from(antenna.row - robot.row);
        let d_col = f64::from(robot.col - antenna.col);
        let angle = (d_row.atan2(d_col) - facing_offset(facing)).rem_euclid(TAU);
        PriorityKey {
            distance: antenna.manhattan(robot),
            angle,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.angle.total_cmp(&other.angle))
    }
}

/// Computes priority orders from the board's antenna.
pub struct PriorityResolver;

impl PriorityResolver {
    /// Orders `players` (in registration order) by their robots' keys.
    ///
    /// Players whose robot is not on the board keep their relative order
    /// at the end.
    pub fn geometric_order(board: &Board, players: &[(PlayerId, RobotId)]) -> Vec<PlayerId> {
        let (antenna, facing) = board.antenna();
        let mut keyed: Vec<(PlayerId, Option<PriorityKey>)> = players
            .iter()
            .map(|(player, robot)| {
                let key = board
                    .robot_position(*robot)
                    .map(|pos| PriorityKey::new(antenna, facing, pos));
                (*player, key)
            })
            .collect();

        keyed.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => a.compare(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        keyed.into_iter().map(|(player, _)| player).collect()
    }

    /// Moves players privileged for this register to the front.
    ///
    /// Privileged players are taken from the back of `order` to the front,
    /// so among them the geometric order is reversed. Everyone else keeps
    /// their geometric order behind them.
    pub fn apply_admin_privilege(order: &[PlayerId], privileged: &[PlayerId]) -> Vec<PlayerId> {
        let mut adjusted: Vec<PlayerId> = order
            .iter()
            .rev()
            .filter(|p| privileged.contains(p))
            .copied()
            .collect();
        adjusted.extend(order.iter().filter(|p| !privileged.contains(p)).copied());
        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardBuilder, Tile};

    fn board_with_antenna(pos: Position, facing: Direction) -> Board {
        BoardBuilder::new(3, 3)
            .tile(pos, Tile::Antenna { facing })
            .tile(Position::new(0, 0), Tile::StartPoint)
            .build()
            .unwrap()
    }

    fn place(board: &mut Board, cells: &[(i32, i32)]) -> Vec<(PlayerId, RobotId)> {
        cells
            .iter()
            .enumerate()
            .map(|(i, (r, c))| {
                let robot = RobotId(i as u8 + 1);
                board.place_robot(robot, Position::new(*r, *c), Direction::Top);
                (PlayerId(i as u32 + 1), robot)
            })
            .collect()
    }

    #[test]
    fn four_corners_sorted_by_angle() {
        let mut board = board_with_antenna(Position::new(1, 1), Direction::Right);
        let players = place(&mut board, &[(0, 0), (2, 2), (0, 2), (2, 0)]);
        let order = PriorityResolver::geometric_order(&board, &players);
        // (0,2) at 45°, (0,0) at 135°, (2,0) at 225°, (2,2) at 315°.
        assert_eq!(order, vec![PlayerId(3), PlayerId(1), PlayerId(4), PlayerId(2)]);
    }

    #[test]
    fn distance_beats_angle() {
        let mut board = board_with_antenna(Position::new(1, 1), Direction::Right);
        let players = place(&mut board, &[(2, 2), (1, 0)]);
        let order = PriorityResolver::geometric_order(&board, &players);
        assert_eq!(order, vec![PlayerId(2), PlayerId(1)]);
    }

    #[test]
    fn cell_ahead_has_zero_angle_for_every_facing() {
        let antenna = Position::new(5, 5);
        for facing in crate::board::ALL_DIRECTIONS {
            let key = PriorityKey::new(antenna, facing, antenna.neighbor(facing));
            assert!(key.angle.abs() < 1e-9, "{:?} -> {}", facing, key.angle);
            assert_eq!(key.distance, 1);
        }
    }

    #[test]
    fn order_is_deterministic_and_a_permutation() {
        let mut board = board_with_antenna(Position::new(1, 1), Direction::Top);
        let players = place(&mut board, &[(0, 0), (2, 2), (0, 2), (2, 0), (1, 2)]);
        let first = PriorityResolver::geometric_order(&board, &players);
        let second = PriorityResolver::geometric_order(&board, &players);
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, players.iter().map(|(p, _)| *p).collect::<Vec<_>>());
    }

    #[test]
    fn admin_privilege_reverses_privileged_players() {
        let order = vec![PlayerId(1), PlayerId(2), PlayerId(3), PlayerId(4)];
        let adjusted = PriorityResolver::apply_admin_privilege(&order, &[PlayerId(2), PlayerId(4)]);
        assert_eq!(adjusted, vec![PlayerId(4), PlayerId(2), PlayerId(1), PlayerId(3)]);
    }

    #[test]
    fn admin_privilege_without_privileged_keeps_order() {
        let order = vec![PlayerId(3), PlayerId(1), PlayerId(2)];
        assert_eq!(PriorityResolver::apply_admin_privilege(&order, &[]), order);
    }
}
