//! Laser propagation for board-mounted and robot-mounted lasers.

use super::position::{Direction, Position};
use super::state::{Board, BoardEffect, RobotId};
use super::tile::Tile;

impl Board {
    /// Traces a beam from `origin` in `dir` and damages the first robot hit.
    ///
    /// The beam stops at the first occupied cell, at a wall on the current
    /// cell facing `dir`, or at a wall on the next cell facing back. Leaving
    /// the board ends it silently. Returns the robot hit, if any.
    pub fn fire_laser(&mut self, origin: Position, dir: Direction, damage: u32) -> Option<RobotId> {
        let mut pos = origin;
        while self.in_bounds(pos) {
            if let Some(robot) = self.robot_at(pos) {
                self.push_effect(BoardEffect::Shot(robot, damage));
                return Some(robot);
            }
            if self.wall_blocks(pos, dir) {
                return None;
            }
            pos = pos.neighbor(dir);
            if self.in_bounds(pos) && self.wall_blocks(pos, dir.invert()) {
                return None;
            }
        }
        None
    }

    /// Fires every wall-mounted laser origin once.
    pub fn fire_wall_lasers(&mut self) {
        for i in 0..self.laser_origins().len() {
            let pos = self.laser_origins()[i];
            let beams: Vec<(Direction, u32)> = self
                .tiles(pos)
                .iter()
                .filter_map(Tile::laser)
                .filter(|l| l.origin)
                .map(|l| (l.facing, l.damage))
                .collect();
            for (facing, damage) in beams {
                self.fire_laser(pos, facing, damage);
            }
        }
    }

    /// Fires each non-rebooting robot's main laser, plus a rear beam for the
    /// robots listed in `rear_lasers`.
    pub fn fire_robot_lasers(&mut self, rear_lasers: &[RobotId]) {
        let shooters: Vec<(RobotId, Position, Direction)> = self
            .robots()
            .filter(|(_, s)| !s.rebooting)
            .map(|(id, s)| (id, s.position, s.facing))
            .collect();

        for (robot, pos, facing) in shooters {
            let mut beams = vec![facing];
            if rear_lasers.contains(&robot) {
                beams.push(facing.invert());
            }
            for dir in beams {
                if self.wall_blocks(pos, dir) {
                    continue;
                }
                self.fire_laser(pos.neighbor(dir), dir, 1);
            }
        }
    }
}
