//! Conveyor belt transport.
//!
//! Blue (speed 2) belts run before green (speed 1) belts. Within a pass all
//! robots move simultaneously: any two robots that end the pass on the same
//! cell are put back where they started the pass. Robots carried off the
//! board or into a pit reboot only once the pass has settled.

use std::collections::BTreeMap;

use tracing::debug;

use super::position::{Direction, Position};
use super::state::{Board, BoardEffect, RobotId, RobotState};
use super::tile::{Region, Tile};

impl Board {
    /// Runs the full conveyor stage: checkpoint belts, then both robot passes.
    pub fn activate_conveyors(&mut self) {
        self.move_checkpoints_on_belts();
        for speed in [2, 1] {
            self.conveyor_pass(speed);
        }
        let placements: Vec<(RobotId, Position)> =
            self.robots.iter().map(|(id, s)| (*id, s.position)).collect();
        for (robot, pos) in placements {
            self.push_effect(BoardEffect::Moved(robot, pos));
        }
    }

    fn conveyor_outflow(&self, pos: Position) -> Option<Direction> {
        self.tiles(pos).iter().find_map(|t| t.conveyor().map(|c| c.outflow))
    }

    /// One simultaneous pass over all belts of `speed`.
    fn conveyor_pass(&mut self, speed: u8) {
        let snapshot: BTreeMap<RobotId, RobotState> = self.robots.clone();
        let mut moved: Vec<RobotId> = Vec::new();
        let mut fallen: Vec<(RobotId, Region)> = Vec::new();
        let belts = self.conveyors(speed).to_vec();

        for belt in belts {
            let Some(robot) = snapshot
                .iter()
                .find(|(_, s)| s.position == belt)
                .map(|(id, _)| *id)
            else {
                continue;
            };
            if moved.contains(&robot) {
                continue;
            }
            moved.push(robot);

            let landed = self.belt_step(robot, belt, &mut fallen);
            if speed == 2 {
                if let Some(pos) = landed {
                    if self.conveyor_outflow(pos).is_some() {
                        self.belt_step(robot, pos, &mut fallen);
                    }
                }
            }
        }

        let leaving: Vec<RobotId> = fallen.iter().map(|(id, _)| *id).collect();
        self.roll_back_collisions(&snapshot, &leaving, &leaving);
        for (robot, region) in &fallen {
            self.reboot(*robot, region);
        }
        // A robot with no free reboot tile stays where it fell from.
        if !fallen.is_empty() {
            self.roll_back_collisions(&snapshot, &leaving, &[]);
        }
    }

    /// Carries a robot one cell along the belt at `from`. Returns the new
    /// position, or None if the robot stayed put or left the board. Leaving
    /// robots are queued in `fallen` with the region they reboot from.
    fn belt_step(
        &mut self,
        robot: RobotId,
        from: Position,
        fallen: &mut Vec<(RobotId, Region)>,
    ) -> Option<Position> {
        let dir = self.conveyor_outflow(from)?;
        if self.robot_position(robot) != Some(from) {
            return None;
        }
        if self.wall_blocks(from, dir) {
            return None;
        }
        let target = from.neighbor(dir);
        if !self.in_bounds(target) {
            fallen.push((robot, self.region(from)));
            return None;
        }
        if self.wall_blocks(target, dir.invert()) {
            return None;
        }
        if self.is_pit(target) {
            fallen.push((robot, self.region(target)));
            return None;
        }

        self.relocate(robot, target);
        if let Some(next) = self.conveyor_outflow(target) {
            if let Some(rotation) = dir.rotation_to(next) {
                self.turn_robot(robot, rotation);
            }
        }
        Some(target)
    }

    /// Returns every robot sharing a cell with another one to its snapshot
    /// state, repeating until each cell holds at most one robot. Robots in
    /// `pinned` are never moved back; robots in `ignored` are not checked.
    fn roll_back_collisions(
        &mut self,
        snapshot: &BTreeMap<RobotId, RobotState>,
        pinned: &[RobotId],
        ignored: &[RobotId],
    ) {
        loop {
            let mut colliding: Vec<RobotId> = Vec::new();
            let ids: Vec<RobotId> = self
                .robots
                .keys()
                .copied()
                .filter(|id| !ignored.contains(id))
                .collect();
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i + 1..] {
                    if self.robots[a].position == self.robots[b].position {
                        colliding.push(*a);
                        colliding.push(*b);
                    }
                }
            }
            colliding.retain(|id| !pinned.contains(id) && self.robots[id] != snapshot[id]);
            colliding.sort();
            colliding.dedup();
            if colliding.is_empty() {
                return;
            }

            for robot in colliding {
                let before = snapshot[&robot];
                debug!(robot = robot.0, pos = %before.position, "conveyor collision, rolling back");
                if let Some(state) = self.robots.get_mut(&robot) {
                    state.position = before.position;
                }
                self.set_facing(robot, before.facing);
            }
        }
    }

    /// Carries checkpoint tiles that sit on belts, independent of robots.
    fn move_checkpoints_on_belts(&mut self) {
        let checkpoints = self.checkpoints.clone();
        for (number, start) in checkpoints {
            let Some(speed) = self
                .tiles(start)
                .iter()
                .find_map(|t| t.conveyor().map(|c| c.speed))
            else {
                continue;
            };

            let mut pos = start;
            for _ in 0..speed {
                let Some(dir) = self.conveyor_outflow(pos) else {
                    break;
                };
                let next = pos.neighbor(dir);
                if !self.in_bounds(next) || self.conveyor_outflow(next).is_none() {
                    break;
                }
                pos = next;
            }
            if pos == start {
                continue;
            }

            if let Some(cell) = self.cell_mut(start) {
                cell.tiles.retain(|t| t.checkpoint() != Some(number));
            }
            if let Some(cell) = self.cell_mut(pos) {
                cell.tiles.push(Tile::Checkpoint { number });
            }
            if let Some(entry) = self.checkpoints.iter_mut().find(|(n, _)| *n == number) {
                entry.1 = pos;
            }
            self.push_effect(BoardEffect::CheckpointMoved(number, pos));
        }
    }
}
