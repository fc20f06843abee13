//! Board state: the tile grid, live robot states, and derived indices.
//!
//! The grid topology is fixed once built. What changes during a game is the
//! robot map, checkpoint tiles riding conveyors, and energy cube counts.
//! Every spatial consequence of an operation is appended to an effects
//! outbox that the game drains and turns into player-facing events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::position::{Direction, Position, Rotation};
use super::tile::{Region, Tile};

/// Identifies a robot figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(pub u8);

/// Live state of a robot placed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotState {
    pub position: Position,
    pub facing: Direction,
    pub rebooting: bool,
    /// The start tile chosen during setup.
    pub start: Position,
}

/// A spatial consequence recorded by a board operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEffect {
    Moved(RobotId, Position),
    Turned(RobotId, Rotation),
    Rebooted(RobotId),
    /// Robot hit by a laser for the given damage.
    Shot(RobotId, u32),
    CheckpointMoved(u8, Position),
}

/// How `move_robot` evaluates its predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementChecks {
    /// Every predicate runs, side effects included, even after one failed.
    #[default]
    Exhaustive,
    /// Stop at the first failing predicate.
    ShortCircuit,
}

/// Structural problems found while building a board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("board must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("tile placed outside the board at {0}")]
    OutOfBounds(Position),

    #[error("board has no antenna")]
    MissingAntenna,

    #[error("board has more than one antenna ({0} found)")]
    MultipleAntennas(usize),

    #[error("conveyor at {0} has invalid speed {1}")]
    InvalidConveyorSpeed(Position, u8),

    #[error("conveyor at {0} has more than two inflows")]
    TooManyInflows(Position),

    #[error("checkpoints must be numbered 1..{expected}, found {found:?}")]
    CheckpointNumbering { expected: usize, found: Vec<u8> },

    #[error("board has no start points")]
    NoStartPoints,
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub region: Region,
    pub tiles: Vec<Tile>,
}

/// The game board.
#[derive(Debug, Clone)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    pub(crate) robots: BTreeMap<RobotId, RobotState>,
    pub(crate) checks: MovementChecks,
    /// Cells currently being vacated by a reboot; nested reboots avoid them.
    pub(crate) reserved: Vec<Position>,
    // Derived indices, all in row-major order.
    conveyors: [Vec<Position>; 2],
    push_panels: Vec<Position>,
    gears: Vec<Position>,
    energy_spaces: Vec<Position>,
    pub(crate) checkpoints: Vec<(u8, Position)>,
    antenna: (Position, Direction),
    laser_origins: Vec<Position>,
    start_points: Vec<Position>,
    reboot_tokens: Vec<Position>,
    effects: Vec<BoardEffect>,
}

impl Board {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.row as usize * self.cols + pos.col as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index(pos).map(move |i| &mut self.cells[i])
    }

    /// Tiles on a cell; empty slice when out of bounds.
    pub fn tiles(&self, pos: Position) -> &[Tile] {
        self.cell(pos).map_or(&[], |c| c.tiles.as_slice())
    }

    pub fn region(&self, pos: Position) -> Region {
        self.cell(pos).map(|c| c.region.clone()).unwrap_or_default()
    }

    /// True if any tile on `pos` blocks the side facing `dir`.
    pub fn wall_blocks(&self, pos: Position, dir: Direction) -> bool {
        self.tiles(pos).iter().any(|t| t.blocks(dir))
    }

    pub fn is_pit(&self, pos: Position) -> bool {
        self.tiles(pos).iter().any(Tile::is_pit)
    }

    pub fn has_antenna(&self, pos: Position) -> bool {
        self.tiles(pos).iter().any(Tile::is_antenna)
    }

    pub fn antenna(&self) -> (Position, Direction) {
        self.antenna
    }

    pub fn conveyors(&self, speed: u8) -> &[Position] {
        match speed {
            2 => &self.conveyors[1],
            _ => &self.conveyors[0],
        }
    }

    pub fn push_panels(&self) -> &[Position] {
        &self.push_panels
    }

    pub fn gears(&self) -> &[Position] {
        &self.gears
    }

    pub fn energy_spaces(&self) -> &[Position] {
        &self.energy_spaces
    }

    pub fn laser_origins(&self) -> &[Position] {
        &self.laser_origins
    }

    pub fn start_points(&self) -> &[Position] {
        &self.start_points
    }

    pub fn reboot_tokens(&self) -> &[Position] {
        &self.reboot_tokens
    }

    /// Number of checkpoints on the board, i.e. the count needed to win.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn checkpoint_position(&self, number: u8) -> Option<Position> {
        self.checkpoints
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, p)| *p)
    }

    pub fn checkpoint_at(&self, pos: Position) -> Option<u8> {
        self.tiles(pos).iter().find_map(Tile::checkpoint)
    }

    pub fn movement_checks(&self) -> MovementChecks {
        self.checks
    }

    pub fn set_movement_checks(&mut self, checks: MovementChecks) {
        self.checks = checks;
    }

    // --- robots ---

    /// Places a robot on a free in-bounds cell and records it as its start.
    /// Returns false if the cell is occupied or off the board.
    pub fn place_robot(&mut self, robot: RobotId, pos: Position, facing: Direction) -> bool {
        if !self.in_bounds(pos) || self.robot_at(pos).is_some() {
            return false;
        }
        self.robots.insert(
            robot,
            RobotState {
                position: pos,
                facing,
                rebooting: false,
                start: pos,
            },
        );
        self.effects.push(BoardEffect::Moved(robot, pos));
        true
    }

    pub fn remove_robot(&mut self, robot: RobotId) -> Option<RobotState> {
        self.robots.remove(&robot)
    }

    pub fn robot(&self, robot: RobotId) -> Option<&RobotState> {
        self.robots.get(&robot)
    }

    pub fn robots(&self) -> impl Iterator<Item = (RobotId, &RobotState)> {
        self.robots.iter().map(|(id, s)| (*id, s))
    }

    pub fn robot_position(&self, robot: RobotId) -> Option<Position> {
        self.robots.get(&robot).map(|s| s.position)
    }

    pub fn robot_at(&self, pos: Position) -> Option<RobotId> {
        self.robots
            .iter()
            .find(|(_, s)| s.position == pos)
            .map(|(id, _)| *id)
    }

    pub fn is_rebooting(&self, robot: RobotId) -> bool {
        self.robots.get(&robot).map_or(false, |s| s.rebooting)
    }

    pub fn clear_rebooting(&mut self) {
        for state in self.robots.values_mut() {
            state.rebooting = false;
        }
    }

    /// Rotates a robot a quarter turn.
    pub fn turn_robot(&mut self, robot: RobotId, rotation: Rotation) {
        if let Some(state) = self.robots.get_mut(&robot) {
            state.facing = state.facing.rotate(rotation);
            self.effects.push(BoardEffect::Turned(robot, rotation));
        }
    }

    /// Sets a robot's facing directly, reporting the turns needed to get there.
    pub fn set_facing(&mut self, robot: RobotId, facing: Direction) {
        let Some(state) = self.robots.get_mut(&robot) else {
            return;
        };
        let current = state.facing;
        state.facing = facing;
        match current.rotation_to(facing) {
            Some(rotation) => self.effects.push(BoardEffect::Turned(robot, rotation)),
            None if current != facing => {
                self.effects.push(BoardEffect::Turned(robot, Rotation::Clockwise));
                self.effects.push(BoardEffect::Turned(robot, Rotation::Clockwise));
            }
            None => {}
        }
    }

    /// Relocates a robot without any checks.
    pub(crate) fn relocate(&mut self, robot: RobotId, pos: Position) {
        if let Some(state) = self.robots.get_mut(&robot) {
            state.position = pos;
            self.effects.push(BoardEffect::Moved(robot, pos));
        }
    }

    pub(crate) fn push_effect(&mut self, effect: BoardEffect) {
        self.effects.push(effect);
    }

    /// Drains the effects recorded since the last call.
    pub fn take_effects(&mut self) -> Vec<BoardEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Rotates robots standing on gears.
    pub fn activate_gears(&mut self) {
        for i in 0..self.gears.len() {
            let pos = self.gears[i];
            let Some(rotation) = self.tiles(pos).iter().find_map(Tile::gear) else {
                continue;
            };
            if let Some(robot) = self.robot_at(pos) {
                self.turn_robot(robot, rotation);
            }
        }
    }

    /// Fires push panels registered for `register`.
    pub fn activate_push_panels(&mut self, register: usize) {
        for i in 0..self.push_panels.len() {
            let pos = self.push_panels[i];
            let Some(push) = self.tiles(pos).iter().find_map(|t| t.push_on(register)) else {
                continue;
            };
            if let Some(robot) = self.robot_at(pos) {
                self.move_robot(robot, push);
            }
        }
    }

    /// Takes one energy cube from the space under `pos`, if any remain.
    pub fn take_energy_cube(&mut self, pos: Position) -> bool {
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        for tile in cell.tiles.iter_mut() {
            if let Tile::EnergySpace { cubes } = tile {
                if *cubes > 0 {
                    *cubes -= 1;
                    return true;
                }
            }
        }
        false
    }

    pub fn is_energy_space(&self, pos: Position) -> bool {
        self.tiles(pos)
            .iter()
            .any(|t| matches!(t, Tile::EnergySpace { .. }))
    }
}

/// Builds a board from tiles supplied by an external map loader.
#[derive(Debug, Clone)]
pub struct BoardBuilder {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    out_of_bounds: Vec<Position>,
}

impl BoardBuilder {
    pub fn new(rows: usize, cols: usize) -> Self {
        BoardBuilder {
            rows,
            cols,
            cells: vec![Cell::default(); rows * cols],
            out_of_bounds: Vec::new(),
        }
    }

    fn slot(&mut self, pos: Position) -> Option<&mut Cell> {
        if pos.row < 0 || pos.col < 0 || pos.row as usize >= self.rows || pos.col as usize >= self.cols {
            self.out_of_bounds.push(pos);
            return None;
        }
        let idx = pos.row as usize * self.cols + pos.col as usize;
        Some(&mut self.cells[idx])
    }

    /// Appends a tile to a cell.
    pub fn tile(mut self, pos: Position, tile: Tile) -> Self {
        if let Some(cell) = self.slot(pos) {
            cell.tiles.push(tile);
        }
        self
    }

    /// Tags every cell in the column range `cols` (all rows) with a region.
    pub fn region_columns(mut self, cols: std::ops::Range<usize>, tag: &str) -> Self {
        for row in 0..self.rows {
            for col in cols.clone() {
                if col < self.cols {
                    self.cells[row * self.cols + col].region = Region::new(tag);
                }
            }
        }
        self
    }

    /// Tags every cell with a region.
    pub fn region_all(self, tag: &str) -> Self {
        let cols = self.cols;
        self.region_columns(0..cols, tag)
    }

    /// Validates the layout and derives the lookup indices.
    pub fn build(self) -> Result<Board, BoardError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(BoardError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if let Some(pos) = self.out_of_bounds.first() {
            return Err(BoardError::OutOfBounds(*pos));
        }

        let mut cells = self.cells;
        let mut conveyors = [Vec::new(), Vec::new()];
        let mut push_panels = Vec::new();
        let mut gears = Vec::new();
        let mut energy_spaces = Vec::new();
        let mut checkpoints = Vec::new();
        let mut antennas = Vec::new();
        let mut laser_origins = Vec::new();
        let mut start_points = Vec::new();
        let mut reboot_tokens = Vec::new();

        for (i, cell) in cells.iter_mut().enumerate() {
            let pos = Position::new((i / self.cols) as i32, (i % self.cols) as i32);
            let walls: Vec<Tile> = cell
                .tiles
                .iter()
                .filter(|t| matches!(t, Tile::Wall { .. }))
                .cloned()
                .collect();
            let mut is_origin = false;

            for tile in cell.tiles.iter_mut() {
                match tile {
                    Tile::Conveyor(info) => {
                        if info.speed != 1 && info.speed != 2 {
                            return Err(BoardError::InvalidConveyorSpeed(pos, info.speed));
                        }
                        if info.inflows.len() > 2 {
                            return Err(BoardError::TooManyInflows(pos));
                        }
                        conveyors[info.speed as usize - 1].push(pos);
                    }
                    Tile::PushPanel { .. } => push_panels.push(pos),
                    Tile::Gear { .. } => gears.push(pos),
                    Tile::EnergySpace { .. } => energy_spaces.push(pos),
                    Tile::Checkpoint { number } => checkpoints.push((*number, pos)),
                    Tile::Antenna { facing } => antennas.push((pos, *facing)),
                    Tile::StartPoint => start_points.push(pos),
                    Tile::RebootToken { .. } => reboot_tokens.push(pos),
                    Tile::Laser(info) => {
                        let behind = info.facing.invert();
                        info.origin = walls.iter().any(|w| w.blocks(behind));
                        is_origin |= info.origin;
                    }
                    _ => {}
                }
            }
            if is_origin {
                laser_origins.push(pos);
            }
        }

        let antenna = match antennas.len() {
            0 => return Err(BoardError::MissingAntenna),
            1 => antennas[0],
            n => return Err(BoardError::MultipleAntennas(n)),
        };
        if start_points.is_empty() {
            return Err(BoardError::NoStartPoints);
        }

        checkpoints.sort_by_key(|(n, _)| *n);
        let numbering_ok = checkpoints
            .iter()
            .enumerate()
            .all(|(i, (n, _))| *n as usize == i + 1);
        if !numbering_ok {
            return Err(BoardError::CheckpointNumbering {
                expected: checkpoints.len(),
                found: checkpoints.iter().map(|(n, _)| *n).collect(),
            });
        }

        Ok(Board {
            rows: self.rows,
            cols: self.cols,
            cells,
            robots: BTreeMap::new(),
            checks: MovementChecks::default(),
            reserved: Vec::new(),
            conveyors,
            push_panels,
            gears,
            energy_spaces,
            checkpoints,
            antenna,
            laser_origins,
            start_points,
            reboot_tokens,
            effects: Vec::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An empty board tagged region "A" with one start point in the bottom-left corner.
    pub(crate) fn bare_board(rows: usize, cols: usize) -> BoardBuilder {
        BoardBuilder::new(rows, cols)
            .region_all("A")
            .tile(Position::new(rows as i32 - 1, 0), Tile::StartPoint)
    }

    fn with_antenna(b: BoardBuilder, pos: Position) -> BoardBuilder {
        b.tile(pos, Tile::Antenna { facing: Direction::Right })
    }

    #[test]
    fn build_rejects_missing_antenna() {
        let err = bare_board(3, 3).build().unwrap_err();
        assert_eq!(err, BoardError::MissingAntenna);
    }

    #[test]
    fn build_rejects_second_antenna() {
        let b = with_antenna(bare_board(3, 3), Position::new(0, 0));
        let err = with_antenna(b, Position::new(1, 1)).build().unwrap_err();
        assert_eq!(err, BoardError::MultipleAntennas(2));
    }

    #[test]
    fn build_rejects_checkpoint_gap() {
        let err = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(1, 1), Tile::Checkpoint { number: 1 })
            .tile(Position::new(1, 2), Tile::Checkpoint { number: 3 })
            .build()
            .unwrap_err();
        assert!(matches!(err, BoardError::CheckpointNumbering { expected: 2, .. }));
    }

    #[test]
    fn build_rejects_out_of_bounds_tile() {
        let err = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(5, 0), Tile::Pit)
            .build()
            .unwrap_err();
        assert_eq!(err, BoardError::OutOfBounds(Position::new(5, 0)));
    }

    #[test]
    fn build_rejects_bad_conveyor_speed() {
        let err = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(1, 1), Tile::belt(3, Direction::Right, &[]))
            .build()
            .unwrap_err();
        assert_eq!(err, BoardError::InvalidConveyorSpeed(Position::new(1, 1), 3));
    }

    #[test]
    fn laser_with_wall_behind_is_origin() {
        let board = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(1, 0), Tile::wall(&[Direction::Left]))
            .tile(Position::new(1, 0), Tile::wall_laser(Direction::Right, 1))
            .tile(Position::new(1, 1), Tile::wall_laser(Direction::Right, 1))
            .build()
            .unwrap();
        assert_eq!(board.laser_origins(), &[Position::new(1, 0)]);
        let origin = board.tiles(Position::new(1, 0)).iter().find_map(Tile::laser).unwrap();
        assert!(origin.origin);
    }

    #[test]
    fn indices_are_row_major() {
        let board = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(2, 2), Tile::belt(1, Direction::Left, &[]))
            .tile(Position::new(0, 2), Tile::belt(1, Direction::Left, &[]))
            .tile(Position::new(1, 1), Tile::belt(2, Direction::Top, &[]))
            .build()
            .unwrap();
        assert_eq!(board.conveyors(1), &[Position::new(0, 2), Position::new(2, 2)]);
        assert_eq!(board.conveyors(2), &[Position::new(1, 1)]);
        assert_eq!(board.antenna(), (Position::new(0, 0), Direction::Right));
    }

    #[test]
    fn place_robot_rejects_occupied_cell() {
        let mut board = with_antenna(bare_board(3, 3), Position::new(0, 0)).build().unwrap();
        assert!(board.place_robot(RobotId(1), Position::new(1, 1), Direction::Right));
        assert!(!board.place_robot(RobotId(2), Position::new(1, 1), Direction::Right));
        assert!(!board.place_robot(RobotId(2), Position::new(3, 1), Direction::Right));
        assert_eq!(board.robot_at(Position::new(1, 1)), Some(RobotId(1)));
    }

    #[test]
    fn gears_turn_robots() {
        let mut board = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(1, 1), Tile::Gear { rotation: Rotation::CounterClockwise })
            .build()
            .unwrap();
        board.place_robot(RobotId(1), Position::new(1, 1), Direction::Top);
        board.take_effects();
        board.activate_gears();
        assert_eq!(board.robot(RobotId(1)).unwrap().facing, Direction::Left);
        assert_eq!(
            board.take_effects(),
            vec![BoardEffect::Turned(RobotId(1), Rotation::CounterClockwise)]
        );
    }

    fn panel_board(extra: &[(Position, Tile)]) -> Board {
        let mut b = with_antenna(bare_board(4, 4), Position::new(0, 0)).tile(
            Position::new(2, 2),
            Tile::PushPanel {
                push: Direction::Top,
                registers: vec![1, 3],
            },
        );
        for (pos, tile) in extra {
            b = b.tile(*pos, tile.clone());
        }
        b.build().unwrap()
    }

    #[test]
    fn push_panel_fires_only_on_its_registers() {
        let mut board = panel_board(&[]);
        board.place_robot(RobotId(1), Position::new(2, 2), Direction::Right);
        board.activate_push_panels(0);
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(2, 2)));
        board.activate_push_panels(1);
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 2)));
        assert_eq!(board.robot(RobotId(1)).unwrap().facing, Direction::Right);
    }

    #[test]
    fn push_panel_blocked_by_wall() {
        let mut board = panel_board(&[(Position::new(1, 2), Tile::wall(&[Direction::Bottom]))]);
        board.place_robot(RobotId(1), Position::new(2, 2), Direction::Right);
        board.activate_push_panels(3);
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(2, 2)));
    }

    #[test]
    fn push_panel_pushes_the_robot_ahead() {
        let mut board = panel_board(&[]);
        board.place_robot(RobotId(1), Position::new(2, 2), Direction::Right);
        board.place_robot(RobotId(2), Position::new(1, 2), Direction::Left);
        board.activate_push_panels(3);
        assert_eq!(board.robot_position(RobotId(1)), Some(Position::new(1, 2)));
        assert_eq!(board.robot_position(RobotId(2)), Some(Position::new(0, 2)));
    }

    #[test]
    fn energy_cubes_run_out() {
        let mut board = with_antenna(bare_board(3, 3), Position::new(0, 0))
            .tile(Position::new(1, 1), Tile::EnergySpace { cubes: 1 })
            .build()
            .unwrap();
        assert!(board.take_energy_cube(Position::new(1, 1)));
        assert!(!board.take_energy_cube(Position::new(1, 1)));
        assert!(board.is_energy_space(Position::new(1, 1)));
    }
}
