//! Board tile variants and their capability queries.
//!
//! A cell holds an ordered list of tiles (a wall and a checkpoint may share
//! a cell). Resolution code never matches on concrete variants directly; it
//! asks a tile for the one capability it needs (`blocks`, `conveyor`,
//! `laser`, ...).

use serde::{Deserialize, Serialize};

use super::position::{Direction, Rotation};

/// Set of cell sides, one bit per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sides(u8);

impl Sides {
    pub const fn empty() -> Self {
        Sides(0)
    }

    pub fn of(dirs: &[Direction]) -> Self {
        dirs.iter().fold(Sides(0), |s, d| s.with(*d))
    }

    pub const fn with(self, dir: Direction) -> Self {
        Sides(self.0 | (1 << dir as u8))
    }

    pub const fn contains(self, dir: Direction) -> bool {
        self.0 & (1 << dir as u8) != 0
    }
}

/// Conveyor belt parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorInfo {
    pub outflow: Direction,
    pub inflows: Vec<Direction>,
    /// 1 for green belts, 2 for blue belts.
    pub speed: u8,
}

/// Wall-mounted laser parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaserInfo {
    pub facing: Direction,
    pub damage: u32,
    /// True if the beam starts here (a wall sits behind the emitter).
    pub origin: bool,
}

/// One piece of content on a board cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Tile {
    Empty,
    Wall {
        sides: Sides,
    },
    Pit,
    StartPoint,
    RebootToken {
        region: String,
        push: Direction,
    },
    Antenna {
        facing: Direction,
    },
    Conveyor(ConveyorInfo),
    Gear {
        rotation: Rotation,
    },
    PushPanel {
        push: Direction,
        /// Register indices (0-based) on which the panel fires.
        registers: Vec<usize>,
    },
    Laser(LaserInfo),
    EnergySpace {
        cubes: u32,
    },
    Checkpoint {
        number: u8,
    },
}

impl Tile {
    pub fn wall(dirs: &[Direction]) -> Tile {
        Tile::Wall { sides: Sides::of(dirs) }
    }

    /// A conveyor belt tile.
    pub fn belt(speed: u8, outflow: Direction, inflows: &[Direction]) -> Tile {
        Tile::Conveyor(ConveyorInfo {
            outflow,
            inflows: inflows.to_vec(),
            speed,
        })
    }

    pub fn wall_laser(facing: Direction, damage: u32) -> Tile {
        Tile::Laser(LaserInfo {
            facing,
            damage,
            origin: false,
        })
    }

    pub fn reboot_token(region: &str, push: Direction) -> Tile {
        Tile::RebootToken {
            region: region.to_string(),
            push,
        }
    }

    /// True if this tile stops movement across the cell side facing `dir`.
    pub fn blocks(&self, dir: Direction) -> bool {
        matches!(self, Tile::Wall { sides } if sides.contains(dir))
    }

    pub fn is_pit(&self) -> bool {
        matches!(self, Tile::Pit)
    }

    pub fn is_antenna(&self) -> bool {
        matches!(self, Tile::Antenna { .. })
    }

    pub fn conveyor(&self) -> Option<&ConveyorInfo> {
        match self {
            Tile::Conveyor(info) => Some(info),
            _ => None,
        }
    }

    pub fn laser(&self) -> Option<LaserInfo> {
        match self {
            Tile::Laser(info) => Some(*info),
            _ => None,
        }
    }

    pub fn reboot_push(&self) -> Option<(&str, Direction)> {
        match self {
            Tile::RebootToken { region, push } => Some((region.as_str(), *push)),
            _ => None,
        }
    }

    pub fn gear(&self) -> Option<Rotation> {
        match self {
            Tile::Gear { rotation } => Some(*rotation),
            _ => None,
        }
    }

    /// Push direction if the panel fires on `register`.
    pub fn push_on(&self, register: usize) -> Option<Direction> {
        match self {
            Tile::PushPanel { push, registers } if registers.contains(&register) => Some(*push),
            _ => None,
        }
    }

    pub fn checkpoint(&self) -> Option<u8> {
        match self {
            Tile::Checkpoint { number } => Some(*number),
            _ => None,
        }
    }
}

/// A board-region tag, e.g. `"5B"` or `"Start A"`.
///
/// Matches a falling robot to the reboot token of the sub-board it fell from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(pub String);

impl Region {
    pub fn new(tag: &str) -> Self {
        Region(tag.to_string())
    }

    /// True for the starting sub-board.
    pub fn is_start(&self) -> bool {
        self.0
            .get(..5)
            .map_or(false, |p| p.eq_ignore_ascii_case("start"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
