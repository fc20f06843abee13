//! Grid coordinates, facing directions, and rotations.
//!
//! Rows grow downward and columns grow to the right, so `Top` decreases the
//! row index and `Right` increases the column index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A cell on the board as `(row, col)`.
///
/// Signed so that stepping off the top or left edge yields a representable,
/// out-of-bounds position instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// Returns the adjacent cell one step in `dir`.
    pub const fn neighbor(self, dir: Direction) -> Position {
        let (dr, dc) = dir.delta();
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four facings, in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

/// All directions in index order.
pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::Top,
    Direction::Right,
    Direction::Bottom,
    Direction::Left,
];

impl Direction {
    /// Index in the cyclic order Top, Right, Bottom, Left.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(i: usize) -> Direction {
        ALL_DIRECTIONS[i % 4]
    }

    pub const fn turn_clockwise(self) -> Direction {
        Direction::from_index(self.index() + 1)
    }

    pub const fn turn_counter_clockwise(self) -> Direction {
        Direction::from_index(self.index() + 3)
    }

    /// The opposite direction (180 degrees).
    pub const fn invert(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }

    /// Applies a quarter turn.
    pub const fn rotate(self, rotation: Rotation) -> Direction {
        match rotation {
            Rotation::Clockwise => self.turn_clockwise(),
            Rotation::CounterClockwise => self.turn_counter_clockwise(),
        }
    }

    /// Row and column offset of a single step.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Top => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Bottom => (1, 0),
            Direction::Left => (0, -1),
        }
    }

    /// Returns the quarter turn that takes `self` to `to`, if they differ by
    /// exactly 90 degrees.
    pub fn rotation_to(self, to: Direction) -> Option<Rotation> {
        match (to.index() + 4 - self.index()) % 4 {
            1 => Some(Rotation::Clockwise),
            3 => Some(Rotation::CounterClockwise),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Right => "right",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a direction name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: '{0}'")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" | "up" => Ok(Direction::Top),
            "right" => Ok(Direction::Right),
            "bottom" | "down" => Ok(Direction::Bottom),
            "left" => Ok(Direction::Left),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// A quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub const fn reverse(self) -> Rotation {
        match self {
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clockwise_cycle_returns_to_start() {
        let mut d = Direction::Top;
        for _ in 0..4 {
            d = d.turn_clockwise();
        }
        assert_eq!(d, Direction::Top);
        assert_eq!(Direction::Left.turn_clockwise(), Direction::Top);
        assert_eq!(Direction::Top.turn_counter_clockwise(), Direction::Left);
    }

    #[test]
    fn invert_is_half_turn() {
        for d in ALL_DIRECTIONS {
            assert_eq!(d.invert().invert(), d);
            assert_eq!(d.invert(), d.turn_clockwise().turn_clockwise());
        }
    }

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!("TOP".parse::<Direction>(), Ok(Direction::Top));
        assert_eq!("Right".parse::<Direction>(), Ok(Direction::Right));
        assert_eq!("down".parse::<Direction>(), Ok(Direction::Bottom));
        assert!("north".parse::<Direction>().is_err());
    }

    #[test]
    fn rotation_between_neighbors() {
        assert_eq!(Direction::Right.rotation_to(Direction::Bottom), Some(Rotation::Clockwise));
        assert_eq!(Direction::Top.rotation_to(Direction::Left), Some(Rotation::CounterClockwise));
        assert_eq!(Direction::Top.rotation_to(Direction::Bottom), None);
        assert_eq!(Direction::Top.rotation_to(Direction::Top), None);
    }

    #[test]
    fn neighbor_steps_one_cell() {
        let p = Position::new(2, 3);
        assert_eq!(p.neighbor(Direction::Top), Position::new(1, 3));
        assert_eq!(p.neighbor(Direction::Right), Position::new(2, 4));
        assert_eq!(p.neighbor(Direction::Bottom), Position::new(3, 3));
        assert_eq!(p.neighbor(Direction::Left), Position::new(2, 2));
        assert_eq!(Position::new(0, 0).neighbor(Direction::Top), Position::new(-1, 0));
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(Position::new(0, 0).manhattan(Position::new(2, 3)), 5);
        assert_eq!(Position::new(1, 1).manhattan(Position::new(1, 1)), 0);
    }
}
