//! Built-in courses.
//!
//! Real maps come from an external loader; these are assembled in code for
//! the text driver, self-play, and benchmarks.

use super::position::{Direction, Position, Rotation};
use super::state::{Board, BoardBuilder, BoardError};
use super::tile::Tile;

/// Region tag of the starting sub-board.
pub const START_REGION: &str = "Start A";

/// Region tag of the course sub-board.
pub const COURSE_REGION: &str = "5B";

fn p(row: i32, col: i32) -> Position {
    Position::new(row, col)
}

/// A 10x13 practice course: a 3-column start board on the left and a
/// 10-column course with belts, gears, pits, a wall laser, a push panel,
/// two energy spaces, and two checkpoints (the first one riding a belt).
pub fn practice_course() -> Result<Board, BoardError> {
    let mut b = BoardBuilder::new(10, 13)
        .region_columns(0..3, START_REGION)
        .region_columns(3..13, COURSE_REGION)
        .tile(p(4, 0), Tile::Antenna { facing: Direction::Right });

    for start in [p(1, 1), p(2, 0), p(3, 1), p(5, 1), p(6, 1), p(8, 1)] {
        b = b.tile(start, Tile::StartPoint);
    }

    // Blue express lane along row 1 turning down column 9.
    for col in 3..9 {
        b = b.tile(p(1, col), Tile::belt(2, Direction::Right, &[Direction::Left]));
    }
    b = b
        .tile(p(1, 9), Tile::belt(2, Direction::Bottom, &[Direction::Left]))
        .tile(p(2, 9), Tile::belt(2, Direction::Bottom, &[Direction::Top]))
        .tile(p(3, 9), Tile::belt(2, Direction::Bottom, &[Direction::Top]));

    // Green lane up column 11 carrying checkpoint 1.
    for row in 6..9 {
        b = b.tile(p(row, 11), Tile::belt(1, Direction::Top, &[Direction::Bottom]));
    }
    b = b.tile(p(8, 11), Tile::Checkpoint { number: 1 });

    b = b
        .tile(p(5, 6), Tile::Gear { rotation: Rotation::Clockwise })
        .tile(p(3, 10), Tile::Gear { rotation: Rotation::CounterClockwise })
        .tile(p(4, 8), Tile::Pit)
        .tile(p(6, 4), Tile::Pit)
        .tile(p(5, 12), Tile::wall(&[Direction::Right]))
        .tile(p(5, 12), Tile::wall_laser(Direction::Left, 1))
        .tile(p(7, 5), Tile::wall(&[Direction::Top]))
        .tile(p(3, 6), Tile::wall(&[Direction::Left]))
        .tile(p(8, 6), Tile::wall(&[Direction::Bottom]))
        .tile(
            p(8, 6),
            Tile::PushPanel {
                push: Direction::Top,
                registers: vec![1, 3],
            },
        )
        .tile(p(2, 4), Tile::EnergySpace { cubes: 1 })
        .tile(p(7, 9), Tile::EnergySpace { cubes: 1 })
        .tile(p(0, 11), Tile::reboot_token(COURSE_REGION, Direction::Bottom))
        .tile(p(3, 5), Tile::Checkpoint { number: 2 });

    b.build()
}
