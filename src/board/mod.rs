//! Board representation and resolution.
//!
//! Contains the tile grid, live robot states, and the spatial rules:
//! movement and pushing, reboots, conveyors, and lasers.

pub mod conveyor;
pub mod laser;
pub mod layouts;
pub mod movement;
pub mod position;
pub mod state;
pub mod tile;

pub use movement::{MoveCheck, MOVE_CHECKS};
pub use position::{Direction, ParseDirectionError, Position, Rotation, ALL_DIRECTIONS};
pub use state::{
    Board, BoardBuilder, BoardEffect, BoardError, Cell, MovementChecks, RobotId, RobotState,
};
pub use tile::{ConveyorInfo, LaserInfo, Region, Sides, Tile};
