//! Players, their robot figures, and the robot mat holding registers and
//! upgrades.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::RobotId;
use crate::cards::{Card, UpgradeCard};

/// Number of program registers on a robot mat.
pub const REGISTER_COUNT: usize = 5;

/// Identifies a player within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Display names of the six robot figures, indexed by `RobotId - 1`.
pub const FIGURES: [&str; 6] = [
    "Hammer Bot",
    "Hulk x90",
    "Smash Bot",
    "Spin Bot",
    "Twonky",
    "Zoom Bot",
];

/// A robot figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Robot {
    pub id: RobotId,
    pub name: &'static str,
}

/// The six figures, handed out to players and returned when they leave.
#[derive(Debug, Clone)]
pub struct FigurePool {
    taken: [bool; FIGURES.len()],
}

impl Default for FigurePool {
    fn default() -> Self {
        FigurePool {
            taken: [false; FIGURES.len()],
        }
    }
}

impl FigurePool {
    /// Claims the lowest-numbered free figure.
    pub fn claim(&mut self) -> Option<Robot> {
        let idx = self.taken.iter().position(|t| !t)?;
        self.taken[idx] = true;
        Some(Robot {
            id: RobotId(idx as u8 + 1),
            name: FIGURES[idx],
        })
    }

    pub fn release(&mut self, robot: RobotId) {
        if let Some(slot) = (robot.0 as usize).checked_sub(1).and_then(|i| self.taken.get_mut(i)) {
            *slot = false;
        }
    }

    pub fn available(&self) -> usize {
        self.taken.iter().filter(|t| !**t).count()
    }
}

/// Registers and upgrades belonging to one robot.
#[derive(Debug, Clone, Default)]
pub struct RobotMat {
    pub registers: [Option<Card>; REGISTER_COUNT],
    pub permanent: Vec<UpgradeCard>,
    pub temporary: Vec<UpgradeCard>,
}

impl RobotMat {
    pub fn is_filled(&self) -> bool {
        self.registers.iter().all(Option::is_some)
    }

    pub fn empty_slots(&self) -> Vec<usize> {
        (0..REGISTER_COUNT)
            .filter(|&i| self.registers[i].is_none())
            .collect()
    }

    /// Empties every register, returning the cards that were in them.
    pub fn clear(&mut self) -> Vec<Card> {
        self.registers.iter_mut().filter_map(Option::take).collect()
    }

    pub fn owns(&self, upgrade: UpgradeCard) -> usize {
        self.permanent
            .iter()
            .chain(self.temporary.iter())
            .filter(|u| **u == upgrade)
            .count()
    }

    pub fn install(&mut self, upgrade: UpgradeCard) {
        if upgrade.is_permanent() {
            self.permanent.push(upgrade);
        } else {
            self.temporary.push(upgrade);
        }
    }
}

/// Per-player game state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub robot: Robot,
    pub energy: u32,
    pub checkpoints: u8,
    /// Start tile chosen (setup) or upgrade decision made (upgrade phase).
    pub has_chosen: bool,
    /// Registers this player claimed Admin Privilege for in the current round.
    pub admin_registers: Vec<usize>,
    pub hand: Vec<Card>,
    pub draw_pile: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub mat: RobotMat,
    /// Last card executed, replayed by Again.
    pub last_played: Option<Card>,
    /// Damage cards still to be picked from the remaining piles.
    pub pending_damage: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, robot: Robot, energy: u32) -> Self {
        Player {
            id,
            name: name.into(),
            robot,
            energy,
            checkpoints: 0,
            has_chosen: false,
            admin_registers: Vec::new(),
            hand: Vec::new(),
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            mat: RobotMat::default(),
            last_played: None,
            pending_damage: 0,
        }
    }

    pub fn register_filled(&self) -> bool {
        self.mat.is_filled()
    }

    /// Draws from the personal deck, reshuffling the discard pile into it
    /// when it runs out.
    pub fn draw_card(&mut self, rng: &mut impl Rng) -> Option<Card> {
        if self.draw_pile.is_empty() {
            self.draw_pile.append(&mut self.discard_pile);
            self.draw_pile.shuffle(rng);
        }
        self.draw_pile.pop()
    }

    /// Draws until the hand holds `size` cards or both piles are empty.
    pub fn top_up_hand(&mut self, size: usize, rng: &mut impl Rng) {
        while self.hand.len() < size {
            match self.draw_card(rng) {
                Some(card) => self.hand.push(card),
                None => break,
            }
        }
    }

    /// Removes one copy of `card` from the hand.
    pub fn take_from_hand(&mut self, card: Card) -> bool {
        match self.hand.iter().position(|c| *c == card) {
            Some(idx) => {
                self.hand.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn discard_hand(&mut self) {
        self.discard_pile.append(&mut self.hand);
    }

    /// Admin Privilege cards owned, i.e. how many registers can be claimed
    /// per round.
    pub fn admin_privileges(&self) -> usize {
        self.mat.owns(UpgradeCard::AdminPrivilege)
    }

    pub fn has_rear_laser(&self) -> bool {
        self.mat.owns(UpgradeCard::RearLaser) > 0
    }
}
