//! Game configuration.
//!
//! Every field has a default, so a JSON override file only needs to name
//! the values it changes.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::{Direction, MovementChecks};

/// Pacing delays after each activation pipeline stage, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDelays {
    #[serde(default = "default_conveyor_ms")]
    pub conveyors_ms: u64,
    #[serde(default = "default_short_ms")]
    pub push_panels_ms: u64,
    #[serde(default = "default_short_ms")]
    pub gears_ms: u64,
    #[serde(default = "default_laser_ms")]
    pub wall_lasers_ms: u64,
    #[serde(default = "default_laser_ms")]
    pub robot_lasers_ms: u64,
    #[serde(default = "default_short_ms")]
    pub energy_spaces_ms: u64,
    #[serde(default = "default_short_ms")]
    pub checkpoints_ms: u64,
}

fn default_conveyor_ms() -> u64 {
    1000
}

fn default_short_ms() -> u64 {
    500
}

fn default_laser_ms() -> u64 {
    200
}

impl Default for StageDelays {
    fn default() -> Self {
        StageDelays {
            conveyors_ms: default_conveyor_ms(),
            push_panels_ms: default_short_ms(),
            gears_ms: default_short_ms(),
            wall_lasers_ms: default_laser_ms(),
            robot_lasers_ms: default_laser_ms(),
            energy_spaces_ms: default_short_ms(),
            checkpoints_ms: default_short_ms(),
        }
    }
}

impl StageDelays {
    /// No pacing at all, for simulations.
    pub fn zero() -> Self {
        StageDelays {
            conveyors_ms: 0,
            push_panels_ms: 0,
            gears_ms: 0,
            wall_lasers_ms: 0,
            robot_lasers_ms: 0,
            energy_spaces_ms: 0,
            checkpoints_ms: 0,
        }
    }
}

/// Tunable rules and pacing for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_programming_timeout_ms")]
    pub programming_timeout_ms: u64,
    #[serde(default = "default_activation_window_ms")]
    pub activation_window_ms: u64,
    #[serde(default)]
    pub stage_delays: StageDelays,
    #[serde(default = "default_hand_size")]
    pub hand_size: usize,
    #[serde(default = "default_starting_energy")]
    pub starting_energy: u32,
    #[serde(default = "default_reboot_damage")]
    pub reboot_damage: u32,
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// RNG seed; 0 draws one from the OS.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub movement_checks: MovementChecks,
    #[serde(default = "default_start_facing")]
    pub start_facing: Direction,
    /// Copies of each upgrade card in the shop deck.
    #[serde(default = "default_upgrade_copies")]
    pub upgrade_copies: usize,
}

fn default_programming_timeout_ms() -> u64 {
    30_000
}

fn default_activation_window_ms() -> u64 {
    2_000
}

fn default_hand_size() -> usize {
    9
}

fn default_starting_energy() -> u32 {
    5
}

fn default_reboot_damage() -> u32 {
    2
}

fn default_min_players() -> usize {
    2
}

fn default_max_players() -> usize {
    6
}

fn default_start_facing() -> Direction {
    Direction::Right
}

fn default_upgrade_copies() -> usize {
    10
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            programming_timeout_ms: default_programming_timeout_ms(),
            activation_window_ms: default_activation_window_ms(),
            stage_delays: StageDelays::default(),
            hand_size: default_hand_size(),
            starting_energy: default_starting_energy(),
            reboot_damage: default_reboot_damage(),
            min_players: default_min_players(),
            max_players: default_max_players(),
            seed: 0,
            movement_checks: MovementChecks::default(),
            start_facing: default_start_facing(),
            upgrade_copies: default_upgrade_copies(),
        }
    }
}

/// Problems loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid player bounds: min {min}, max {max} (allowed 1..=6)")]
    PlayerBounds { min: usize, max: usize },

    #[error("hand size {0} cannot fill five registers")]
    HandTooSmall(usize),
}

impl GameConfig {
    /// Loads a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<GameConfig, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    /// Loads a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<GameConfig, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 || self.min_players > self.max_players || self.max_players > 6 {
            return Err(ConfigError::PlayerBounds {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.hand_size < crate::player::REGISTER_COUNT {
            return Err(ConfigError::HandTooSmall(self.hand_size));
        }
        Ok(())
    }

    pub fn programming_timeout(&self) -> Duration {
        Duration::from_millis(self.programming_timeout_ms)
    }

    pub fn activation_window(&self) -> Duration {
        Duration::from_millis(self.activation_window_ms)
    }

    /// A config with every pacing delay at zero.
    pub fn instant() -> Self {
        GameConfig {
            activation_window_ms: 0,
            stage_delays: StageDelays::zero(),
            ..GameConfig::default()
        }
    }
}
