//! Match settings
//!
//! Loaded from a JSON file by the headless runner. Every field has a
//! default, so a settings file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controller::ai::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::DataError;
use crate::sim::har::PilotStats;

/// Who drives a player slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Actions pushed by the host (keyboard, network, replay)
    Human,
    /// Built-in AI, difficulty 1..=7
    Ai { difficulty: u8 },
}

impl Default for ControllerKind {
    fn default() -> Self {
        ControllerKind::Ai { difficulty: 4 }
    }
}

/// Per-player configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub controller: ControllerKind,
    pub pilot: PilotStats,
    /// Character JSON file; the built-in sample character when unset
    pub character: Option<PathBuf>,
}

/// Match configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Seed for every random draw in the match
    pub seed: u64,
    pub players: [PlayerSettings; 2],
    /// Starting x of each HAR
    pub start_x: [f32; 2],
    /// Ticks before input is accepted
    pub start_delay: u64,
    /// Runner gives up after this many ticks
    pub tick_limit: u64,
    /// Scene JSON file; the sample arena when unset
    pub scene: Option<PathBuf>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            players: Default::default(),
            start_x: [100.0, 220.0],
            start_delay: 30,
            tick_limit: 6000,
            scene: None,
        }
    }
}

impl MatchSettings {
    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded match settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        for player in &self.players {
            let pilot = player.pilot;
            for (name, value) in [
                ("power", pilot.power),
                ("agility", pilot.agility),
                ("endurance", pilot.endurance),
            ] {
                if value > PilotStats::MAX {
                    return Err(DataError::stat(name, value));
                }
            }
            if let ControllerKind::Ai { difficulty } = player.controller {
                if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
                    return Err(DataError::stat("difficulty", difficulty));
                }
            }
        }
        for x in self.start_x {
            if !x.is_finite() {
                return Err(DataError::stat("start_x", x));
            }
        }
        Ok(())
    }

    /// True when no player slot is driven by a human
    pub fn is_demo(&self) -> bool {
        self.players
            .iter()
            .all(|p| matches!(p.controller, ControllerKind::Ai { .. }))
    }
}
