//! Character move tables
//!
//! Each character owns up to [`MAX_MOVES`] moves, indexed by animation id.
//! Tables are loaded once (usually from JSON) and shared read-only through
//! `Arc` for the whole match.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::animation::Animation;
use crate::consts::{MAX_HEALTH, MAX_MOVES};
use crate::error::DataError;

/// Move category, controls when a move may be used and how it can be blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveCategory {
    #[default]
    Misc,
    /// Throws; only when close, cannot be blocked
    Close,
    /// Cannot be blocked standing
    Low,
    Medium,
    High,
    /// Only while airborne, cannot be crouch-blocked
    Jumping,
    Projectile,
    Basic,
    Victory,
    FireIce,
    /// Finisher started from the victory pose
    Scrap,
    /// Finisher chained from a scrap
    Destruction,
}

/// One move of a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Input string, most recent input first (`K2` = down then kick)
    #[serde(default)]
    pub move_string: String,
    #[serde(default)]
    pub category: MoveCategory,
    #[serde(default)]
    pub damage: f32,
    /// Follow-up move played instead of dealing damage
    #[serde(default)]
    pub next_move: Option<u8>,
    /// Animation a projectile switches to on impact
    #[serde(default)]
    pub successor_id: Option<u8>,
    /// Debris amount scattered on hit
    #[serde(default)]
    pub scrap_amount: u8,
    /// Damage animation script forced onto the defender
    #[serde(default)]
    pub footer_string: String,
    pub animation: Arc<Animation>,
}

impl Move {
    pub fn id(&self) -> u8 {
        self.animation.id
    }

    /// Moves with an input string can be triggered from input
    pub fn is_input_move(&self) -> bool {
        !self.move_string.is_empty()
    }
}

/// Per-character constants and move table
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterData {
    pub id: u8,
    pub name: String,
    pub health: f32,
    pub endurance: f32,
    pub forward_speed: f32,
    pub reverse_speed: f32,
    /// Vertical take-off speed, negative is up
    pub jump_speed: f32,
    /// Gravity applied per tick while airborne
    pub fall_speed: f32,
    moves: Vec<Option<Move>>,
}

/// On-disk layout of [`CharacterData`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterFile {
    pub id: u8,
    pub name: String,
    pub health: f32,
    pub endurance: f32,
    pub forward_speed: f32,
    pub reverse_speed: f32,
    pub jump_speed: f32,
    pub fall_speed: f32,
    pub moves: Vec<Move>,
}

impl CharacterData {
    /// Validate and index a character description
    pub fn from_file(file: CharacterFile) -> Result<Self, DataError> {
        if !(0.0..=MAX_HEALTH).contains(&file.health) {
            return Err(DataError::stat("health", file.health));
        }
        if file.endurance < 0.0 {
            return Err(DataError::stat("endurance", file.endurance));
        }

        let mut moves: Vec<Option<Move>> = vec![None; MAX_MOVES];
        for mv in file.moves {
            let id = mv.id();
            let slot = moves
                .get_mut(id as usize)
                .ok_or(DataError::MoveIdOutOfRange(id))?;
            if slot.is_some() {
                return Err(DataError::DuplicateMove(id));
            }
            *slot = Some(mv);
        }

        Ok(Self {
            id: file.id,
            name: file.name,
            health: file.health,
            endurance: file.endurance,
            forward_speed: file.forward_speed,
            reverse_speed: file.reverse_speed,
            jump_speed: file.jump_speed,
            fall_speed: file.fall_speed,
            moves,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let file: CharacterFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let data = Self::from_json(&json)?;
        log::info!("Loaded character {} from {:?}", data.name, path);
        Ok(data)
    }

    pub fn to_file(&self) -> CharacterFile {
        CharacterFile {
            id: self.id,
            name: self.name.clone(),
            health: self.health,
            endurance: self.endurance,
            forward_speed: self.forward_speed,
            reverse_speed: self.reverse_speed,
            jump_speed: self.jump_speed,
            fall_speed: self.fall_speed,
            moves: self.moves().cloned().collect(),
        }
    }

    pub fn get_move(&self, id: u8) -> Option<&Move> {
        self.moves.get(id as usize).and_then(Option::as_ref)
    }

    /// Animation of a move slot
    pub fn animation(&self, id: u8) -> Option<Arc<Animation>> {
        self.get_move(id).map(|m| Arc::clone(&m.animation))
    }

    /// Defined moves in id order
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(moves: Vec<Move>) -> CharacterFile {
        CharacterFile {
            id: 1,
            name: "Test".into(),
            health: 500.0,
            endurance: 300.0,
            forward_speed: 3.0,
            reverse_speed: 2.0,
            jump_speed: -9.0,
            fall_speed: 0.5,
            moves,
        }
    }

    fn mv(id: u8, input: &str) -> Move {
        Move {
            move_string: input.into(),
            category: MoveCategory::Medium,
            damage: 10.0,
            next_move: None,
            successor_id: None,
            scrap_amount: 0,
            footer_string: String::new(),
            animation: Arc::new(Animation::new(id, "A5")),
        }
    }

    #[test]
    fn test_moves_indexed_by_animation_id() {
        let data = CharacterData::from_file(file_with(vec![mv(30, "K"), mv(20, "P")])).unwrap();
        assert_eq!(data.get_move(30).unwrap().move_string, "K");
        assert!(data.get_move(21).is_none());
        let ids: Vec<u8> = data.moves().map(Move::id).collect();
        assert_eq!(ids, vec![20, 30]);
    }

    #[test]
    fn test_rejects_bad_tables() {
        let err = CharacterData::from_file(file_with(vec![mv(20, "P"), mv(20, "K")]));
        assert!(matches!(err, Err(DataError::DuplicateMove(20))));

        let err = CharacterData::from_file(file_with(vec![mv(70, "P")]));
        assert!(matches!(err, Err(DataError::MoveIdOutOfRange(70))));

        let mut f = file_with(vec![]);
        f.health = 1200.0;
        assert!(matches!(
            CharacterData::from_file(f),
            Err(DataError::StatOutOfRange { name: "health", .. })
        ));
    }

    #[test]
    fn test_json_round_trip_through_file_layout() {
        let data = CharacterData::from_file(file_with(vec![mv(25, "K2")])).unwrap();
        let json = serde_json::to_string(&data.to_file()).unwrap();
        let back = CharacterData::from_json(&json).unwrap();
        assert_eq!(back, data);
    }
}
