//! HAR Arena - deterministic simulation core for a 2D robot fighting game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, animation scripts, physics, combat)
//! - `controller`: Input sources driving a HAR (queued human/network input, AI)
//! - `settings`: Match configuration loaded from JSON
//! - `sample`: Built-in sample character used by the headless runner and tests

pub mod controller;
pub mod error;
pub mod sample;
pub mod settings;
pub mod sim;

pub use error::DataError;
pub use settings::MatchSettings;

use glam::{IVec2, Vec2};

/// Game configuration constants
pub mod consts {
    /// Arena walls (HAR x position is clamped to this range)
    pub const ARENA_LEFT_WALL: f32 = 15.0;
    pub const ARENA_RIGHT_WALL: f32 = 305.0;
    /// Floor line, y grows downward
    pub const ARENA_FLOOR: f32 = 190.0;
    /// Ceiling of the containment box
    pub const ARENA_CEILING: f32 = -100.0;
    /// Full screen width, used for stereo panning
    pub const SCREEN_WIDTH: f32 = 320.0;

    /// Number of slots in a character move table
    pub const MAX_MOVES: usize = 70;
    /// Length of the HAR input ring buffer
    pub const INPUT_BUFFER_LEN: usize = 10;
    /// Depth of the per-entity serialization history
    pub const SERIAL_HISTORY: usize = 16;

    /// Ticks a stunned HAR stays down
    pub const STUN_DURATION: u32 = 100;
    /// Endurance regained per tick while idle
    pub const ENDURANCE_REGEN: f32 = 2.0;
    /// Endurance lost per point of damage
    pub const ENDURANCE_PER_DAMAGE: f32 = 20.0;
    /// Upper bound for any HAR health value
    pub const MAX_HEALTH: f32 = 1000.0;
    /// Horizontal push applied the tick after a hit
    pub const FLINCH_SPEED: f32 = 2.0;

    /// Distance below which HARs are pushed apart
    pub const HARD_CLOSE_LIMIT: f32 = 35.0;
    /// Distance below which close (throw) moves become available
    pub const SOFT_CLOSE_LIMIT: f32 = 45.0;

    /// Values closer than this to zero snap to zero
    pub const VELOCITY_SNAP: f32 = 0.1;
}

/// Convert an integer vector to float
#[inline]
pub fn to_vec2(v: IVec2) -> Vec2 {
    v.as_vec2()
}

/// Convert a float vector to integer, truncating toward zero
#[inline]
pub fn to_ivec2(v: Vec2) -> IVec2 {
    v.as_ivec2()
}

/// Snap a value to exactly zero when it is within the drift threshold
#[inline]
pub fn snap_zero(value: f32) -> f32 {
    if value.abs() < consts::VELOCITY_SNAP {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_zero() {
        assert_eq!(snap_zero(0.05), 0.0);
        assert_eq!(snap_zero(-0.09), 0.0);
        assert_eq!(snap_zero(0.5), 0.5);
        assert_eq!(snap_zero(-1.0), -1.0);
    }

    #[test]
    fn test_vector_conversion_truncates() {
        assert_eq!(to_ivec2(Vec2::new(3.9, -2.7)), IVec2::new(3, -2));
        assert_eq!(to_vec2(IVec2::new(4, -5)), Vec2::new(4.0, -5.0));
    }
}
