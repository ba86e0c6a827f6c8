//! Animation assets: sprites, hit coordinates and the frame script
//!
//! Animations are immutable once loaded and shared between entities through
//! `Arc`.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Well-known animation ids shared by every character
pub mod anim {
    pub const JUMPING: u8 = 1;
    pub const STANDUP: u8 = 2;
    pub const STUNNED: u8 = 3;
    pub const CROUCHING: u8 = 4;
    pub const STANDING_BLOCK: u8 = 5;
    pub const CROUCHING_BLOCK: u8 = 6;
    pub const BURNING_OIL: u8 = 7;
    pub const BLOCKING_SCRAPE: u8 = 8;
    pub const DAMAGE: u8 = 9;
    pub const WALKING: u8 = 10;
    pub const IDLE: u8 = 11;
    pub const SCRAP_METAL: u8 = 12;
    pub const BOLT: u8 = 13;
    pub const SCREW: u8 = 14;
    pub const VICTORY: u8 = 48;
    pub const DEFEAT: u8 = 49;

    /// Debris pieces a hit may scatter
    pub const DEBRIS: [u8; 3] = [SCRAP_METAL, BOLT, SCREW];

    /// Effects that are spawned as scrap rather than as projectiles
    pub fn is_debris(id: u8) -> bool {
        matches!(id, BURNING_OIL | BLOCKING_SCRAPE | SCRAP_METAL | BOLT | SCREW)
    }
}

/// One sprite image of an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    /// Frame letter index (A = 0)
    pub index: u8,
    /// Offset of the top-left corner from the owner's position
    pub pos: IVec2,
    pub size: IVec2,
    /// Optional stencil, row-major, non-zero = solid
    #[serde(default)]
    pub mask: Option<Vec<u8>>,
}

impl Sprite {
    pub fn new(index: u8, pos: IVec2, size: IVec2) -> Self {
        Self {
            index,
            pos,
            size,
            mask: None,
        }
    }

    /// Is the pixel at local coordinates part of the sprite body
    pub fn is_solid(&self, local: IVec2) -> bool {
        if local.x < 0 || local.y < 0 || local.x >= self.size.x || local.y >= self.size.y {
            return false;
        }
        match &self.mask {
            None => true,
            Some(mask) => {
                let idx = (local.y * self.size.x + local.x) as usize;
                mask.get(idx).is_some_and(|&px| px != 0)
            }
        }
    }
}

/// Attack point, relative to the owner's position, active on one sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCoord {
    pub frame_index: u8,
    pub pos: IVec2,
}

/// A scripted animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub id: u8,
    /// Where a spawned instance appears, relative to its parent
    #[serde(default)]
    pub start_pos: IVec2,
    /// Frame script, see [`super::script`]
    pub string: String,
    #[serde(default)]
    pub sprites: Vec<Sprite>,
    #[serde(default)]
    pub collision_coords: Vec<CollisionCoord>,
}

impl Animation {
    pub fn new(id: u8, string: impl Into<String>) -> Self {
        Self {
            id,
            start_pos: IVec2::ZERO,
            string: string.into(),
            sprites: Vec::new(),
            collision_coords: Vec::new(),
        }
    }

    pub fn sprite(&self, index: u8) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.index == index)
    }

    /// Attack points active while the given sprite is shown
    pub fn hit_coords(&self, sprite_index: u8) -> impl Iterator<Item = &CollisionCoord> {
        self.collision_coords
            .iter()
            .filter(move |c| c.frame_index == sprite_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_solid_without_mask() {
        let s = Sprite::new(0, IVec2::new(-10, -20), IVec2::new(20, 20));
        assert!(s.is_solid(IVec2::new(0, 0)));
        assert!(s.is_solid(IVec2::new(19, 19)));
        assert!(!s.is_solid(IVec2::new(20, 5)));
        assert!(!s.is_solid(IVec2::new(-1, 5)));
    }

    #[test]
    fn test_sprite_mask_lookup() {
        let mut s = Sprite::new(0, IVec2::ZERO, IVec2::new(2, 2));
        s.mask = Some(vec![0, 1, 1, 0]);
        assert!(!s.is_solid(IVec2::new(0, 0)));
        assert!(s.is_solid(IVec2::new(1, 0)));
        assert!(s.is_solid(IVec2::new(0, 1)));
        assert!(!s.is_solid(IVec2::new(1, 1)));
    }

    #[test]
    fn test_hit_coords_filter_by_sprite() {
        let mut a = Animation::new(20, "A2-B4");
        a.collision_coords = vec![
            CollisionCoord { frame_index: 1, pos: IVec2::new(40, -60) },
            CollisionCoord { frame_index: 1, pos: IVec2::new(42, -60) },
            CollisionCoord { frame_index: 0, pos: IVec2::new(10, -60) },
        ];
        assert_eq!(a.hit_coords(1).count(), 2);
        assert_eq!(a.hit_coords(0).count(), 1);
        assert_eq!(a.hit_coords(2).count(), 0);
    }
}
