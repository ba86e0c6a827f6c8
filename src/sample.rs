//! Built-in sample character and arena
//!
//! A small but complete move table: basic poses, punches and kicks, a throw,
//! a fireball and the scrap/destruction finishers. The punch can be cut into
//! a high kick on its last frame, and the scrap move into the destruction. Used by the headless
//! runner when no character file is given, and by the tests.

use std::sync::Arc;

use glam::IVec2;

use crate::error::DataError;
use crate::sim::animation::{Animation, CollisionCoord, Sprite, anim};
use crate::sim::har::PilotStats;
use crate::sim::hazard::{HazardInfo, SceneData};
use crate::sim::moves::{CharacterData, CharacterFile, Move, MoveCategory};
use crate::sim::state::Fighter;

pub const MOVE_FIREBALL_THROW: u8 = 16;
pub const MOVE_THROW: u8 = 18;
pub const MOVE_LOW_KICK: u8 = 19;
pub const MOVE_PUNCH: u8 = 20;
pub const MOVE_HIGH_KICK: u8 = 22;
pub const MOVE_JUMP_KICK: u8 = 24;
pub const MOVE_SCRAP: u8 = 40;
pub const MOVE_DESTRUCTION: u8 = 41;
pub const MOVE_FIREBALL: u8 = 45;
pub const MOVE_FIREBALL_IMPACT: u8 = 46;

pub const HAZARD_SPIKE: u8 = 10;
pub const HAZARD_SPIKE_RETRACT: u8 = 11;
pub const HAZARD_DRONE: u8 = 12;
pub const HAZARD_DRONE_SPARK: u8 = 13;

/// Sprites for the HAR body, one per frame letter
fn body_sprites(frames: u8) -> Vec<Sprite> {
    (0..frames)
        .map(|i| Sprite::new(i, IVec2::new(-30, -100), IVec2::new(60, 100)))
        .collect()
}

fn small_sprites(frames: u8, size: i32) -> Vec<Sprite> {
    (0..frames)
        .map(|i| Sprite::new(i, IVec2::splat(-size / 2), IVec2::splat(size)))
        .collect()
}

fn coords(frame_index: u8, points: &[(i32, i32)]) -> Vec<CollisionCoord> {
    points
        .iter()
        .map(|&(x, y)| CollisionCoord {
            frame_index,
            pos: IVec2::new(x, y),
        })
        .collect()
}

fn animation(id: u8, script: &str, sprites: Vec<Sprite>, hits: Vec<CollisionCoord>) -> Arc<Animation> {
    let mut a = Animation::new(id, script);
    a.sprites = sprites;
    a.collision_coords = hits;
    Arc::new(a)
}

/// A move slot that cannot be triggered from input
fn pose(id: u8, script: &str, sprites: Vec<Sprite>) -> Move {
    Move {
        move_string: String::new(),
        category: MoveCategory::Basic,
        damage: 0.0,
        next_move: None,
        successor_id: None,
        scrap_amount: 0,
        footer_string: String::new(),
        animation: animation(id, script, sprites, Vec::new()),
    }
}

fn attack(
    id: u8,
    input: &str,
    category: MoveCategory,
    damage: f32,
    script: &str,
    hits: Vec<CollisionCoord>,
) -> Move {
    Move {
        move_string: input.into(),
        category,
        damage,
        next_move: None,
        successor_id: None,
        scrap_amount: 12,
        footer_string: String::new(),
        animation: animation(id, script, body_sprites(3), hits),
    }
}

/// Raw description of the sample character
pub fn character_file() -> CharacterFile {
    let mut moves = vec![
        pose(anim::JUMPING, "A10-B100-C10", body_sprites(3)),
        pose(anim::STANDUP, "A6-B6", body_sprites(2)),
        pose(anim::STUNNED, "A8-B8", body_sprites(2)),
        pose(anim::CROUCHING, "A5", body_sprites(1)),
        pose(anim::STANDING_BLOCK, "A5", body_sprites(1)),
        pose(anim::CROUCHING_BLOCK, "A5", body_sprites(1)),
        pose(anim::BURNING_OIL, "A8-B8-C8-D8", small_sprites(4, 8)),
        pose(anim::BLOCKING_SCRAPE, "A6", small_sprites(1, 12)),
        pose(anim::DAMAGE, "A4-B4", body_sprites(2)),
        pose(anim::WALKING, "A5-B5-C5-D5", body_sprites(4)),
        pose(anim::IDLE, "A8-B8-C8", body_sprites(3)),
        pose(anim::SCRAP_METAL, "A6-B6", small_sprites(2, 10)),
        pose(anim::BOLT, "A6-B6", small_sprites(2, 6)),
        pose(anim::SCREW, "A6-B6", small_sprites(2, 6)),
        pose(anim::VICTORY, "A20-B20", body_sprites(2)),
        pose(anim::DEFEAT, "A30", body_sprites(1)),
    ];

    moves.push(Move {
        scrap_amount: 0,
        ..attack(
            MOVE_FIREBALL_THROW,
            "P632",
            MoveCategory::Projectile,
            0.0,
            "A4-s7m45mx40my-60vx5B8-C6",
            Vec::new(),
        )
    });
    moves.push(Move {
        footer_string: "kA4-B8".into(),
        scrap_amount: 8,
        ..attack(MOVE_THROW, "P6", MoveCategory::Close, 14.0, "A5-B5-C5", Vec::new())
    });
    moves.push(attack(
        MOVE_LOW_KICK,
        "K2",
        MoveCategory::Low,
        6.0,
        "A4-B3-C4",
        coords(1, &[(42, -10), (44, -10)]),
    ));
    moves.push(attack(
        MOVE_PUNCH,
        "P",
        MoveCategory::Medium,
        8.0,
        "A4-B2-jhC4",
        coords(1, &[(38, -60), (40, -60)]),
    ));
    moves.push(Move {
        scrap_amount: 14,
        ..attack(
            MOVE_HIGH_KICK,
            "K",
            MoveCategory::High,
            10.0,
            "s12A5-B3-C5",
            coords(1, &[(40, -85), (42, -85)]),
        )
    });
    moves.push(attack(
        MOVE_JUMP_KICK,
        "K",
        MoveCategory::Jumping,
        8.0,
        "A4-B10-C4",
        coords(1, &[(30, -40), (32, -40)]),
    ));
    moves.push(Move {
        footer_string: "A10-B10-C10".into(),
        scrap_amount: 0,
        ..attack(
            MOVE_SCRAP,
            "K2",
            MoveCategory::Scrap,
            0.0,
            "A8-m12my-60jf2B8-C8",
            Vec::new(),
        )
    });
    moves.push(Move {
        footer_string: "A15-B15".into(),
        scrap_amount: 0,
        ..attack(
            MOVE_DESTRUCTION,
            "P8",
            MoveCategory::Destruction,
            0.0,
            "A10-m12my-60B10",
            Vec::new(),
        )
    });
    moves.push(Move {
        move_string: String::new(),
        category: MoveCategory::Projectile,
        damage: 6.0,
        next_move: None,
        successor_id: Some(MOVE_FIREBALL_IMPACT),
        scrap_amount: 9,
        footer_string: String::new(),
        animation: animation(
            MOVE_FIREBALL,
            "A5-B5-C5-D5-E5-F5-G5-H5-I5-J5-K5-L5",
            small_sprites(12, 16),
            (0..12).flat_map(|f| coords(f, &[(0, 0), (6, 0)])).collect(),
        ),
    });
    moves.push(pose(MOVE_FIREBALL_IMPACT, "A3-B3", small_sprites(2, 20)));

    CharacterFile {
        id: 1,
        name: "Sample".into(),
        health: 400.0,
        endurance: 200.0,
        forward_speed: 3.0,
        reverse_speed: 2.0,
        jump_speed: -9.0,
        fall_speed: 0.7,
        moves,
    }
}

pub fn character() -> Result<CharacterData, DataError> {
    CharacterData::from_file(character_file())
}

/// The sample character with an average pilot
pub fn fighter() -> Result<Fighter, DataError> {
    Ok(Fighter {
        character: Arc::new(character()?),
        pilot: PilotStats::default(),
    })
}

/// Arena with a floor spike and a floating drone
pub fn scene() -> SceneData {
    let spike = Animation {
        collision_coords: coords(0, &[(0, -20), (2, -20), (4, -20)]),
        sprites: vec![
            Sprite::new(0, IVec2::new(-4, -24), IVec2::new(10, 24)),
            Sprite::new(1, IVec2::new(-4, -12), IVec2::new(10, 12)),
        ],
        ..Animation::new(HAZARD_SPIKE, "A10-B10")
    };
    let retract = Animation {
        sprites: vec![Sprite::new(0, IVec2::new(-4, -6), IVec2::new(10, 6))],
        ..Animation::new(HAZARD_SPIKE_RETRACT, "A8")
    };
    let drone = Animation {
        start_pos: IVec2::new(160, 60),
        collision_coords: [0, 1]
            .iter()
            .flat_map(|&f| coords(f, &[(-3, 0), (0, 0), (3, 0)]))
            .collect(),
        sprites: small_sprites(2, 14),
        ..Animation::new(HAZARD_DRONE, "A10-B10")
    };
    let spark = Animation {
        sprites: small_sprites(1, 18),
        ..Animation::new(HAZARD_DRONE_SPARK, "A6")
    };

    SceneData {
        name: "Sample arena".into(),
        hazards: vec![
            HazardInfo {
                animation: Arc::new(spike),
                chain_hit: None,
                chain_no_hit: Some(HAZARD_SPIKE_RETRACT),
                damage: 20.0,
                footer_string: String::new(),
                repeat: false,
                orbit: false,
                autostart: false,
            },
            HazardInfo {
                animation: Arc::new(retract),
                chain_hit: None,
                chain_no_hit: None,
                damage: 0.0,
                footer_string: String::new(),
                repeat: false,
                orbit: false,
                autostart: false,
            },
            HazardInfo {
                animation: Arc::new(drone),
                chain_hit: Some(HAZARD_DRONE_SPARK),
                chain_no_hit: None,
                damage: 12.0,
                footer_string: "A4-B4".into(),
                repeat: true,
                orbit: true,
                autostart: true,
            },
            HazardInfo {
                animation: Arc::new(spark),
                chain_hit: None,
                chain_no_hit: None,
                damage: 0.0,
                footer_string: String::new(),
                repeat: false,
                orbit: false,
                autostart: false,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_MOVES;
    use crate::sim::script::Script;

    #[test]
    fn test_sample_character_loads() {
        let c = character().unwrap();
        for id in [
            anim::JUMPING,
            anim::IDLE,
            anim::DAMAGE,
            anim::VICTORY,
            anim::DEFEAT,
            MOVE_PUNCH,
            MOVE_FIREBALL,
            MOVE_FIREBALL_IMPACT,
        ] {
            assert!(c.get_move(id).is_some(), "missing move {id}");
        }
        assert!(c.moves().all(|m| (m.id() as usize) < MAX_MOVES));
        assert!(c.get_move(66).is_none());
    }

    #[test]
    fn test_fireball_successor_is_in_table() {
        let c = character().unwrap();
        let fb = c.get_move(MOVE_FIREBALL).unwrap();
        let next = fb.successor_id.and_then(|id| c.get_move(id)).unwrap();
        assert!(next.successor_id.is_none());
    }

    #[test]
    fn test_character_json_round_trip_keeps_table() {
        let c = character().unwrap();
        let json = serde_json::to_string(&c.to_file()).unwrap();
        let back = CharacterData::from_json(&json).unwrap();
        assert_eq!(back.moves().count(), c.moves().count());
        assert_eq!(back.get_move(MOVE_THROW), c.get_move(MOVE_THROW));
    }

    #[test]
    fn test_fighter_carries_combo_frames() {
        let f = fighter().unwrap();
        let tagged = |id: u8, tag: &str| {
            let mv = f.character.get_move(id).unwrap();
            Script::parse(&mv.animation.string).frames().iter().any(|fr| fr.is_set(tag))
        };
        assert!(tagged(MOVE_PUNCH, "jh"));
        assert!(tagged(MOVE_SCRAP, "jf2"));
        assert!(!tagged(MOVE_SCRAP, "jf"));
        assert_eq!(f.pilot, PilotStats::default());
    }

    #[test]
    fn test_scene_chains_resolve() {
        let s = scene();
        for h in &s.hazards {
            for next in [h.chain_hit, h.chain_no_hit].into_iter().flatten() {
                assert!(s.get(next).is_some(), "hazard {} chains to {next}", h.id());
            }
        }
    }
}
