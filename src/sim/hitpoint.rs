//! Sprite-level hit detection
//!
//! An attacker's animation carries attack points for each sprite. A hit
//! lands when enough of those points fall on solid pixels of the target's
//! current sprite.

use glam::IVec2;

use super::entity::{Entity, Facing};
use crate::to_ivec2;

/// Top-left corner of an entity's current sprite in world space
fn sprite_origin(owner: IVec2, sprite_pos: IVec2, sprite_size: IVec2, facing: Facing) -> IVec2 {
    match facing {
        Facing::Right => owner + sprite_pos,
        Facing::Left => IVec2::new(owner.x - sprite_pos.x - sprite_size.x, owner.y + sprite_pos.y),
    }
}

/// Average position of the attacker's points that land on the target,
/// if at least `level` of them do.
pub fn sprite_hitpoint(attacker: &Entity, target: &Entity, level: usize) -> Option<IVec2> {
    let animation = attacker.animation()?;
    let sprite_index = attacker.sprite?;
    let target_sprite = target.current_sprite()?;

    let attacker_pos = to_ivec2(attacker.pos);
    let dir = if attacker.direction == Facing::Left { -1 } else { 1 };
    let origin = sprite_origin(
        to_ivec2(target.pos),
        target_sprite.pos,
        target_sprite.size,
        target.direction,
    );

    let mut hits = 0;
    let mut sum = IVec2::ZERO;
    for coord in animation.hit_coords(sprite_index) {
        let point = attacker_pos + IVec2::new(coord.pos.x * dir, coord.pos.y);
        let mut local = point - origin;
        if target.direction == Facing::Left {
            local.x = target_sprite.size.x - 1 - local.x;
        }
        if target_sprite.is_solid(local) {
            hits += 1;
            sum += point;
        }
    }

    if hits > 0 && hits >= level {
        Some(sum / hits as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec2;

    use super::*;
    use crate::sim::animation::{Animation, CollisionCoord, Sprite};
    use crate::sim::entity::EntityId;

    fn body(id: u32, x: f32, facing: Facing) -> Entity {
        let mut e = Entity::new(EntityId(id), Vec2::new(x, 190.0), Vec2::ZERO);
        let mut a = Animation::new(11, "A10");
        a.sprites.push(Sprite::new(0, IVec2::new(-30, -100), IVec2::new(60, 100)));
        e.set_animation(Arc::new(a));
        e.sprite = Some(0);
        e.direction = facing;
        e
    }

    fn puncher(x: f32, facing: Facing, reach: i32) -> Entity {
        let mut e = body(1, x, facing);
        let mut a = Animation::new(20, "A10");
        a.sprites.push(Sprite::new(0, IVec2::new(-30, -100), IVec2::new(60, 100)));
        a.collision_coords = vec![
            CollisionCoord { frame_index: 0, pos: IVec2::new(reach, -60) },
            CollisionCoord { frame_index: 0, pos: IVec2::new(reach + 2, -60) },
        ];
        e.set_animation(Arc::new(a));
        e.sprite = Some(0);
        e
    }

    #[test]
    fn test_hit_in_reach() {
        let att = puncher(100.0, Facing::Right, 45);
        let def = body(2, 140.0, Facing::Left);
        let hit = sprite_hitpoint(&att, &def, 1).unwrap();
        assert_eq!(hit, IVec2::new(146, 130));
    }

    #[test]
    fn test_out_of_reach_misses() {
        let att = puncher(100.0, Facing::Right, 45);
        let def = body(2, 200.0, Facing::Left);
        assert!(sprite_hitpoint(&att, &def, 1).is_none());
    }

    #[test]
    fn test_mirrored_attacker() {
        let att = puncher(200.0, Facing::Left, 45);
        let def = body(2, 160.0, Facing::Right);
        assert!(sprite_hitpoint(&att, &def, 1).is_some());
        let behind = body(3, 240.0, Facing::Left);
        assert!(sprite_hitpoint(&att, &behind, 1).is_none());
    }

    #[test]
    fn test_level_requires_point_count() {
        let att = puncher(100.0, Facing::Right, 45);
        let def = body(2, 140.0, Facing::Left);
        assert!(sprite_hitpoint(&att, &def, 2).is_some());
        assert!(sprite_hitpoint(&att, &def, 3).is_none());
    }
}
