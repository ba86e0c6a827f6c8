//! Hard-shape collision resolution
//!
//! Dispatches on the ordered pair of hard shapes carried by two entities.
//! Only a rectangle inside a static inverse rectangle (the arena box) has a
//! response; every other pairing is reserved and does nothing.

use super::entity::{Entity, MotionState};
use super::shape::Shape;

/// Resolve the hard shapes of two entities against each other
pub fn collision_handle(a: &mut Entity, b: &mut Entity) {
    let (Some(sa), Some(sb)) = (a.hard_shape, b.hard_shape) else {
        return;
    };
    match (sa, sb) {
        (Shape::Rect { .. }, Shape::InvRect { .. }) => rect_invrect(a, b),
        (Shape::InvRect { .. }, Shape::Rect { .. }) => rect_invrect(b, a),
        _ => {}
    }
}

/// Keep `a` inside the static box `b`.
///
/// A horizontal clamp resets the vertical motion flag and a vertical clamp
/// resets the horizontal one.
fn rect_invrect(a: &mut Entity, b: &Entity) {
    if !b.is_static {
        return;
    }
    let (Some(sa), Some(sb)) = (a.hard_shape, b.hard_shape) else {
        return;
    };
    let a_size = sa.size().as_vec2();
    let b_size = sb.size().as_vec2();

    if a.pos.x + a_size.x >= b.pos.x + b_size.x {
        a.pos.x = b.pos.x + b_size.x - a_size.x;
        a.vel.x = 0.0;
        a.vstate = MotionState::Stable;
    } else if a.pos.x < b.pos.x {
        a.pos.x = b.pos.x;
        a.vel.x = 0.0;
        a.vstate = MotionState::Stable;
    }

    if a.pos.y + a_size.y >= b.pos.y + b_size.y {
        a.pos.y = b.pos.y + b_size.y - a_size.y;
        a.vel.y = 0.0;
        a.hstate = MotionState::Stable;
    } else if a.pos.y <= b.pos.y {
        a.pos.y = b.pos.y;
        a.vel.y = 0.0;
        a.hstate = MotionState::Stable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EntityId;
    use approx::assert_relative_eq;
    use glam::Vec2;

    fn arena_box() -> Entity {
        let mut b = Entity::new(EntityId(0), Vec2::new(15.0, -100.0), Vec2::ZERO);
        b.hard_shape = Some(Shape::inv_rect(290, 291));
        b.is_static = true;
        b
    }

    fn body(pos: Vec2, vel: Vec2) -> Entity {
        let mut e = Entity::new(EntityId(1), pos, vel);
        e.hard_shape = Some(Shape::rect(0, 0));
        e.hstate = MotionState::Moving;
        e.vstate = MotionState::Moving;
        e
    }

    #[test]
    fn test_clamps_right_wall_and_resets_vertical_flag() {
        let mut b = arena_box();
        let mut a = body(Vec2::new(320.0, 150.0), Vec2::new(4.0, 2.0));
        collision_handle(&mut a, &mut b);
        assert_relative_eq!(a.pos.x, 305.0);
        assert_eq!(a.vel.x, 0.0);
        assert_eq!(a.vel.y, 2.0);
        assert_eq!(a.vstate, MotionState::Stable);
        assert_eq!(a.hstate, MotionState::Moving);
    }

    #[test]
    fn test_clamps_ceiling_and_resets_horizontal_flag() {
        let mut b = arena_box();
        let mut a = body(Vec2::new(100.0, -130.0), Vec2::new(1.0, -3.0));
        collision_handle(&mut a, &mut b);
        assert_relative_eq!(a.pos.y, -100.0);
        assert_eq!(a.vel.y, 0.0);
        assert_eq!(a.vel.x, 1.0);
        assert_eq!(a.hstate, MotionState::Stable);
        assert_eq!(a.vstate, MotionState::Moving);
    }

    #[test]
    fn test_swapped_order_resolves_the_rect() {
        let mut b = arena_box();
        let mut a = body(Vec2::new(0.0, 100.0), Vec2::new(-2.0, 0.0));
        collision_handle(&mut b, &mut a);
        assert_relative_eq!(a.pos.x, 15.0);
        assert_eq!(b.pos, Vec2::new(15.0, -100.0));
    }

    #[test]
    fn test_non_static_box_and_other_pairs_are_inert() {
        let mut b = arena_box();
        b.is_static = false;
        let mut a = body(Vec2::new(400.0, 100.0), Vec2::new(3.0, 0.0));
        collision_handle(&mut a, &mut b);
        assert_eq!(a.pos.x, 400.0);

        let mut c = body(Vec2::new(400.0, 100.0), Vec2::ZERO);
        let mut d = body(Vec2::new(400.0, 100.0), Vec2::ZERO);
        d.hard_shape = Some(Shape::Point);
        collision_handle(&mut c, &mut d);
        collision_handle(&mut d, &mut c);
        assert_eq!(c.pos.x, 400.0);
    }

    #[test]
    fn test_inside_is_untouched() {
        let mut b = arena_box();
        let mut a = body(Vec2::new(100.0, 190.0), Vec2::new(1.0, 0.0));
        collision_handle(&mut a, &mut b);
        assert_eq!(a.pos, Vec2::new(100.0, 190.0));
        assert_eq!(a.vel, Vec2::new(1.0, 0.0));
    }
}
