//! Debris and burning oil thrown off a damaged HAR

use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::animation::{Animation, anim};
use super::entity::{Entity, EntityId, SpawnRequest, SpawnSource, Specialization, layer};
use super::physics::{Bounds, PhysicsHooks, PhysicsState, VerticalState};
use super::state::World;
use crate::snap_zero;

/// Ticks a piece lies on the floor before it is cleaned up
pub const SCRAP_KEEPALIVE: u32 = 220;
const BOUNCINESS: f32 = 0.4;
/// Horizontal spread added on every floor bounce
const FLOOR_JITTER: f32 = 3.0;

#[derive(Default)]
struct FloorContact(bool);

impl PhysicsHooks for FloorContact {
    fn floor_hit(&mut self, _vstate: VerticalState) {
        self.0 = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scrap {
    pub physics: PhysicsState,
    pub at_rest: bool,
    pub rest_ticks: u32,
}

impl Default for Scrap {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::ZERO, 1.0)
    }
}

impl Scrap {
    pub fn new(pos: Vec2, vel: Vec2, gravity: f32) -> Self {
        Self {
            physics: PhysicsState::init(pos, vel, Bounds::arena(), gravity, 0.0, BOUNCINESS),
            at_rest: false,
            rest_ticks: 0,
        }
    }

    pub fn tick(&mut self, ent: &mut Entity, _world: &mut World) {
        if !self.at_rest {
            return;
        }
        self.rest_ticks += 1;
        if self.rest_ticks > SCRAP_KEEPALIVE {
            ent.player.finish();
        }
    }

    pub fn move_entity(&mut self, ent: &mut Entity, world: &mut World) {
        if self.at_rest {
            return;
        }
        self.physics.pos = ent.pos;
        self.physics.spd = ent.vel;
        self.physics.gravity = ent.gravity;

        let mut floor = FloorContact::default();
        self.physics.tick(&mut floor);
        if floor.0 {
            let jitter = (world.rng.random::<f32>() - 0.5) * FLOOR_JITTER;
            self.physics.spd.x = snap_zero(self.physics.spd.x * BOUNCINESS + jitter);
        } else if !self.physics.is_airborne() {
            // sliding along the floor
            self.physics.spd.x = snap_zero(self.physics.spd.x * BOUNCINESS);
        }

        ent.pos = self.physics.pos;
        ent.vel = self.physics.spd;

        let g = ent.gravity * 1.1;
        if ent.pos.y >= self.physics.bounds.floor - 5.0 && ent.vel.x == 0.0 && ent.vel.y.abs() < g {
            self.at_rest = true;
            ent.vel = Vec2::ZERO;
            ent.halted = true;
            ent.player.disable_rewind = true;
        }
    }
}

/// Build a scrap entity playing `animation`
pub fn spawn(id: EntityId, req: &SpawnRequest, animation: Arc<Animation>) -> Entity {
    let mut ent = Entity::new(id, req.pos, req.vel);
    ent.direction = req.direction;
    ent.gravity = req.gravity;
    ent.layers = layer::SCRAP;
    ent.set_spawn_source(req.source);
    ent.set_animation(animation);
    ent.player.repeat = req.anim_id != anim::BURNING_OIL;
    ent.bind(Specialization::Scrap(Scrap::new(req.pos, req.vel, req.gravity)));
    ent
}

/// Purely visual effect such as a block spark; removed when its animation ends
pub fn spawn_effect(id: EntityId, pos: Vec2, source: SpawnSource, animation: Arc<Animation>) -> Entity {
    let mut ent = Entity::new(id, pos, Vec2::ZERO);
    ent.layers = 0;
    ent.set_spawn_source(source);
    ent.set_animation(animation);
    ent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::entity::Facing;

    fn piece(x: f32, vel: Vec2) -> Entity {
        let req = SpawnRequest {
            parent: EntityId(1),
            source: SpawnSource::Har { player: 0 },
            anim_id: anim::BOLT,
            pos: Vec2::new(x, ARENA_FLOOR - 40.0),
            vel,
            direction: Facing::Right,
            gravity: 1.0,
            flags: 0,
        };
        spawn(EntityId(5), &req, Arc::new(Animation::new(anim::BOLT, "A4-B4")))
    }

    #[test]
    fn test_scrap_comes_to_rest_inside_arena() {
        let mut w = World::new(11);
        let mut e = piece(100.0, Vec2::new(6.0, -8.0));
        for _ in 0..400 {
            e.tick(&mut w);
            e.move_entity(&mut w);
            assert!(e.pos.x >= ARENA_LEFT_WALL && e.pos.x <= ARENA_RIGHT_WALL);
            assert!(e.pos.y <= ARENA_FLOOR);
        }
        match &e.spec {
            Specialization::Scrap(s) => assert!(s.at_rest),
            _ => panic!("expected scrap"),
        }
        assert!(e.halted);
    }

    #[test]
    fn test_resting_scrap_expires() {
        let mut w = World::new(11);
        let mut e = piece(100.0, Vec2::ZERO);
        if let Specialization::Scrap(s) = &mut e.spec {
            s.at_rest = true;
        }
        for _ in 0..SCRAP_KEEPALIVE {
            e.tick(&mut w);
        }
        assert!(!e.finished());
        e.tick(&mut w);
        assert!(e.finished());
        assert!(!e.on_finished(&mut w));
    }

    #[test]
    fn test_scrap_never_collides() {
        let e = piece(100.0, Vec2::ZERO);
        assert_eq!(e.layers & (layer::HAR | layer::HAR1 | layer::HAR2), 0);
    }
}
