//! Projectiles fired by a HAR move
//!
//! A projectile plays one of its owner's move animations and is resolved
//! against the opponent through that move's damage and category. Hitting a
//! wall ends it unless it bounces or belongs to a finisher.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{
    Entity, EntityId, GROUP_PROJECTILE, SpawnRequest, SpawnSource, Specialization, layer,
};
use super::moves::{CharacterData, Move};
use super::physics::{Bounds, PhysicsHooks, PhysicsState, VerticalState, WallSide};
use super::state::World;

/// `mp` flag: bounce off walls instead of expiring
pub const FLAG_WALL_BOUNCE: i32 = 0x01;
/// `mp` flag: stop animating once resting on the floor
pub const FLAG_GROUND_FREEZE: i32 = 0x02;

const BOUNCINESS: f32 = 0.7;

#[derive(Debug, Default)]
struct Contacts {
    wall: bool,
    floor: bool,
}

impl PhysicsHooks for Contacts {
    fn wall_hit(&mut self, side: WallSide, _vstate: VerticalState) {
        if side != WallSide::Ceiling {
            self.wall = true;
        }
    }

    fn floor_hit(&mut self, _vstate: VerticalState) {
        self.floor = true;
    }
}

/// Projectile payload of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Player slot of the HAR that fired it
    pub owner: u8,
    pub physics: PhysicsState,
    pub wall_bounce: bool,
    pub ground_freeze: bool,
    /// Survives wall contact
    pub invincible: bool,
    pub did_hit: bool,
    pub successor_used: bool,
}

impl Projectile {
    pub fn new(owner: u8, req: &SpawnRequest, invincible: bool) -> Self {
        let wall_bounce = req.flags & FLAG_WALL_BOUNCE != 0;
        Self {
            owner,
            physics: PhysicsState::init(
                req.pos,
                req.vel,
                Bounds::arena(),
                req.gravity,
                0.0,
                if wall_bounce { BOUNCINESS } else { 0.0 },
            ),
            wall_bounce,
            ground_freeze: req.flags & FLAG_GROUND_FREEZE != 0,
            invincible,
            did_hit: false,
            successor_used: false,
        }
    }

    pub fn move_entity(&mut self, ent: &mut Entity, _world: &mut World) {
        self.physics.pos = ent.pos;
        self.physics.spd = ent.vel;
        self.physics.gravity = ent.gravity;

        let mut contacts = Contacts::default();
        self.physics.tick(&mut contacts);
        if contacts.floor {
            self.physics.spd.x *= BOUNCINESS;
        }

        ent.pos = self.physics.pos;
        ent.vel = self.physics.spd;

        if contacts.wall && !self.wall_bounce && !self.invincible {
            log::trace!("Projectile {:?} expired on a wall", ent.id);
            ent.player.finish();
        }
        if self.ground_freeze && self.is_at_rest(ent) {
            ent.player.disable_rewind = true;
        }
    }

    fn is_at_rest(&self, ent: &Entity) -> bool {
        let g = ent.gravity.abs() * 1.1;
        ent.pos.y >= self.physics.bounds.floor - 5.0 && ent.vel.x == 0.0 && ent.vel.y.abs() < g.max(0.1)
    }

    /// Hit or blocked: switch to the impact animation, or end
    pub fn impact(&mut self, ent: &mut Entity, character: &CharacterData, mv: &Move) {
        if !self.play_successor(ent, character, mv) {
            ent.player.finish();
        }
    }

    fn play_successor(&mut self, ent: &mut Entity, character: &CharacterData, mv: &Move) -> bool {
        if self.successor_used {
            return false;
        }
        let Some(next) = mv.successor_id.and_then(|id| character.get_move(id)) else {
            return false;
        };
        ent.set_animation(Arc::clone(&next.animation));
        ent.player.repeat = false;
        ent.vel = Vec2::ZERO;
        ent.gravity = 0.0;
        self.successor_used = true;
        true
    }

    /// Animation ended. Returns false when the projectile should be removed.
    pub fn on_finished(&mut self, ent: &mut Entity, world: &mut World) -> bool {
        let Some(fighter) = world.fighter(self.owner) else {
            return false;
        };
        let character = Arc::clone(&fighter.character);
        let Some(mv) = ent.animation_id().and_then(|id| character.get_move(id)) else {
            return false;
        };
        self.play_successor(ent, &character, mv)
    }
}

/// Build a projectile entity from a move animation of `owner`
pub fn spawn(id: EntityId, owner: u8, mv: &Move, req: &SpawnRequest, invincible: bool) -> Entity {
    let mut ent = Entity::new(id, req.pos, req.vel);
    ent.direction = req.direction;
    ent.gravity = req.gravity;
    ent.layers = layer::PROJECTILE | layer::har_of(1 - owner.min(1));
    ent.group = Some(GROUP_PROJECTILE);
    ent.set_spawn_source(SpawnSource::Har { player: owner });
    ent.set_animation(Arc::clone(&mv.animation));
    ent.player.repeat = false;
    ent.bind(Specialization::Projectile(Projectile::new(owner, req, invincible)));
    ent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sample;
    use crate::sim::entity::Facing;

    fn request(x: f32, vx: f32, flags: i32) -> SpawnRequest {
        SpawnRequest {
            parent: EntityId(1),
            source: SpawnSource::Har { player: 0 },
            anim_id: sample::MOVE_FIREBALL,
            pos: Vec2::new(x, 150.0),
            vel: Vec2::new(vx, 0.0),
            direction: Facing::Right,
            gravity: 0.0,
            flags,
        }
    }

    fn fireball(req: &SpawnRequest) -> Entity {
        let fighter = sample::fighter().unwrap();
        let mv = fighter.character.get_move(sample::MOVE_FIREBALL).unwrap();
        spawn(EntityId(9), 0, mv, req, false)
    }

    fn world() -> World {
        let mut w = World::new(3);
        w.set_fighter(0, sample::fighter().unwrap());
        w.set_fighter(1, sample::fighter().unwrap());
        w
    }

    #[test]
    fn test_targets_only_the_opponent() {
        let e = fireball(&request(100.0, 4.0, 0));
        assert_eq!(e.layers & layer::HAR2, layer::HAR2);
        assert_eq!(e.layers & layer::HAR1, 0);
        assert_eq!(e.group, Some(GROUP_PROJECTILE));
    }

    #[test]
    fn test_expires_on_wall() {
        let mut w = world();
        let mut e = fireball(&request(ARENA_RIGHT_WALL - 2.0, 5.0, 0));
        e.move_entity(&mut w);
        assert_eq!(e.pos.x, ARENA_RIGHT_WALL);
        assert!(e.finished());
    }

    #[test]
    fn test_wall_bounce_flag_reflects() {
        let mut w = world();
        let mut e = fireball(&request(ARENA_LEFT_WALL + 1.0, -5.0, FLAG_WALL_BOUNCE));
        e.move_entity(&mut w);
        assert!(!e.finished());
        assert!(e.vel.x > 0.0);
        assert!(e.pos.x >= ARENA_LEFT_WALL);
    }

    #[test]
    fn test_successor_on_finish_then_removal() {
        let mut w = world();
        let mut e = fireball(&request(100.0, 4.0, 0));
        assert!(e.on_finished(&mut w));
        assert_eq!(e.animation_id(), Some(sample::MOVE_FIREBALL_IMPACT));
        assert_eq!(e.vel, Vec2::ZERO);
        assert!(!e.on_finished(&mut w));
    }
}
