//! Scene hazards
//!
//! Hazards are animations owned by the arena rather than a fighter. They
//! damage any HAR their attack points land on, may chain into follow-up
//! animations, and some float around the arena on an orbit.

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::animation::Animation;
use super::entity::{
    Entity, EntityId, GROUP_PROJECTILE, SpawnRequest, SpawnSource, Specialization, layer,
};
use super::har::{self, Har, HarState};
use super::hitpoint::sprite_hitpoint;
use super::state::{HarEvent, World};
use crate::consts::{ARENA_LEFT_WALL, ARENA_RIGHT_WALL};
use crate::error::DataError;
use crate::to_vec2;

/// Orbit step per tick, in radians
const ORBIT_STEP: f32 = std::f32::consts::PI / 32.0;
const ORBIT_SPEED: f32 = 2.0;
/// Minimum length of an orbit leg
const ORBIT_MIN_LEG: f32 = 80.0;
const ORBIT_HEIGHT: f32 = 200.0;
/// Debris scattered from a HAR hit by a hazard
const HAZARD_SCRAP: u8 = 9;

/// One hazard animation of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardInfo {
    pub animation: Arc<Animation>,
    /// Played when a HAR strikes the hazard
    #[serde(default)]
    pub chain_hit: Option<u8>,
    /// Played when the hazard strikes a HAR, or when it ends untouched
    #[serde(default)]
    pub chain_no_hit: Option<u8>,
    #[serde(default)]
    pub damage: f32,
    #[serde(default)]
    pub footer_string: String,
    #[serde(default)]
    pub repeat: bool,
    /// Floats around the arena
    #[serde(default)]
    pub orbit: bool,
    /// Placed when the match starts
    #[serde(default)]
    pub autostart: bool,
}

impl HazardInfo {
    pub fn id(&self) -> u8 {
        self.animation.id
    }
}

/// Hazard table of the current arena
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hazards: Vec<HazardInfo>,
}

impl SceneData {
    pub fn get(&self, id: u8) -> Option<&HazardInfo> {
        self.hazards.iter().find(|h| h.id() == id)
    }

    pub fn animation(&self, id: u8) -> Option<Arc<Animation>> {
        self.get(id).map(|h| Arc::clone(&h.animation))
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let scene = Self::from_json(&json)?;
        log::info!("Loaded scene {:?} with {} hazards", scene.name, scene.hazards.len());
        Ok(scene)
    }
}

/// Orbit motion state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub tick: f32,
    pub pos: Vec2,
    pub vary: Vec2,
    pub dest: Vec2,
    pub dest_dir: Vec2,
}

impl Orbit {
    fn new(pos: Vec2) -> Self {
        Self {
            tick: 0.0,
            pos,
            vary: Vec2::ZERO,
            dest: pos,
            dest_dir: Vec2::ZERO,
        }
    }

    fn arrived(&self) -> bool {
        let d = self.dest - self.pos;
        d.x.abs() <= 2.0 && d.y.abs() <= 2.0
    }

    /// Pick a new destination between the arena walls, far enough from the
    /// current position
    fn retarget(&mut self, from: Vec2, world: &mut World) {
        self.pos = from;
        self.vary = Vec2::ZERO;
        let mut dir = Vec2::ZERO;
        for _ in 0..10 {
            self.dest = Vec2::new(
                world.rng.random_range(ARENA_LEFT_WALL..ARENA_RIGHT_WALL),
                world.rng.random::<f32>() * ORBIT_HEIGHT,
            );
            dir = self.dest - self.pos;
            if dir.length() >= ORBIT_MIN_LEG {
                break;
            }
        }
        self.dest_dir = dir.normalize_or_zero();
    }
}

/// Hazard payload of an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub orbit: Option<Orbit>,
}

impl Hazard {
    pub fn tick(&mut self, ent: &mut Entity, world: &mut World) {
        if let Some(orbit) = &mut self.orbit {
            orbit.tick += ORBIT_STEP;
            if orbit.tick >= std::f32::consts::TAU {
                orbit.tick -= std::f32::consts::TAU;
            }
            if orbit.arrived() {
                orbit.retarget(ent.pos, world);
            }
        }
    }

    pub fn move_entity(&mut self, ent: &mut Entity, _world: &mut World) {
        match &mut self.orbit {
            Some(orbit) => {
                ent.pos = orbit.pos + orbit.vary;
                orbit.pos += orbit.dest_dir * ORBIT_SPEED;
                orbit.vary += Vec2::new(orbit.tick.sin() * 0.2, orbit.tick.cos() * 0.6);
            }
            None => {
                ent.pos += ent.vel;
                ent.vel.y += ent.gravity;
            }
        }
    }

    /// Resolve contact with a HAR: the hazard hits it, or it hits the hazard
    pub fn collide_har(
        &mut self,
        hz_ent: &mut Entity,
        har_ent: &mut Entity,
        har: &mut Har,
        world: &mut World,
    ) {
        if matches!(
            har.state,
            HarState::Fallen
                | HarState::StandingUp
                | HarState::Victory
                | HarState::Defeat
                | HarState::Scrap
                | HarState::Destruction
                | HarState::Done
        ) {
            return;
        }
        if hz_ent.player.frame_isset("n") {
            return;
        }
        let Some(info) = hz_ent.animation_id().and_then(|id| world.scene.get(id)).cloned() else {
            return;
        };

        if !har.damage_received {
            if let Some(hit) = sprite_hitpoint(hz_ent, har_ent, 2) {
                log::debug!("Hazard {} hits player {}", info.id(), har.player_id);
                har::take_damage(har_ent, har, &info.footer_string, info.damage);
                world.emit(har.player_id, HarEvent::HazardHit);
                world.emit(har.opponent_id(), HarEvent::EnemyHazardHit);
                if let Some(next) = info.chain_no_hit {
                    self.chain(hz_ent, next, world);
                }
                har::spawn_scrap(
                    world,
                    har_ent.id,
                    har.player_id,
                    to_vec2(hit),
                    HAZARD_SCRAP,
                    har_ent.direction,
                    false,
                );
                har.damage_received = true;
                return;
            }
        }

        if let Some(next) = info.chain_hit {
            if sprite_hitpoint(har_ent, hz_ent, 2).is_some() {
                log::debug!("Player {} strikes hazard {}", har.player_id, info.id());
                self.chain(hz_ent, next, world);
            }
        }
    }

    fn chain(&mut self, ent: &mut Entity, next: u8, world: &World) {
        match world.scene.animation(next) {
            Some(animation) => {
                ent.set_animation(animation);
                ent.player.repeat = false;
            }
            None => log::warn!("Hazard chains to unknown animation {next}"),
        }
    }

    /// Animation ended. Returns false when the hazard should be removed.
    pub fn on_finished(&mut self, ent: &mut Entity, world: &mut World) -> bool {
        let next = ent
            .animation_id()
            .and_then(|id| world.scene.get(id))
            .and_then(|info| info.chain_no_hit);
        match next.and_then(|id| world.scene.animation(id)) {
            Some(animation) => {
                ent.set_animation(animation);
                ent.player.repeat = false;
                true
            }
            None => false,
        }
    }
}

/// Build a hazard entity
pub fn spawn(id: EntityId, info: &HazardInfo, req: &SpawnRequest) -> Entity {
    let pos = req.pos + to_vec2(info.animation.start_pos);
    let mut ent = Entity::new(id, pos, req.vel);
    ent.direction = req.direction;
    ent.gravity = req.gravity;
    ent.layers = layer::HAZARD | layer::HAR;
    ent.group = Some(GROUP_PROJECTILE);
    ent.set_spawn_source(SpawnSource::Scene);
    ent.set_animation(Arc::clone(&info.animation));
    ent.player.repeat = info.repeat;
    let hazard = Hazard {
        orbit: info.orbit.then(|| Orbit::new(pos)),
    };
    ent.bind(Specialization::Hazard(hazard));
    ent
}
