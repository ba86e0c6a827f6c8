//! Generic simulated object
//!
//! An [`Entity`] carries transform, animation playback and a typed
//! [`Specialization`] payload. Behavior hooks (tick, act, move, collide,
//! finish, serialize) dispatch on the payload with a single `match`.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animation::{Animation, Sprite};
use super::har::{self, Har, HarSnapshot};
use super::hazard::Hazard;
use super::player::{FrameEffects, Player};
use super::projectile::Projectile;
use super::scrap::Scrap;
use super::script::Script;
use super::shape::Shape;
use super::state::{GameEvent, World};
use crate::consts::SERIAL_HISTORY;

/// Stable entity identifier (iteration order follows it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// -1 for left, 1 for right
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Direction from `from` toward `to` along x
    pub fn toward(from: f32, to: f32) -> Self {
        if to < from { Facing::Left } else { Facing::Right }
    }
}

/// Collision layer bits. Two entities interact when their layers overlap.
pub mod layer {
    pub const DEFAULT: u8 = 0x01;
    pub const HAR: u8 = 0x02;
    pub const HAR1: u8 = 0x04;
    pub const HAR2: u8 = 0x08;
    pub const SCRAP: u8 = 0x10;
    pub const PROJECTILE: u8 = 0x20;
    pub const HAZARD: u8 = 0x40;

    /// Layer bit of a player's HAR
    pub fn har_of(player: u8) -> u8 {
        if player == 0 { HAR1 } else { HAR2 }
    }
}

/// Entities in the same group never collide with each other
pub const GROUP_PROJECTILE: u8 = 2;

/// Coarse motion flag reset by boundary containment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Stable,
    Moving,
}

/// Where spawn/destroy requests raised by an entity's script are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnSource {
    /// Character move table of a player's HAR
    Har { player: u8 },
    /// Scene hazard table
    Scene,
}

/// New entity requested by an animation frame or combat logic
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub parent: EntityId,
    pub source: SpawnSource,
    pub anim_id: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub direction: Facing,
    pub gravity: f32,
    pub flags: i32,
}

/// Removal of every entity playing `anim_id` from `source`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyRequest {
    pub source: SpawnSource,
    pub anim_id: u8,
}

/// Animation bound to an entity
#[derive(Debug, Clone)]
pub enum AnimationHandle {
    /// Borrowed from a character or scene asset
    Shared(Arc<Animation>),
    /// Owned by this entity and dropped with it
    Owned(Box<Animation>),
}

impl AnimationHandle {
    pub fn get(&self) -> &Animation {
        match self {
            AnimationHandle::Shared(a) => a,
            AnimationHandle::Owned(a) => a,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, AnimationHandle::Owned(_))
    }
}

pub const SPEC_NONE: u8 = 0;
pub const SPEC_HAR: u8 = 1;
pub const SPEC_PROJECTILE: u8 = 2;
pub const SPEC_SCRAP: u8 = 3;
pub const SPEC_HAZARD: u8 = 4;

/// Typed behavior payload
#[derive(Debug, Clone, Default)]
pub enum Specialization {
    #[default]
    None,
    Har(Box<Har>),
    Projectile(Projectile),
    Scrap(Scrap),
    Hazard(Hazard),
}

impl Specialization {
    pub fn kind_id(&self) -> u8 {
        match self {
            Specialization::None => SPEC_NONE,
            Specialization::Har(_) => SPEC_HAR,
            Specialization::Projectile(_) => SPEC_PROJECTILE,
            Specialization::Scrap(_) => SPEC_SCRAP,
            Specialization::Hazard(_) => SPEC_HAZARD,
        }
    }

    fn to_blob(&self) -> Vec<u8> {
        let encoded = match self {
            Specialization::None => return Vec::new(),
            Specialization::Har(h) => serde_json::to_vec(&h.snapshot()),
            Specialization::Projectile(p) => serde_json::to_vec(p),
            Specialization::Scrap(s) => serde_json::to_vec(s),
            Specialization::Hazard(h) => serde_json::to_vec(h),
        };
        encoded.unwrap_or_else(|err| {
            log::warn!("Failed to encode specialization state: {err}");
            Vec::new()
        })
    }

    fn from_blob(kind: u8, blob: &[u8], world: &World) -> Self {
        let decoded: Result<Self, String> = match kind {
            SPEC_NONE => Ok(Specialization::None),
            SPEC_HAR => serde_json::from_slice::<HarSnapshot>(blob)
                .map_err(|e| e.to_string())
                .and_then(|snap| {
                    Har::restore(snap, world)
                        .map(|h| Specialization::Har(Box::new(h)))
                        .ok_or_else(|| "no fighter in that player slot".to_string())
                }),
            SPEC_PROJECTILE => serde_json::from_slice(blob)
                .map(Specialization::Projectile)
                .map_err(|e| e.to_string()),
            SPEC_SCRAP => serde_json::from_slice(blob)
                .map(Specialization::Scrap)
                .map_err(|e| e.to_string()),
            SPEC_HAZARD => serde_json::from_slice(blob)
                .map(Specialization::Hazard)
                .map_err(|e| e.to_string()),
            other => Err(format!("unknown specialization id {other}")),
        };
        decoded.unwrap_or_else(|err| {
            log::warn!("Restoring entity without specialization: {err}");
            Specialization::None
        })
    }
}

/// Serialized entity state for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub age: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub direction: Facing,
    pub layers: u8,
    pub group: Option<u8>,
    pub stride: u32,
    pub spawn_source: Option<SpawnSource>,
    pub animation_id: Option<u8>,
    pub custom_string: Option<String>,
    pub anim_tick: i32,
    pub repeat: bool,
    pub reverse: bool,
    pub spec_id: u8,
    pub blob: Vec<u8>,
}

/// Fixed-capacity history of snapshots with a monotonic write cursor
#[derive(Debug, Clone)]
pub struct SerialHistory {
    slots: Vec<Option<EntitySnapshot>>,
    cursor: u64,
}

impl Default for SerialHistory {
    fn default() -> Self {
        Self {
            slots: vec![None; SERIAL_HISTORY],
            cursor: 0,
        }
    }
}

impl SerialHistory {
    pub fn push(&mut self, snapshot: EntitySnapshot) {
        let slot = (self.cursor % SERIAL_HISTORY as u64) as usize;
        self.slots[slot] = Some(snapshot);
        self.cursor += 1;
    }

    /// Snapshot written `ticks_ago` pushes before the latest one
    pub fn get(&self, ticks_ago: usize) -> Option<&EntitySnapshot> {
        if ticks_ago >= SERIAL_HISTORY || ticks_ago as u64 >= self.cursor {
            return None;
        }
        let slot = ((self.cursor - 1 - ticks_ago as u64) % SERIAL_HISTORY as u64) as usize;
        self.slots[slot].as_ref()
    }

    pub fn len(&self) -> usize {
        self.cursor.min(SERIAL_HISTORY as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }
}

/// A simulated object
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Position when the current animation was bound
    pub start: Vec2,
    pub direction: Facing,
    pub gravity: f32,
    pub layers: u8,
    pub group: Option<u8>,
    pub hstate: MotionState,
    pub vstate: MotionState,
    /// Shape used for boundary containment
    pub hard_shape: Option<Shape>,
    pub is_static: bool,
    /// Animation frozen
    pub halted: bool,
    /// Animation ticks advanced per simulation tick
    pub stride: u32,
    pub age: u32,
    /// Sprite letter of the current frame
    pub sprite: Option<u8>,
    /// Scheduled for removal at the end of the tick
    pub removed: bool,
    pub player: Player,
    animation: Option<AnimationHandle>,
    custom_string: Option<String>,
    spawn_source: Option<SpawnSource>,
    pub spec: Specialization,
    history: SerialHistory,
}

impl Entity {
    pub fn new(id: EntityId, pos: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            pos,
            vel,
            start: pos,
            direction: Facing::Right,
            gravity: 0.0,
            layers: layer::DEFAULT,
            group: None,
            hstate: MotionState::Stable,
            vstate: MotionState::Stable,
            hard_shape: None,
            is_static: false,
            halted: false,
            stride: 1,
            age: 0,
            sprite: None,
            removed: false,
            player: Player::default(),
            animation: None,
            custom_string: None,
            spawn_source: None,
            spec: Specialization::None,
            history: SerialHistory::default(),
        }
    }

    /// Install a specialization. Only the first bind takes effect.
    pub fn bind(&mut self, spec: Specialization) -> bool {
        if !matches!(self.spec, Specialization::None) {
            log::warn!(
                "Entity {:?} already has specialization {}, ignoring rebind",
                self.id,
                self.spec.kind_id()
            );
            return false;
        }
        self.spec = spec;
        true
    }

    pub fn set_spawn_source(&mut self, source: SpawnSource) {
        self.spawn_source = Some(source);
    }

    pub fn spawn_source(&self) -> Option<SpawnSource> {
        self.spawn_source
    }

    pub fn har(&self) -> Option<&Har> {
        match &self.spec {
            Specialization::Har(h) => Some(h),
            _ => None,
        }
    }

    pub fn har_mut(&mut self) -> Option<&mut Har> {
        match &mut self.spec {
            Specialization::Har(h) => Some(h),
            _ => None,
        }
    }

    // -- animation ---------------------------------------------------------

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref().map(AnimationHandle::get)
    }

    pub fn animation_id(&self) -> Option<u8> {
        self.animation().map(|a| a.id)
    }

    pub fn owns_animation(&self) -> bool {
        self.animation.as_ref().is_some_and(AnimationHandle::is_owned)
    }

    pub fn custom_string(&self) -> Option<&str> {
        self.custom_string.as_deref()
    }

    /// Bind a shared animation and rewind playback
    pub fn set_animation(&mut self, animation: Arc<Animation>) {
        self.bind_animation(AnimationHandle::Shared(animation));
    }

    /// Bind an animation this entity owns
    pub fn set_owned_animation(&mut self, animation: Animation) {
        self.bind_animation(AnimationHandle::Owned(Box::new(animation)));
    }

    fn bind_animation(&mut self, handle: AnimationHandle) {
        self.player.load(Script::parse(&handle.get().string));
        self.animation = Some(handle);
        self.custom_string = None;
        self.start = self.pos;
        self.sprite = None;
    }

    /// Replace the script of the bound animation, keeping its sprites
    pub fn set_custom_string(&mut self, script: &str) {
        self.player.reload(Script::parse(script));
        self.custom_string = Some(script.to_string());
        self.start = self.pos;
    }

    /// Sprite of the current frame
    pub fn current_sprite(&self) -> Option<&Sprite> {
        let index = self.sprite?;
        self.animation()?.sprite(index)
    }

    pub fn finished(&self) -> bool {
        self.player.finished
    }

    /// Advance playback by `stride` ticks, applying entered frames
    pub fn tick_animation(&mut self, world: &mut World) {
        if self.animation.is_none() || self.halted {
            return;
        }
        for _ in 0..self.stride.max(1) {
            if let Some(idx) = self.player.run() {
                self.enter_frame(idx, world);
            }
            if self.player.finished {
                break;
            }
        }
    }

    fn enter_frame(&mut self, idx: usize, world: &mut World) {
        let Some(frame) = self.player.script().frame(idx) else {
            return;
        };
        let fx = FrameEffects::from_frame(frame, self.start, self.pos, self.direction);

        self.sprite = Some(fx.sprite);
        if let Some(pos) = fx.position {
            self.pos = pos;
        }
        if let Some(cue) = fx.sound {
            world.events.push(GameEvent::Sound {
                id: cue.id,
                volume: cue.volume,
                pan: cue.pan,
                pitch: cue.pitch,
            });
        }
        match (fx.spawn, self.spawn_source) {
            (Some(hint), Some(source)) => world.spawns.push(SpawnRequest {
                parent: self.id,
                source,
                anim_id: hint.id,
                pos: hint.pos,
                vel: hint.vel,
                direction: self.direction,
                gravity: hint.gravity,
                flags: hint.flags,
            }),
            (Some(hint), None) => {
                log::debug!("Entity {:?} has no spawn source, dropping spawn {}", self.id, hint.id)
            }
            _ => {}
        }
        if let (Some(anim_id), Some(source)) = (fx.destroy, self.spawn_source) {
            world.destroys.push(DestroyRequest { source, anim_id });
        }
        if let Some(tick) = fx.rewind {
            if !self.player.disable_rewind {
                self.player.jump_to_tick(tick);
            }
        }
    }

    // -- hooks -------------------------------------------------------------

    /// Animation step followed by the specialization's tick hook
    pub fn tick(&mut self, world: &mut World) {
        self.age += 1;
        self.tick_animation(world);

        let mut spec = std::mem::take(&mut self.spec);
        match &mut spec {
            Specialization::Har(h) => har::tick(self, h, world),
            Specialization::Scrap(s) => s.tick(self, world),
            Specialization::Hazard(h) => h.tick(self, world),
            Specialization::Projectile(_) | Specialization::None => {}
        }
        self.spec = spec;
    }

    /// Integrate motion
    pub fn move_entity(&mut self, world: &mut World) {
        let mut spec = std::mem::take(&mut self.spec);
        match &mut spec {
            Specialization::Har(h) => har::move_har(self, h, world),
            Specialization::Projectile(p) => p.move_entity(self, world),
            Specialization::Scrap(s) => s.move_entity(self, world),
            Specialization::Hazard(h) => h.move_entity(self, world),
            Specialization::None => {
                self.pos += self.vel;
                self.vel.y += self.gravity;
            }
        }
        self.spec = spec;
    }

    /// Input action; only HARs accept input
    pub fn act(&mut self, action: u8, world: &mut World) -> bool {
        let mut spec = std::mem::take(&mut self.spec);
        let accepted = match &mut spec {
            Specialization::Har(h) => har::act(self, h, action, world),
            _ => false,
        };
        self.spec = spec;
        accepted
    }

    /// Animation finished. Returns false when the entity should be removed.
    pub fn on_finished(&mut self, world: &mut World) -> bool {
        let mut spec = std::mem::take(&mut self.spec);
        let keep = match &mut spec {
            Specialization::Har(h) => {
                har::finished(self, h, world);
                true
            }
            Specialization::Projectile(p) => p.on_finished(self, world),
            Specialization::Hazard(h) => h.on_finished(self, world),
            Specialization::Scrap(_) | Specialization::None => false,
        };
        self.spec = spec;
        keep
    }

    // -- serialization -----------------------------------------------------

    pub fn serialize(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            age: self.age,
            pos: self.pos,
            vel: self.vel,
            direction: self.direction,
            layers: self.layers,
            group: self.group,
            stride: self.stride,
            spawn_source: self.spawn_source,
            animation_id: self.animation_id(),
            custom_string: self.custom_string.clone(),
            anim_tick: self.player.current_tick,
            repeat: self.player.repeat,
            reverse: self.player.reverse,
            spec_id: self.spec.kind_id(),
            blob: self.spec.to_blob(),
        }
    }

    /// Rebuild an entity from a snapshot, relinking shared assets
    pub fn unserialize(snapshot: &EntitySnapshot, world: &World) -> Self {
        let mut e = Entity::new(snapshot.id, snapshot.pos, snapshot.vel);
        e.age = snapshot.age;
        e.direction = snapshot.direction;
        e.layers = snapshot.layers;
        e.group = snapshot.group;
        e.stride = snapshot.stride;
        e.spawn_source = snapshot.spawn_source;

        if let (Some(anim_id), Some(source)) = (snapshot.animation_id, snapshot.spawn_source) {
            match world.animation(source, anim_id) {
                Some(animation) => {
                    e.set_animation(animation);
                    e.player.repeat = snapshot.repeat;
                    e.player.reverse = snapshot.reverse;
                    if let Some(custom) = &snapshot.custom_string {
                        e.set_custom_string(custom);
                    }
                    e.player.jump_to_tick(snapshot.anim_tick);
                }
                None => log::warn!("Snapshot references unknown animation {anim_id}"),
            }
        }

        e.spec = Specialization::from_blob(snapshot.spec_id, &snapshot.blob, world);
        if let Specialization::Har(h) = &e.spec {
            e.gravity = h.stats.fall_speed;
        }
        e
    }

    /// Record the current state into the history
    pub fn record_serialization_point(&mut self) {
        let snapshot = self.serialize();
        self.history.push(snapshot);
    }

    pub fn last_serialization_point(&self) -> Option<&EntitySnapshot> {
        self.history.get(0)
    }

    /// State `ticks_ago` ticks before the latest record; `None` past the history depth
    pub fn serialization_point(&self, ticks_ago: usize) -> Option<&EntitySnapshot> {
        self.history.get(ticks_ago)
    }
}

/// Route a collision between two entities to whichever side has a collide hook
pub fn collide(a: &mut Entity, b: &mut Entity, world: &mut World) {
    let mut spec_a = std::mem::take(&mut a.spec);
    let mut spec_b = std::mem::take(&mut b.spec);
    match (&mut spec_a, &mut spec_b) {
        (Specialization::Har(ha), other) => har::collide(a, ha, b, other, world),
        (other, Specialization::Har(hb)) => har::collide(b, hb, a, other, world),
        _ => {}
    }
    a.spec = spec_a;
    b.spec = spec_b;
}

/// Layers overlap and the entities are not in the same group
pub fn can_interact(a: &Entity, b: &Entity) -> bool {
    if a.layers & b.layers == 0 {
        return false;
    }
    !matches!((a.group, b.group), (Some(ga), Some(gb)) if ga == gb)
}
