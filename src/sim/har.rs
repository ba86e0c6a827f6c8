//! Fighter (HAR) combat logic
//!
//! A HAR turns controller actions into numpad input tokens, matches them
//! against its character's move table, and runs the combat state machine:
//! walking, blocking, jumping, taking hits, getting stunned, knock-outs and
//! the victory/scrap/destruction finishers.
//!
//! Collision handling between two HARs covers both directions in one call,
//! so the orchestrator only visits each pair once.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::action::*;
use super::animation::anim;
use super::entity::{
    Entity, EntityId, Facing, SpawnRequest, SpawnSource, Specialization, layer,
};
use super::hitpoint::sprite_hitpoint;
use super::moves::{CharacterData, Move, MoveCategory};
use super::projectile::Projectile;
use super::shape::Shape;
use super::state::{Command, Fighter, HarEvent, World};
use crate::consts::*;
use crate::to_vec2;

/// Jump animations start this many ticks in (from the end when jumping back)
pub const JUMP_TICK_OFFSET: i32 = 110;
/// Animation stride while a directional jump plays
pub const JUMP_STRIDE: u32 = 7;
/// Bounce damping of a knocked down HAR
const FALL_BOUNCE: f32 = 0.2;
/// Upward speed given by a knockback frame or an airborne hit
const KNOCKBACK_LIFT: f32 = 7.0;
/// Landing speed below which a falling HAR settles
const SETTLE_SPEED: f32 = 1.0;
/// Burning oil drips every this many stunned ticks
const OIL_DRIP_INTERVAL: u32 = 10;
const SCRAP_GRAVITY: f32 = 1.0;

const SOUND_BLOCK: u8 = 3;
const SOUND_LAND: u8 = 56;

/// Combat state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HarState {
    #[default]
    Standing,
    Crouching,
    Walking,
    Jumping,
    Recoil,
    Fallen,
    StandingUp,
    Stunned,
    Victory,
    /// Knocked out, waiting for the match to end
    Defeat,
    Scrap,
    Destruction,
    Done,
}

impl HarState {
    /// States in which controller input is processed
    pub fn accepts_input(self) -> bool {
        matches!(
            self,
            HarState::Standing
                | HarState::Crouching
                | HarState::Walking
                | HarState::Jumping
                | HarState::Victory
                | HarState::Scrap
        )
    }

    /// Grounded poses that basic movement may change
    fn is_free_pose(self) -> bool {
        matches!(self, HarState::Standing | HarState::Crouching | HarState::Walking)
    }

    /// Defender states a throw can grab
    fn is_closable(self) -> bool {
        matches!(
            self,
            HarState::Standing | HarState::Walking | HarState::Crouching | HarState::Stunned
        )
    }

    fn is_down(self) -> bool {
        matches!(self, HarState::Fallen | HarState::StandingUp | HarState::Defeat)
    }
}

/// Pilot attributes that modulate a HAR, each 0..=25
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotStats {
    pub power: u8,
    pub agility: u8,
    pub endurance: u8,
}

impl Default for PilotStats {
    fn default() -> Self {
        Self {
            power: 10,
            agility: 10,
            endurance: 10,
        }
    }
}

impl PilotStats {
    pub const MAX: u8 = 25;

    pub fn is_valid(&self) -> bool {
        self.power <= Self::MAX && self.agility <= Self::MAX && self.endurance <= Self::MAX
    }

    /// Move damage after pilot power
    pub fn scale_damage(&self, base: f32) -> f32 {
        if base <= 0.0 {
            return 0.0;
        }
        base * (20.0 + self.power as f32) / 30.0 + 1.0
    }
}

/// Movement constants of one HAR after pilot modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarStats {
    pub jump_speed: f32,
    pub superjump_speed: f32,
    pub fall_speed: f32,
    pub forward_speed: f32,
    pub reverse_speed: f32,
    pub health_max: f32,
    pub endurance_max: f32,
}

impl HarStats {
    pub fn new(character: &CharacterData, pilot: PilotStats) -> Self {
        let agility = pilot.agility as f32;
        let jump = (agility + 35.0) / 45.0 * character.jump_speed * 216.0 / 256.0;
        let ground = (agility + 20.0) / 30.0;
        Self {
            jump_speed: jump,
            superjump_speed: jump * 266.0 / 256.0,
            fall_speed: ground * character.fall_speed,
            forward_speed: ground * character.forward_speed,
            reverse_speed: ground * character.reverse_speed,
            health_max: character.health.min(MAX_HEALTH),
            endurance_max: character.endurance * 3.6 * (pilot.endurance as f32 + 16.0) / 23.0,
        }
    }
}

/// Most recent distinct input tokens, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputBuffer {
    buf: [u8; INPUT_BUFFER_LEN],
    len: usize,
}

impl InputBuffer {
    /// Add a token unless it repeats the newest one
    pub fn push(&mut self, token: u8) -> bool {
        if self.len > 0 && self.buf[0] == token {
            return false;
        }
        self.buf.copy_within(0..INPUT_BUFFER_LEN - 1, 1);
        self.buf[0] = token;
        self.len = (self.len + 1).min(INPUT_BUFFER_LEN);
        true
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    /// Move string is a prefix of the buffer
    pub fn matches(&self, move_string: &str) -> bool {
        !move_string.is_empty() && self.as_bytes().starts_with(move_string.as_bytes())
    }
}

/// Actions accepted over the last [`SERIAL_HISTORY`] ticks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionLog {
    entries: VecDeque<(u64, Action)>,
}

impl ActionLog {
    pub fn record(&mut self, tick: u64, action: Action) {
        self.entries.push_back((tick, action));
        let horizon = tick.saturating_sub(SERIAL_HISTORY as u64 - 1);
        while self.entries.front().is_some_and(|&(t, _)| t < horizon) {
            self.entries.pop_front();
        }
    }

    /// Actions accepted on a given tick, in order
    pub fn actions_at(&self, tick: u64) -> impl Iterator<Item = Action> + '_ {
        self.entries
            .iter()
            .filter(move |&&(t, _)| t == tick)
            .map(|&(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fighter payload of an entity
#[derive(Debug, Clone)]
pub struct Har {
    pub player_id: u8,
    pub state: HarState,
    pub health: f32,
    pub endurance: f32,
    pub executing_move: bool,
    /// Holding back while walking or crouching
    pub blocking: bool,
    /// Near enough for throws
    pub close: bool,
    /// Overlapping the opponent
    pub hard_close: bool,
    /// Pushed back on the next tick
    pub flinching: bool,
    pub damage_done: bool,
    pub damage_received: bool,
    pub inputs: InputBuffer,
    /// Move typed on the last tick of the current one, started when it ends
    pub enqueued: Option<u8>,
    pub stun_timer: u32,
    pub wall_hugging: bool,
    /// Touched down this tick
    pub landed: bool,
    pub match_over_reported: bool,
    pub actions: ActionLog,
    pub pilot: PilotStats,
    pub stats: HarStats,
    character: Arc<CharacterData>,
}

/// Serializable part of [`Har`]; the character is relinked on restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarSnapshot {
    pub player_id: u8,
    pub state: HarState,
    pub health: f32,
    pub endurance: f32,
    pub executing_move: bool,
    pub blocking: bool,
    pub close: bool,
    pub hard_close: bool,
    pub flinching: bool,
    pub damage_done: bool,
    pub damage_received: bool,
    pub inputs: InputBuffer,
    #[serde(default)]
    pub enqueued: Option<u8>,
    pub stun_timer: u32,
    pub actions: ActionLog,
}

impl Har {
    pub fn new(player_id: u8, character: Arc<CharacterData>, pilot: PilotStats) -> Self {
        let stats = HarStats::new(&character, pilot);
        Self {
            player_id,
            state: HarState::Standing,
            health: stats.health_max,
            endurance: stats.endurance_max,
            executing_move: false,
            blocking: false,
            close: false,
            hard_close: false,
            flinching: false,
            damage_done: false,
            damage_received: false,
            inputs: InputBuffer::default(),
            enqueued: None,
            stun_timer: 0,
            wall_hugging: false,
            landed: false,
            match_over_reported: false,
            actions: ActionLog::default(),
            pilot,
            stats,
            character,
        }
    }

    pub fn character(&self) -> &Arc<CharacterData> {
        &self.character
    }

    pub fn opponent_id(&self) -> u8 {
        1 - self.player_id.min(1)
    }

    pub fn snapshot(&self) -> HarSnapshot {
        HarSnapshot {
            player_id: self.player_id,
            state: self.state,
            health: self.health,
            endurance: self.endurance,
            executing_move: self.executing_move,
            blocking: self.blocking,
            close: self.close,
            hard_close: self.hard_close,
            flinching: self.flinching,
            damage_done: self.damage_done,
            damage_received: self.damage_received,
            inputs: self.inputs,
            enqueued: self.enqueued,
            stun_timer: self.stun_timer,
            actions: self.actions.clone(),
        }
    }

    /// Rebuild from a snapshot using the fighter bound to its player slot
    pub fn restore(snap: HarSnapshot, world: &World) -> Option<Self> {
        let fighter = world.fighter(snap.player_id)?;
        let mut har = Har::new(snap.player_id, Arc::clone(&fighter.character), fighter.pilot);
        har.state = snap.state;
        har.health = snap.health;
        har.endurance = snap.endurance;
        har.executing_move = snap.executing_move;
        har.blocking = snap.blocking;
        har.close = snap.close;
        har.hard_close = snap.hard_close;
        har.flinching = snap.flinching;
        har.damage_done = snap.damage_done;
        har.damage_received = snap.damage_received;
        har.inputs = snap.inputs;
        har.enqueued = snap.enqueued;
        har.stun_timer = snap.stun_timer;
        har.actions = snap.actions;
        Some(har)
    }

    /// Move bound to the animation currently playing
    pub fn current_move<'a>(&'a self, ent: &Entity) -> Option<&'a Move> {
        ent.animation_id().and_then(|id| self.character.get_move(id))
    }

    /// Category gate for starting a move from the current state
    pub fn move_allowed(&self, mv: &Move) -> bool {
        match mv.category {
            MoveCategory::Close => self.close && self.state != HarState::Jumping,
            MoveCategory::Jumping => self.state == HarState::Jumping,
            MoveCategory::Scrap => self.state == HarState::Victory,
            MoveCategory::Destruction => self.state == HarState::Scrap,
            MoveCategory::FireIce => false,
            _ => !matches!(
                self.state,
                HarState::Jumping | HarState::Victory | HarState::Scrap
            ),
        }
    }

    /// Blocking posture that stops a move of this category
    pub fn is_blocking(&self, mv: &Move) -> bool {
        if mv.category == MoveCategory::Close || self.executing_move || !self.blocking {
            return false;
        }
        match self.state {
            HarState::Crouching => mv.category != MoveCategory::Jumping,
            HarState::Walking => mv.category != MoveCategory::Low,
            _ => false,
        }
    }

    /// Horizontal walking speed for the current posture
    fn walk_velocity(&self, facing: Facing) -> f32 {
        if self.blocking {
            -self.stats.reverse_speed * facing.sign()
        } else if self.hard_close {
            self.stats.forward_speed * facing.sign() * 0.5
        } else {
            self.stats.forward_speed * facing.sign()
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Build a HAR entity standing on the floor
pub fn create(id: EntityId, player: u8, fighter: &Fighter, x: f32, facing: Facing) -> Entity {
    let mut ent = Entity::new(id, Vec2::new(x, ARENA_FLOOR), Vec2::ZERO);
    let har = Har::new(player, Arc::clone(&fighter.character), fighter.pilot);
    ent.direction = facing;
    ent.layers = layer::HAR | layer::har_of(player);
    ent.gravity = har.stats.fall_speed;
    ent.hard_shape = Some(Shape::rect(0, 0));
    ent.set_spawn_source(SpawnSource::Har { player });
    match fighter.character.animation(anim::IDLE) {
        Some(idle) => {
            ent.set_animation(idle);
            ent.player.repeat = true;
        }
        None => log::warn!("Character {} has no idle animation", fighter.character.name),
    }
    ent.bind(Specialization::Har(Box::new(har)));
    ent
}

fn set_ani(ent: &mut Entity, har: &mut Har, anim_id: u8, repeat: bool) -> bool {
    let Some(animation) = har.character.animation(anim_id) else {
        log::warn!("Character {} has no animation {anim_id}", har.character.name);
        return false;
    };
    ent.set_animation(animation);
    ent.player.repeat = repeat;
    ent.stride = 1;
    har.damage_done = false;
    har.damage_received = false;
    har.executing_move = false;
    har.enqueued = None;
    true
}

fn clamp_to_walls(ent: &mut Entity, har: &mut Har) {
    let x = ent.pos.x.clamp(ARENA_LEFT_WALL, ARENA_RIGHT_WALL);
    har.wall_hugging = x <= ARENA_LEFT_WALL || x >= ARENA_RIGHT_WALL;
    ent.pos.x = x;
}

fn pan_of(ent: &Entity) -> f32 {
    (ent.pos.x / SCREEN_WIDTH * 2.0 - 1.0).clamp(-1.0, 1.0)
}

// -- input -------------------------------------------------------------------

/// Process one controller action. Returns true when the action was taken.
pub fn act(ent: &mut Entity, har: &mut Har, action: Action, world: &mut World) -> bool {
    if !har.state.accepts_input() || ent.halted {
        return false;
    }
    if !world.phase.accepts_input() {
        return false;
    }
    har.actions.record(world.time_ticks, action);

    if let Some(token) = action_to_input(action, ent.direction) {
        har.inputs.push(token);
    }

    let character = Arc::clone(&har.character);
    if let Some(mv) = har_find_move(&character, har, ent) {
        start_move(ent, har, mv, world);
        return true;
    }
    if har.executing_move {
        return false;
    }

    if ent.pos.y < ARENA_FLOOR || world.phase.is_ending() || !har.state.is_free_pose() {
        return true;
    }
    change_state(ent, har, action, world);
    true
}

/// First move the input buffer completes. While a move is executing the
/// new one must be chained from the current frame; input on the last tick
/// is queued to start when the current move ends.
fn har_find_move<'a>(character: &'a CharacterData, har: &mut Har, ent: &Entity) -> Option<&'a Move> {
    if har.executing_move && har.enqueued.is_some() {
        return None;
    }
    for mv in character.moves() {
        if !har.inputs.matches(&mv.move_string) || !har.move_allowed(mv) {
            continue;
        }
        if !har.executing_move {
            return Some(mv);
        }
        if ent.player.current_tick >= ent.player.total_ticks() as i32 {
            log::debug!("Player {} enqueues move {}", har.player_id, mv.id());
            har.enqueued = Some(mv.id());
            return None;
        }
        if chain_allowed(ent, mv) {
            log::debug!("Player {} chains into move {}", har.player_id, mv.id());
            return Some(mv);
        }
    }
    None
}

/// Frame tags that let a running move be cut into by `next`
fn chain_allowed(ent: &Entity, next: &Move) -> bool {
    let Some(frame) = ent.player.current_frame() else {
        return false;
    };
    if frame.get("jn") == Some(i32::from(next.id())) {
        return true;
    }
    let tag = match next.category {
        MoveCategory::Low => "jl",
        MoveCategory::Medium => "jm",
        MoveCategory::High => "jh",
        MoveCategory::Scrap => "jf",
        MoveCategory::Destruction => "jf2",
        _ => return false,
    };
    frame.is_set(tag)
}

fn start_move(ent: &mut Entity, har: &mut Har, mv: &Move, world: &mut World) {
    log::debug!(
        "Player {} starts move {} ({:?}) from input {:?}",
        har.player_id,
        mv.id(),
        mv.category,
        har.inputs.as_str()
    );
    har.inputs.clear();
    har.enqueued = None;
    ent.set_animation(Arc::clone(&mv.animation));
    ent.player.repeat = false;
    ent.stride = 1;
    har.damage_done = false;
    har.damage_received = false;
    har.executing_move = true;
    if mv.category != MoveCategory::Jumping {
        ent.vel.x = 0.0;
    }

    let player = har.player_id;
    match mv.category {
        MoveCategory::Scrap | MoveCategory::Destruction => {
            let (state, event) = if mv.category == MoveCategory::Scrap {
                (HarState::Scrap, HarEvent::Scrap)
            } else {
                (HarState::Destruction, HarEvent::Destruction)
            };
            har.state = state;
            world.commands.push(Command::ForceDamage {
                player: har.opponent_id(),
                footer: mv.footer_string.clone(),
            });
            world.emit(player, event);
        }
        _ => {}
    }
    world.emit(player, HarEvent::Attack { move_id: mv.id() });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JumpDir {
    Up,
    Forward,
    Back,
}

fn change_state(ent: &mut Entity, har: &mut Har, action: Action, world: &mut World) {
    let (fwd, back) = forward_back(ent.direction);
    let target = match action {
        a if a == ACT_DOWN | back => (HarState::Crouching, true),
        a if a == ACT_DOWN | fwd => (HarState::Crouching, false),
        ACT_DOWN => (HarState::Crouching, false),
        ACT_STOP => (HarState::Standing, false),
        a if a == back => (HarState::Walking, true),
        a if a == fwd => (HarState::Walking, false),
        ACT_UP => return jump(ent, har, JumpDir::Up, world),
        a if a == ACT_UP | fwd => return jump(ent, har, JumpDir::Forward, world),
        a if a == ACT_UP | back => return jump(ent, har, JumpDir::Back, world),
        _ => return,
    };
    if (har.state, har.blocking) == target {
        return;
    }

    let (state, blocking) = target;
    let was_crouching = har.state == HarState::Crouching;
    har.state = state;
    har.blocking = blocking;
    match state {
        HarState::Crouching => {
            if !was_crouching {
                set_ani(ent, har, anim::CROUCHING, true);
            }
            ent.vel.x = 0.0;
        }
        HarState::Walking => {
            set_ani(ent, har, anim::WALKING, true);
            ent.player.reverse = blocking;
            ent.vel.x = har.walk_velocity(ent.direction);
            world.emit(har.player_id, HarEvent::Walk);
        }
        _ => {
            set_ani(ent, har, anim::IDLE, true);
            ent.vel.x = 0.0;
        }
    }
}

fn jump(ent: &mut Entity, har: &mut Har, dir: JumpDir, world: &mut World) {
    let vy = if har.state == HarState::Crouching {
        har.stats.superjump_speed
    } else {
        har.stats.jump_speed
    };
    har.state = HarState::Jumping;
    har.blocking = false;
    set_ani(ent, har, anim::JUMPING, false);
    ent.vel.y = vy;
    let sign = ent.direction.sign();
    match dir {
        JumpDir::Up => ent.vel.x = 0.0,
        JumpDir::Forward => {
            ent.vel.x = har.stats.forward_speed * sign;
            ent.player.jump_to_tick(JUMP_TICK_OFFSET);
            ent.stride = JUMP_STRIDE;
        }
        JumpDir::Back => {
            ent.vel.x = -har.stats.reverse_speed * sign;
            ent.player.reverse = true;
            ent.player.jump_to_tick(-JUMP_TICK_OFFSET);
            ent.stride = JUMP_STRIDE;
        }
    }
    world.emit(har.player_id, HarEvent::Jump);
}

// -- per tick ----------------------------------------------------------------

/// Wall clamp, sliding, flinch, stun timer and endurance regeneration
pub fn tick(ent: &mut Entity, har: &mut Har, world: &mut World) {
    clamp_to_walls(ent, har);

    let airborne = ent.pos.y < ARENA_FLOOR;
    if har.state == HarState::Walking && !har.executing_move {
        ent.vel.x = har.walk_velocity(ent.direction);
    } else if !airborne {
        ent.vel.x = 0.0;
    }

    if har.flinching {
        ent.vel.x -= FLINCH_SPEED * ent.direction.sign();
        har.flinching = false;
    }

    if har.state == HarState::Stunned {
        har.stun_timer += 1;
        if har.stun_timer % OIL_DRIP_INTERVAL == 0 {
            spawn_scrap(
                world,
                ent.id,
                har.player_id,
                ent.pos + Vec2::new(0.0, -60.0),
                3,
                ent.direction,
                false,
            );
        }
        if har.stun_timer > STUN_DURATION {
            har.state = HarState::Standing;
            har.stun_timer = 0;
            set_ani(ent, har, anim::IDLE, true);
            world.emit(har.player_id, HarEvent::Recover);
        }
    }

    let resting = !matches!(
        har.state,
        HarState::Recoil
            | HarState::Stunned
            | HarState::Fallen
            | HarState::StandingUp
            | HarState::Defeat
    );
    if resting && !har.executing_move {
        har.endurance = (har.endurance + ENDURANCE_REGEN).min(har.stats.endurance_max);
    }
}

/// Integrate position; handles landing and knock-down bounces
pub fn move_har(ent: &mut Entity, har: &mut Har, world: &mut World) {
    har.landed = false;
    ent.pos += ent.vel;
    if ent.pos.y < ARENA_FLOOR {
        ent.vel.y += ent.gravity;
    } else {
        let landing_speed = ent.vel.y;
        ent.pos.y = ARENA_FLOOR;
        match har.state {
            HarState::Jumping => land(ent, har, world),
            HarState::Recoil | HarState::Fallen if landing_speed > 0.0 => {
                bounce(ent, har, landing_speed, world)
            }
            _ => ent.vel.y = 0.0,
        }
    }
    clamp_to_walls(ent, har);
}

fn land(ent: &mut Entity, har: &mut Har, world: &mut World) {
    ent.vel = Vec2::ZERO;
    har.state = HarState::Standing;
    har.blocking = false;
    set_ani(ent, har, anim::IDLE, true);
    har.landed = true;
    world.emit(har.player_id, HarEvent::Land);
    world.play_sound(SOUND_LAND, 0.3, pan_of(ent), 1.0);
}

fn bounce(ent: &mut Entity, har: &mut Har, speed: f32, world: &mut World) {
    har.state = HarState::Fallen;
    ent.vel.y = -speed * FALL_BOUNCE;
    ent.vel.x *= FALL_BOUNCE;
    world.play_sound(SOUND_LAND, 0.3, pan_of(ent), 1.0);
    if ent.vel.y.abs() < SETTLE_SPEED {
        ent.vel = Vec2::ZERO;
        get_up(ent, har, world);
    }
}

fn get_up(ent: &mut Entity, har: &mut Har, world: &mut World) {
    if har.is_alive() {
        har.state = HarState::StandingUp;
        set_ani(ent, har, anim::STANDUP, false);
    } else {
        defeat(ent, har, world);
    }
}

fn defeat(ent: &mut Entity, har: &mut Har, world: &mut World) {
    log::info!("Player {} HAR defeated", har.player_id);
    har.state = HarState::Defeat;
    set_ani(ent, har, anim::DEFEAT, false);
    world.emit(har.player_id, HarEvent::Defeat);
}

/// Play the victory pose after the opponent went down
pub fn enter_victory(ent: &mut Entity, har: &mut Har) {
    har.state = HarState::Victory;
    har.blocking = false;
    ent.vel.x = 0.0;
    set_ani(ent, har, anim::VICTORY, false);
}

/// Force the damage animation driven by an opponent's finisher
pub fn force_damage(ent: &mut Entity, har: &mut Har, footer: &str) {
    set_ani(ent, har, anim::DAMAGE, false);
    if !footer.is_empty() {
        ent.set_custom_string(footer);
    }
}

// -- combat ------------------------------------------------------------------

/// Apply a hit: health and endurance loss, recoil and knockback
pub fn take_damage(ent: &mut Entity, har: &mut Har, footer: &str, damage: f32) {
    har.health = (har.health - damage).max(0.0);
    har.endurance = (har.endurance - damage * ENDURANCE_PER_DAMAGE).max(0.0);
    if har.health <= 0.0 {
        har.endurance = 0.0;
    }

    let airborne = ent.pos.y < ARENA_FLOOR;
    har.state = if airborne {
        HarState::Fallen
    } else {
        HarState::Recoil
    };
    har.blocking = false;
    set_ani(ent, har, anim::DAMAGE, false);
    if !footer.is_empty() {
        ent.set_custom_string(footer);
    }

    if airborne {
        ent.vel.y = -KNOCKBACK_LIFT;
    } else if ent.player.peek_tag(0, "k").is_some() {
        ent.vel.y -= KNOCKBACK_LIFT;
    }
    har.flinching = true;

    log::debug!(
        "Player {} takes {damage:.1} damage, health {:.1} endurance {:.1}",
        har.player_id,
        har.health,
        har.endurance
    );
}

fn block(ent: &mut Entity, har: &mut Har, at: Vec2, world: &mut World) {
    let anim_id = if har.state == HarState::Crouching {
        anim::CROUCHING_BLOCK
    } else {
        anim::STANDING_BLOCK
    };
    set_ani(ent, har, anim_id, false);
    ent.set_custom_string("A5");
    world.spawns.push(SpawnRequest {
        parent: ent.id,
        source: SpawnSource::Har {
            player: har.player_id,
        },
        anim_id: anim::BLOCKING_SCRAPE,
        pos: at,
        vel: Vec2::ZERO,
        direction: ent.direction,
        gravity: 0.0,
        flags: 0,
    });
    world.play_sound(SOUND_BLOCK, 0.7, 0.5, 1.0);
    har.damage_received = true;
    har.flinching = true;
}

/// Invulnerability tag on the defender's current frame
fn is_invulnerable(ent: &Entity, category: MoveCategory) -> bool {
    if ent.player.frame_isset("zz") {
        return true;
    }
    let tag = match category {
        MoveCategory::Low => "zl",
        MoveCategory::Medium => "zm",
        MoveCategory::High => "zh",
        MoveCategory::Jumping => "zj",
        MoveCategory::Projectile => "zp",
        _ => return false,
    };
    ent.player.frame_isset(tag)
}

/// Launch velocity of piece `i` out of `n` scattered from a hit
fn scatter_velocity(i: u32, n: u32, rv: f32, direction: Facing) -> Vec2 {
    let (i, n) = (i as f32, n.max(1) as f32);
    let vx = 5.0 * (90.0 + i - (n / 2.0).floor() + rv).cos() * direction.sign();
    let mut vy = -12.0 * ((i / n).floor() + rv).sin();
    if vy.abs() < 0.1 {
        vy += 0.21;
    }
    Vec2::new(vx, vy)
}

/// Scatter burning oil and debris from a hit
pub fn spawn_scrap(
    world: &mut World,
    parent: EntityId,
    player: u8,
    pos: Vec2,
    amount: u8,
    direction: Facing,
    destruction: bool,
) {
    let source = SpawnSource::Har { player };
    let oil = u32::from(amount / 3);
    for i in 0..oil {
        let rv = world.rng.random_range(-0.5f32..0.5);
        world.spawns.push(SpawnRequest {
            parent,
            source,
            anim_id: anim::BURNING_OIL,
            pos,
            vel: scatter_velocity(i, oil, rv, direction),
            direction,
            gravity: SCRAP_GRAVITY,
            flags: 0,
        });
    }

    let pieces: u32 = if destruction {
        30
    } else {
        match amount {
            0..=11 => 0,
            12 | 13 => 1,
            14 | 15 => 2,
            _ => 3,
        }
    };
    for i in 0..pieces {
        let rv = world.rng.random_range(-0.5f32..0.5);
        let mut vel = scatter_velocity(i, pieces, rv, direction);
        if destruction {
            vel *= 5.0;
        }
        let anim_id = anim::DEBRIS[world.rng.random_range(0..anim::DEBRIS.len())];
        world.spawns.push(SpawnRequest {
            parent,
            source,
            anim_id,
            pos,
            vel,
            direction,
            gravity: SCRAP_GRAVITY,
            flags: 0,
        });
    }
}

/// Route a HAR's collision with another entity
pub fn collide(
    ent: &mut Entity,
    har: &mut Har,
    other: &mut Entity,
    other_spec: &mut Specialization,
    world: &mut World,
) {
    match other_spec {
        Specialization::Har(other_har) => {
            check_closeness(ent, har, other, other_har);
            har_vs_har(ent, har, other, other_har, world);
            har_vs_har(other, other_har, ent, har, world);
        }
        Specialization::Projectile(p) => har_vs_projectile(ent, har, other, p, world),
        Specialization::Hazard(h) => h.collide_har(other, ent, har, world),
        _ => {}
    }
}

/// Update close flags and push overlapping HARs apart
pub fn check_closeness(a_ent: &mut Entity, a: &mut Har, b_ent: &mut Entity, b: &mut Har) {
    let dist = (a_ent.pos.x - b_ent.pos.x).abs();
    let grounded = a_ent.pos.y >= ARENA_FLOOR && b_ent.pos.y >= ARENA_FLOOR;

    a.close = grounded && dist <= SOFT_CLOSE_LIMIT && b.state.is_closable();
    b.close = grounded && dist <= SOFT_CLOSE_LIMIT && a.state.is_closable();
    a.hard_close = grounded && dist < HARD_CLOSE_LIMIT;
    b.hard_close = a.hard_close;

    if a.hard_close && !a.state.is_down() && !b.state.is_down() {
        let push = (HARD_CLOSE_LIMIT - dist) / 2.0;
        let side = if a_ent.pos.x <= b_ent.pos.x { -1.0 } else { 1.0 };
        a_ent.pos.x += side * push;
        b_ent.pos.x -= side * push;
        clamp_to_walls(a_ent, a);
        clamp_to_walls(b_ent, b);
    }
}

fn har_vs_har(att_ent: &mut Entity, att: &mut Har, def_ent: &mut Entity, def: &mut Har, world: &mut World) {
    if def.state.is_down() || att.damage_done || !att.executing_move {
        return;
    }
    let character = Arc::clone(&att.character);
    let Some(mv) = att_ent.animation_id().and_then(|id| character.get_move(id)) else {
        return;
    };

    let hit = sprite_hitpoint(att_ent, def_ent, 1);
    if hit.is_none() && mv.category != MoveCategory::Close {
        return;
    }
    let at = hit.map(to_vec2).unwrap_or(def_ent.pos + Vec2::new(0.0, -50.0));

    if def.is_blocking(mv) {
        if !def.damage_received {
            block(def_ent, def, at, world);
            world.emit(def.player_id, HarEvent::Block { move_id: mv.id() });
            world.emit(att.player_id, HarEvent::EnemyBlock { move_id: mv.id() });
        }
        return;
    }
    if is_invulnerable(def_ent, mv.category) {
        return;
    }

    if let Some(next) = mv.next_move {
        match character.get_move(next) {
            Some(follow_up) => {
                att_ent.set_animation(Arc::clone(&follow_up.animation));
                att.damage_done = false;
            }
            None => log::warn!("Move {} chains to missing move {next}", mv.id()),
        }
        return;
    }

    let damage = att.pilot.scale_damage(mv.damage);
    take_damage(def_ent, def, &mv.footer_string, damage);
    spawn_scrap(
        world,
        def_ent.id,
        def.player_id,
        at,
        mv.scrap_amount,
        def_ent.direction,
        att.state == HarState::Destruction,
    );
    att.damage_done = true;
    def.damage_received = true;
    world.emit(att.player_id, HarEvent::LandHit { move_id: mv.id() });
    world.emit(def.player_id, HarEvent::TakeHit { move_id: mv.id() });
}

fn har_vs_projectile(
    def_ent: &mut Entity,
    def: &mut Har,
    pj_ent: &mut Entity,
    pj: &mut Projectile,
    world: &mut World,
) {
    if def.state.is_down() || pj.did_hit || pj.owner == def.player_id {
        return;
    }
    let Some(fighter) = world.fighter(pj.owner) else {
        return;
    };
    let power = fighter.pilot;
    let character = Arc::clone(&fighter.character);
    let Some(mv) = pj_ent.animation_id().and_then(|id| character.get_move(id)) else {
        return;
    };
    let Some(hit) = sprite_hitpoint(pj_ent, def_ent, 2) else {
        return;
    };
    let at = to_vec2(hit);

    if def.is_blocking(mv) {
        if !def.damage_received {
            block(def_ent, def, at, world);
            world.emit(def.player_id, HarEvent::Block { move_id: mv.id() });
            world.emit(pj.owner, HarEvent::EnemyBlock { move_id: mv.id() });
        }
        pj.did_hit = true;
        pj.impact(pj_ent, &character, mv);
        return;
    }
    if is_invulnerable(def_ent, MoveCategory::Projectile) {
        return;
    }
    if let Some(next) = mv.next_move {
        match character.get_move(next) {
            Some(follow_up) if follow_up.id() != mv.id() => {
                pj_ent.set_animation(Arc::clone(&follow_up.animation));
                pj_ent.player.repeat = false;
            }
            _ => {
                log::warn!("Projectile move {} chains to unusable move {next}", mv.id());
                pj.did_hit = true;
            }
        }
        return;
    }

    def_ent.vel.x = 0.0;
    take_damage(def_ent, def, &mv.footer_string, power.scale_damage(mv.damage));
    spawn_scrap(
        world,
        def_ent.id,
        def.player_id,
        at,
        mv.scrap_amount,
        def_ent.direction,
        false,
    );
    pj.did_hit = true;
    def.damage_received = true;
    pj.impact(pj_ent, &character, mv);
    world.emit(pj.owner, HarEvent::LandHit { move_id: mv.id() });
    world.emit(def.player_id, HarEvent::TakeHit { move_id: mv.id() });
}

// -- animation end -----------------------------------------------------------

/// Animation finished: pick what the HAR does next
pub fn finished(ent: &mut Entity, har: &mut Har, world: &mut World) {
    if let Some(id) = har.enqueued.take() {
        let character = Arc::clone(&har.character);
        if let Some(mv) = character.get_move(id) {
            start_move(ent, har, mv, world);
            return;
        }
    }

    let was_executing = har.executing_move;
    har.executing_move = false;
    har.flinching = false;

    match har.state {
        HarState::Scrap | HarState::Destruction => {
            har.state = HarState::Done;
            set_ani(ent, har, anim::VICTORY, false);
            world.emit(har.player_id, HarEvent::Done);
        }
        HarState::Victory | HarState::Done => {
            if !har.match_over_reported {
                har.match_over_reported = true;
                world.commands.push(Command::EndMatch {
                    winner: har.player_id,
                });
            }
        }
        HarState::Defeat => {}
        HarState::Recoil if !har.is_alive() => defeat(ent, har, world),
        HarState::Recoil | HarState::StandingUp if har.endurance <= 0.0 => {
            har.state = HarState::Stunned;
            har.stun_timer = 0;
            har.endurance = har.stats.endurance_max;
            set_ani(ent, har, anim::STUNNED, true);
            world.emit(har.player_id, HarEvent::Stun);
            world.emit(har.opponent_id(), HarEvent::EnemyStun);
        }
        HarState::Fallen => {
            if ent.pos.y < ARENA_FLOOR || ent.vel.y != 0.0 {
                ent.player.jump_to_tick(-1);
            } else {
                get_up(ent, har, world);
            }
        }
        HarState::Crouching => {
            set_ani(ent, har, anim::CROUCHING, true);
        }
        HarState::Jumping => {
            set_ani(ent, har, anim::IDLE, true);
        }
        state => {
            if state == HarState::Recoil {
                world.emit(har.player_id, HarEvent::Recover);
            }
            har.state = HarState::Standing;
            har.blocking = false;
            set_ani(ent, har, anim::IDLE, true);
        }
    }

    if was_executing {
        log::debug!("Player {} finished a move", har.player_id);
    }
}
