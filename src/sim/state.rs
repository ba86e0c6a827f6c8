//! Match state and the services entities see while they tick
//!
//! [`GameState`] owns the entity roster. [`World`] is everything else an
//! entity hook may touch: the RNG, the fighters' shared character data, the
//! scene, and the queues (events, spawns, destroys, commands) that are
//! drained between simulation phases.

use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::animation::{Animation, anim};
use super::entity::{
    DestroyRequest, Entity, EntityId, Facing, SpawnRequest, SpawnSource, Specialization,
};
use super::har::{self, Har, HarState, PilotStats};
use super::hazard::{self, SceneData};
use super::moves::CharacterData;
use super::projectile;
use super::scrap;
use super::shape::Shape;
use crate::consts::*;

/// Phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArenaPhase {
    /// Intro delay, input ignored
    Starting,
    #[default]
    Fighting,
    /// A HAR is down; the winner may still finish it off
    Ending,
    Over,
}

impl ArenaPhase {
    pub fn accepts_input(self) -> bool {
        matches!(self, ArenaPhase::Fighting | ArenaPhase::Ending)
    }

    pub fn is_ending(self) -> bool {
        matches!(self, ArenaPhase::Ending | ArenaPhase::Over)
    }
}

/// Character and pilot bound to a player slot
#[derive(Debug, Clone)]
pub struct Fighter {
    pub character: Arc<CharacterData>,
    pub pilot: PilotStats,
}

/// Notifications about one HAR, delivered to controllers after each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarEvent {
    Attack { move_id: u8 },
    Block { move_id: u8 },
    EnemyBlock { move_id: u8 },
    LandHit { move_id: u8 },
    TakeHit { move_id: u8 },
    HazardHit,
    EnemyHazardHit,
    Stun,
    EnemyStun,
    Recover,
    Land,
    Jump,
    Walk,
    Defeat,
    Scrap,
    Destruction,
    Done,
}

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Sound { id: u8, volume: f32, pan: f32, pitch: f32 },
    Har { player: u8, event: HarEvent },
    Ko { loser: u8 },
    MatchOver { winner: u8 },
}

/// Cross-entity effect applied by the state between phases
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Put a HAR into the damage animation driven by the opponent's finisher
    ForceDamage { player: u8, footer: String },
    EndMatch { winner: u8 },
}

/// Shared services for entity hooks
#[derive(Debug, Clone)]
pub struct World {
    pub phase: ArenaPhase,
    pub rng: Pcg32,
    pub time_ticks: u64,
    pub scene: Arc<SceneData>,
    pub events: Vec<GameEvent>,
    pub spawns: Vec<SpawnRequest>,
    pub destroys: Vec<DestroyRequest>,
    pub commands: Vec<Command>,
    roster: [Option<Fighter>; 2],
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: ArenaPhase::Fighting,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            scene: Arc::new(SceneData::default()),
            events: Vec::new(),
            spawns: Vec::new(),
            destroys: Vec::new(),
            commands: Vec::new(),
            roster: [None, None],
        }
    }

    pub fn set_fighter(&mut self, player: u8, fighter: Fighter) {
        if let Some(slot) = self.roster.get_mut(player as usize) {
            *slot = Some(fighter);
        }
    }

    pub fn fighter(&self, player: u8) -> Option<&Fighter> {
        self.roster.get(player as usize).and_then(Option::as_ref)
    }

    pub fn emit(&mut self, player: u8, event: HarEvent) {
        self.events.push(GameEvent::Har { player, event });
    }

    /// Fire-and-forget sound cue
    pub fn play_sound(&mut self, id: u8, volume: f32, pan: f32, pitch: f32) {
        self.events.push(GameEvent::Sound {
            id,
            volume,
            pan,
            pitch,
        });
    }

    /// Resolve an animation id against a spawn source
    pub fn animation(&self, source: SpawnSource, id: u8) -> Option<Arc<Animation>> {
        match source {
            SpawnSource::Har { player } => self.fighter(player)?.character.animation(id),
            SpawnSource::Scene => self.scene.animation(id),
        }
    }
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    /// Ticks spent in [`ArenaPhase::Starting`]
    pub start_delay: u64,
    pub paused: bool,
    /// Active entities (sorted by id for determinism)
    pub entities: Vec<Entity>,
    pub world: World,
    /// Static arena box used for hard-shape containment
    pub boundary: Entity,
    /// Entity id of each player's HAR
    pub hars: [Option<EntityId>; 2],
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        let mut boundary = Entity::new(
            EntityId(0),
            Vec2::new(ARENA_LEFT_WALL, ARENA_CEILING),
            Vec2::ZERO,
        );
        boundary.hard_shape = Some(Shape::inv_rect(
            (ARENA_RIGHT_WALL - ARENA_LEFT_WALL) as i32,
            (ARENA_FLOOR + 1.0 - ARENA_CEILING) as i32,
        ));
        boundary.is_static = true;
        boundary.layers = 0;

        Self {
            seed,
            start_delay: 0,
            paused: false,
            entities: Vec::new(),
            world: World::new(seed),
            boundary,
            hars: [None, None],
            next_id: 1,
        }
    }

    pub fn time_ticks(&self) -> u64 {
        self.world.time_ticks
    }

    pub fn phase(&self) -> ArenaPhase {
        self.world.phase
    }

    /// Hold input for `ticks` before the fight begins
    pub fn set_start_delay(&mut self, ticks: u64) {
        self.start_delay = ticks;
        if ticks > 0 && self.world.time_ticks < ticks {
            self.world.phase = ArenaPhase::Starting;
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// Place a player's HAR on the floor
    pub fn add_har(&mut self, player: u8, fighter: Fighter, x: f32, facing: Facing) -> EntityId {
        let id = self.next_entity_id();
        let ent = har::create(id, player, &fighter, x, facing);
        log::info!(
            "Player {player} HAR {} (power {}, agility {}, endurance {}) at x={x}",
            fighter.character.name,
            fighter.pilot.power,
            fighter.pilot.agility,
            fighter.pilot.endurance
        );
        self.world.set_fighter(player, fighter);
        self.hars[player.min(1) as usize] = Some(id);
        self.add_entity(ent)
    }

    /// Install the arena's hazard table and place its standing hazards
    pub fn set_scene(&mut self, scene: SceneData) {
        let starters: Vec<u8> = scene
            .hazards
            .iter()
            .filter(|h| h.autostart)
            .map(|h| h.id())
            .collect();
        self.world.scene = Arc::new(scene);
        for anim_id in starters {
            self.world.spawns.push(SpawnRequest {
                parent: self.boundary.id,
                source: SpawnSource::Scene,
                anim_id,
                pos: Vec2::ZERO,
                vel: Vec2::ZERO,
                direction: Facing::Right,
                gravity: 0.0,
                flags: 0,
            });
        }
        self.apply_spawns();
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.entities[i])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(move |i| &mut self.entities[i])
    }

    pub fn har_entity(&self, player: u8) -> Option<&Entity> {
        self.hars.get(player as usize).copied().flatten().and_then(|id| self.entity(id))
    }

    pub fn har(&self, player: u8) -> Option<&Har> {
        self.har_entity(player).and_then(Entity::har)
    }

    /// Either HAR is playing its destruction finisher
    pub fn is_destruction(&self) -> bool {
        (0..2).any(|p| self.har(p).is_some_and(|h| h.state == HarState::Destruction))
    }

    /// Run `f` on a player's HAR with the world borrowed alongside
    pub fn with_har<R>(
        &mut self,
        player: u8,
        f: impl FnOnce(&mut Entity, &mut Har, &mut World) -> R,
    ) -> Option<R> {
        let id = self.hars.get(player as usize).copied().flatten()?;
        let idx = self.index_of(id)?;
        let ent = &mut self.entities[idx];
        let mut spec = std::mem::take(&mut ent.spec);
        let out = match &mut spec {
            Specialization::Har(h) => Some(f(ent, h, &mut self.world)),
            _ => None,
        };
        ent.spec = spec;
        out
    }

    /// Two distinct entities mutably, `i < j`
    pub fn pair_mut(&mut self, i: usize, j: usize) -> (&mut Entity, &mut Entity) {
        debug_assert!(i < j);
        let (head, tail) = self.entities.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.entities.sort_by_key(|e| e.id);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.world.events)
    }

    /// Materialize queued spawn requests
    pub fn apply_spawns(&mut self) {
        while !self.world.spawns.is_empty() {
            let requests = std::mem::take(&mut self.world.spawns);
            for req in requests {
                if let Some(ent) = self.spawn_one(&req) {
                    self.add_entity(ent);
                }
            }
        }
    }

    fn spawn_one(&mut self, req: &SpawnRequest) -> Option<Entity> {
        match req.source {
            SpawnSource::Har { player } => {
                let Some(fighter) = self.world.fighter(player) else {
                    log::warn!("Spawn {} for empty player slot {player}", req.anim_id);
                    return None;
                };
                let character = Arc::clone(&fighter.character);

                if req.anim_id == anim::BLOCKING_SCRAPE {
                    let animation = character.animation(req.anim_id)?;
                    let id = self.next_entity_id();
                    return Some(scrap::spawn_effect(id, req.pos, req.source, animation));
                }
                if anim::is_debris(req.anim_id) {
                    if req.gravity == 0.0 {
                        // scripted scrap burst
                        let destruction = self.is_destruction();
                        har::spawn_scrap(
                            &mut self.world,
                            req.parent,
                            player,
                            req.pos,
                            12,
                            req.direction,
                            destruction,
                        );
                        return None;
                    }
                    let animation = character.animation(req.anim_id)?;
                    let id = self.next_entity_id();
                    return Some(scrap::spawn(id, req, animation));
                }

                let Some(mv) = character.get_move(req.anim_id) else {
                    log::debug!("Player {player} spawn of unknown move {}", req.anim_id);
                    return None;
                };
                let invincible = self
                    .har(player)
                    .is_some_and(|h| matches!(h.state, HarState::Scrap | HarState::Destruction));
                let id = self.next_entity_id();
                Some(projectile::spawn(id, player, mv, req, invincible))
            }
            SpawnSource::Scene => {
                let Some(info) = self.world.scene.get(req.anim_id).cloned() else {
                    log::debug!("Scene spawn of unknown hazard {}", req.anim_id);
                    return None;
                };
                let id = self.next_entity_id();
                Some(hazard::spawn(id, &info, req))
            }
        }
    }

    /// Remove entities named by queued destroy requests. HARs are never removed.
    pub fn apply_destroys(&mut self) {
        for req in std::mem::take(&mut self.world.destroys) {
            for ent in &mut self.entities {
                if ent.har().is_none()
                    && ent.spawn_source() == Some(req.source)
                    && ent.animation_id() == Some(req.anim_id)
                {
                    ent.removed = true;
                }
            }
        }
    }

    /// Apply cross-entity commands queued by hooks
    pub fn apply_commands(&mut self) {
        for cmd in std::mem::take(&mut self.world.commands) {
            match cmd {
                Command::ForceDamage { player, footer } => {
                    self.with_har(player, |ent, h, _| har::force_damage(ent, h, &footer));
                }
                Command::EndMatch { winner } => {
                    if self.world.phase != ArenaPhase::Over {
                        log::info!("Match over, player {winner} wins");
                        self.world.phase = ArenaPhase::Over;
                        self.world.events.push(GameEvent::MatchOver { winner });
                    }
                }
            }
        }
    }

    /// Knock-out detection: the first HAR to reach defeat ends the fight
    pub fn check_match_flow(&mut self) {
        if self.world.phase != ArenaPhase::Fighting {
            return;
        }
        let loser = (0..2u8).find(|&p| self.har(p).is_some_and(|h| h.state == HarState::Defeat));
        let Some(loser) = loser else {
            return;
        };
        let winner = 1 - loser;
        log::info!("Player {loser} knocked out");
        self.world.phase = ArenaPhase::Ending;
        self.world.events.push(GameEvent::Ko { loser });
        self.with_har(winner, |ent, h, _| har::enter_victory(ent, h));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    fn two_hars() -> GameState {
        let mut s = GameState::new(42);
        s.add_har(0, sample::fighter().unwrap(), 100.0, Facing::Right);
        s.add_har(1, sample::fighter().unwrap(), 220.0, Facing::Left);
        s
    }

    #[test]
    fn test_ids_are_monotonic_and_sorted() {
        let mut s = two_hars();
        let a = s.hars[0].unwrap();
        let b = s.hars[1].unwrap();
        assert!(a < b);
        s.entities.reverse();
        s.normalize_order();
        assert_eq!(s.index_of(a), Some(0));
        assert_eq!(s.index_of(b), Some(1));
    }

    #[test]
    fn test_pair_mut_returns_distinct_entities() {
        let mut s = two_hars();
        let (a, b) = s.pair_mut(0, 1);
        a.pos.x = 1.0;
        b.pos.x = 2.0;
        assert_eq!(s.entities[0].pos.x, 1.0);
        assert_eq!(s.entities[1].pos.x, 2.0);
    }

    #[test]
    fn test_spawn_routing() {
        let mut s = two_hars();
        let parent = s.hars[0].unwrap();
        let base = SpawnRequest {
            parent,
            source: SpawnSource::Har { player: 0 },
            anim_id: sample::MOVE_FIREBALL,
            pos: Vec2::new(140.0, 150.0),
            vel: Vec2::new(5.0, 0.0),
            direction: Facing::Right,
            gravity: 0.0,
            flags: 0,
        };
        s.world.spawns.push(base.clone());
        s.world.spawns.push(SpawnRequest {
            anim_id: anim::BLOCKING_SCRAPE,
            ..base.clone()
        });
        s.world.spawns.push(SpawnRequest {
            anim_id: anim::BOLT,
            gravity: 1.0,
            ..base.clone()
        });
        s.world.spawns.push(SpawnRequest {
            anim_id: 66,
            ..base
        });
        s.apply_spawns();

        let kinds: Vec<u8> = s.entities.iter().skip(2).map(|e| e.spec.kind_id()).collect();
        assert_eq!(
            kinds,
            vec![
                crate::sim::entity::SPEC_PROJECTILE,
                crate::sim::entity::SPEC_NONE,
                crate::sim::entity::SPEC_SCRAP
            ]
        );
    }

    #[test]
    fn test_scripted_debris_bursts_into_scrap() {
        let mut s = two_hars();
        s.world.spawns.push(SpawnRequest {
            parent: s.hars[0].unwrap(),
            source: SpawnSource::Har { player: 0 },
            anim_id: anim::SCREW,
            pos: Vec2::new(140.0, 150.0),
            vel: Vec2::ZERO,
            direction: Facing::Right,
            gravity: 0.0,
            flags: 0,
        });
        s.apply_spawns();
        // 12 pieces: 4 oil drops and 1 debris
        assert_eq!(s.entities.len(), 2 + 5);
        assert!(s.entities.iter().skip(2).all(|e| e.spec.kind_id() == crate::sim::entity::SPEC_SCRAP));
    }

    #[test]
    fn test_destroy_spares_hars() {
        let mut s = two_hars();
        s.world.destroys.push(DestroyRequest {
            source: SpawnSource::Har { player: 0 },
            anim_id: anim::IDLE,
        });
        s.apply_destroys();
        assert!(s.entities.iter().all(|e| !e.removed));
    }

    #[test]
    fn test_knockout_starts_ending_once() {
        let mut s = two_hars();
        s.with_har(1, |_, h, _| h.state = HarState::Defeat);
        s.check_match_flow();
        s.check_match_flow();
        assert_eq!(s.phase(), ArenaPhase::Ending);
        assert_eq!(s.har(0).unwrap().state, HarState::Victory);
        let kos = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Ko { loser: 1 }))
            .count();
        assert_eq!(kos, 1);
    }

    #[test]
    fn test_end_match_command() {
        let mut s = two_hars();
        s.world.commands.push(Command::EndMatch { winner: 0 });
        s.world.commands.push(Command::EndMatch { winner: 0 });
        s.apply_commands();
        assert_eq!(s.phase(), ArenaPhase::Over);
        let overs = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::MatchOver { .. }))
            .count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_force_damage_sets_footer() {
        let mut s = two_hars();
        s.world.commands.push(Command::ForceDamage {
            player: 1,
            footer: "A4-B4".into(),
        });
        s.apply_commands();
        let e = s.har_entity(1).unwrap();
        assert_eq!(e.animation_id(), Some(anim::DAMAGE));
        assert_eq!(e.custom_string(), Some("A4-B4"));
    }
}
