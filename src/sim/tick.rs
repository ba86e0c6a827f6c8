//! Fixed timestep simulation tick
//!
//! Phase order within one tick is fixed: input, entity tick (animation and
//! specialization), motion, spawns, boundary containment, pairwise
//! collisions, animation completion, removal, history.

use super::action::Action;
use super::collision::collision_handle;
use super::entity::{self, Facing};
use super::har::{self, HarState};
use super::state::{ArenaPhase, GameState};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Actions polled from each player's controller, applied in order
    pub actions: [Vec<Action>; 2],
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    pub fn single(player: u8, action: Action) -> Self {
        let mut input = Self::default();
        if let Some(slot) = input.actions.get_mut(player as usize) {
            slot.push(action);
        }
        input
    }
}

/// Advance the game state by one fixed step
pub fn tick(state: &mut GameState, input: &TickInput) {
    if input.pause {
        state.paused = !state.paused;
        log::info!("Simulation {}", if state.paused { "paused" } else { "resumed" });
    }
    if state.paused || state.phase() == ArenaPhase::Over {
        return;
    }

    state.world.time_ticks += 1;
    if state.world.phase == ArenaPhase::Starting && state.world.time_ticks >= state.start_delay {
        log::info!("Fight! (tick {})", state.world.time_ticks);
        state.world.phase = ArenaPhase::Fighting;
    }

    // Input
    for player in 0..2u8 {
        for &action in &input.actions[player as usize] {
            state.with_har(player, |ent, h, world| har::act(ent, h, action, world));
        }
    }
    state.apply_commands();

    // Animation and specialization tick, then motion
    for ent in &mut state.entities {
        ent.tick(&mut state.world);
    }
    for ent in &mut state.entities {
        ent.move_entity(&mut state.world);
    }
    face_opponents(state);

    state.apply_spawns();
    state.apply_destroys();

    // Arena containment
    for ent in &mut state.entities {
        if ent.hard_shape.is_some() {
            collision_handle(ent, &mut state.boundary);
        }
    }

    // Pairwise collisions, each unordered pair once in id order
    let n = state.entities.len();
    for i in 0..n {
        for j in (i + 1)..n {
            if state.entities[i].removed || state.entities[j].removed {
                continue;
            }
            if !entity::can_interact(&state.entities[i], &state.entities[j]) {
                continue;
            }
            let (a, b) = state.entities.split_at_mut(j);
            entity::collide(&mut a[i], &mut b[0], &mut state.world);
        }
    }
    state.apply_spawns();
    state.apply_commands();

    // Animation completion
    for ent in &mut state.entities {
        if ent.finished() && !ent.removed && !ent.on_finished(&mut state.world) {
            ent.removed = true;
        }
    }
    state.apply_commands();
    state.check_match_flow();

    state.entities.retain(|e| !e.removed);
    state.normalize_order();
    for ent in &mut state.entities {
        ent.record_serialization_point();
    }
}

/// Grounded, idle HARs turn toward their opponent
fn face_opponents(state: &mut GameState) {
    let xs = [0u8, 1].map(|p| state.har_entity(p).map(|e| e.pos.x));
    for player in 0..2u8 {
        let (Some(me), Some(them)) = (xs[player as usize], xs[1 - player as usize]) else {
            continue;
        };
        if me == them {
            continue;
        }
        state.with_har(player, |ent, h, _| {
            let idle = matches!(
                h.state,
                HarState::Standing | HarState::Walking | HarState::Crouching
            );
            if idle && !h.executing_move {
                ent.direction = Facing::toward(me, them);
            }
        });
    }
}
