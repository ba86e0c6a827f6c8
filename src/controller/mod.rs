//! Input sources that drive a HAR
//!
//! Every controller (local player, network peer, replay, AI) produces the
//! same action bitmasks. A [`Match`] polls both controllers before each
//! tick and hands HAR events back to them afterwards.

pub mod ai;

use std::collections::VecDeque;

pub use ai::AiController;

use crate::settings::{ControllerKind, MatchSettings};
use crate::sim::action::Action;
use crate::sim::entity::{Entity, Facing, Specialization};
use crate::sim::har::Har;
use crate::sim::projectile::Projectile;
use crate::sim::state::{ArenaPhase, Fighter, GameEvent, GameState, HarEvent};
use crate::sim::tick::{TickInput, tick};

/// Read-only view of the match from one player's seat
#[derive(Clone, Copy)]
pub struct MatchView<'a> {
    pub state: &'a GameState,
    pub player: u8,
}

impl<'a> MatchView<'a> {
    pub fn new(state: &'a GameState, player: u8) -> Self {
        Self { state, player }
    }

    pub fn is_fighting(&self) -> bool {
        !self.state.paused && self.state.phase() == ArenaPhase::Fighting
    }

    /// Own HAR entity and payload
    pub fn me(&self) -> Option<(&'a Entity, &'a Har)> {
        let ent = self.state.har_entity(self.player)?;
        Some((ent, ent.har()?))
    }

    pub fn opponent(&self) -> Option<(&'a Entity, &'a Har)> {
        let ent = self.state.har_entity(1 - self.player.min(1))?;
        Some((ent, ent.har()?))
    }

    /// Projectiles fired by the opponent
    pub fn incoming(&self) -> impl Iterator<Item = (&'a Entity, &'a Projectile)> + 'a {
        let player = self.player;
        self.state.entities.iter().filter_map(move |e| match &e.spec {
            Specialization::Projectile(p) if p.owner != player => Some((e, p)),
            _ => None,
        })
    }
}

/// Source of actions for one player slot
pub trait Controller {
    /// Actions for the coming tick, applied in order
    fn poll(&mut self, view: &MatchView<'_>) -> Vec<Action>;

    /// Something happened to this controller's HAR
    fn har_event(&mut self, _event: HarEvent, _view: &MatchView<'_>) {}
}

/// Host-fed controller for local, network or replayed input
#[derive(Debug, Clone, Default)]
pub struct QueuedController {
    pending: VecDeque<Action>,
}

impl QueuedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action for the next poll
    pub fn push(&mut self, action: Action) {
        self.pending.push_back(action);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Controller for QueuedController {
    fn poll(&mut self, _view: &MatchView<'_>) -> Vec<Action> {
        self.pending.drain(..).collect()
    }
}

/// A running match: simulation state plus one controller per player
pub struct Match {
    pub state: GameState,
    controllers: [Box<dyn Controller>; 2],
}

impl Match {
    pub fn new(state: GameState, controllers: [Box<dyn Controller>; 2]) -> Self {
        Self { state, controllers }
    }

    /// Build a match from settings; fighters are placed at the usual start marks
    pub fn from_settings(settings: &MatchSettings, fighters: [Fighter; 2]) -> Self {
        let mut state = GameState::new(settings.seed);
        let [f0, f1] = fighters;
        let controllers = [0u8, 1].map(|p| -> Box<dyn Controller> {
            match settings.players[p as usize].controller {
                ControllerKind::Human => Box::new(QueuedController::new()),
                ControllerKind::Ai { difficulty } => {
                    Box::new(AiController::new(p, difficulty, settings.seed))
                }
            }
        });
        state.add_har(0, f0, settings.start_x[0], Facing::Right);
        state.add_har(1, f1, settings.start_x[1], Facing::Left);
        state.set_start_delay(settings.start_delay);
        Self::new(state, controllers)
    }

    pub fn controller_mut(&mut self, player: u8) -> Option<&mut (dyn Controller + 'static)> {
        self.controllers.get_mut(player as usize).map(|c| c.as_mut())
    }

    pub fn is_over(&self) -> bool {
        self.state.phase() == ArenaPhase::Over
    }

    /// Poll, tick, then deliver HAR events. Returns everything that happened.
    pub fn step(&mut self, pause: bool) -> Vec<GameEvent> {
        let mut input = TickInput {
            pause,
            ..Default::default()
        };
        for (player, ctrl) in self.controllers.iter_mut().enumerate() {
            let view = MatchView::new(&self.state, player as u8);
            input.actions[player] = ctrl.poll(&view);
        }

        tick(&mut self.state, &input);

        let events = self.state.drain_events();
        for event in &events {
            if let GameEvent::Har { player, event } = event {
                let view = MatchView::new(&self.state, *player);
                if let Some(ctrl) = self.controllers.get_mut(*player as usize) {
                    ctrl.har_event(*event, &view);
                }
            }
        }
        events
    }

    /// Run until the match is over or `max_ticks` elapse
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_over() {
            self.step(false);
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use crate::sim::action::*;
    use crate::sim::har::HarState;

    fn human_match() -> Match {
        let mut state = GameState::new(9);
        state.add_har(0, sample::fighter().unwrap(), 100.0, Facing::Right);
        state.add_har(1, sample::fighter().unwrap(), 220.0, Facing::Left);
        Match::new(
            state,
            [Box::new(QueuedController::new()), Box::new(QueuedController::new())],
        )
    }

    #[test]
    fn test_queued_controller_drains_per_poll() {
        let state = GameState::new(1);
        let view = MatchView::new(&state, 0);
        let mut c = QueuedController::new();
        c.push(ACT_DOWN);
        c.push(ACT_KICK);
        assert_eq!(c.poll(&view), vec![ACT_DOWN, ACT_KICK]);
        assert!(c.poll(&view).is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn test_view_sides() {
        let m = human_match();
        let view = MatchView::new(&m.state, 1);
        assert_eq!(view.me().unwrap().1.player_id, 1);
        assert_eq!(view.opponent().unwrap().1.player_id, 0);
        assert_eq!(view.incoming().count(), 0);
    }

    #[test]
    fn test_step_feeds_queued_actions() {
        let mut m = human_match();
        let mut q = QueuedController::new();
        q.push(ACT_DOWN);
        m.controllers[0] = Box::new(q);
        m.step(false);
        assert_eq!(m.state.har(0).unwrap().state, HarState::Crouching);
        assert_eq!(m.state.har(1).unwrap().state, HarState::Standing);
    }

    #[test]
    fn test_controller_mut_reaches_installed_controller() {
        let mut m = human_match();
        let mut q = QueuedController::new();
        q.push(ACT_PUNCH);
        m.controllers[1] = Box::new(q);
        let other = GameState::new(1);
        let view = MatchView::new(&other, 1);
        assert_eq!(m.controller_mut(1).unwrap().poll(&view), vec![ACT_PUNCH]);
        assert!(m.controller_mut(0).unwrap().poll(&view).is_empty());
        assert!(m.controller_mut(2).is_none());
    }

    #[test]
    fn test_pause_step_does_not_advance() {
        let mut m = human_match();
        m.step(true);
        m.step(false);
        assert_eq!(m.state.time_ticks(), 0);
        // toggling back resumes within the same step
        m.step(true);
        assert_eq!(m.state.time_ticks(), 1);
    }

    #[test]
    fn test_ai_match_runs_deterministically() {
        let play = || {
            let settings = MatchSettings::default();
            let mut m = Match::from_settings(&settings, [sample::fighter().unwrap(), sample::fighter().unwrap()]);
            m.run(600);
            (
                m.state.time_ticks(),
                m.state.har(0).map(|h| h.health),
                m.state.har(1).map(|h| h.health),
                m.state.har_entity(0).map(|e| e.pos),
            )
        };
        assert_eq!(play(), play());
    }
}
