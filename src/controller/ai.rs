//! Heuristic AI opponent
//!
//! Each tick the AI, in priority order:
//! 1. blocks an attacking opponent within reach,
//! 2. blocks an incoming projectile,
//! 3. keeps typing the move it picked earlier, one input per lag period,
//! 4. sometimes scores every usable move and picks one,
//! 5. otherwise wanders, blocks or jumps on a timer.
//!
//! Outcomes reported through HAR events feed per-move statistics, so moves
//! that land get picked more and moves that get blocked less.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{Controller, MatchView};
use crate::consts::MAX_MOVES;
use crate::sim::action::*;
use crate::sim::entity::{Entity, Facing};
use crate::sim::har::{Har, HarState};
use crate::sim::moves::{Move, MoveCategory};
use crate::sim::state::HarEvent;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 7;

/// Opponent must be this close for an attack to be worth blocking
const BLOCK_HAR_RANGE: f32 = 100.0;
const BLOCK_PROJECTILE_RANGE: f32 = 120.0;
/// Ticks each input of a selected move is held
const INPUT_LAG: u32 = 3;
/// Ticks between idle behaviour changes
const ACT_TIMER: i32 = 30;
const MAX_MOVE_VALUE: i32 = 10;
/// Throws taken before the AI starts keeping its distance
const MAX_TIMES_THROWN: u32 = 3;
/// Projectile hits taken before the AI starts closing in
const MAX_TIMES_SHOT: u32 = 4;
/// 1 in this many idle ticks ends in a jump
const JUMP_CHANCE: u32 = 120;

/// What the AI has learned about one of its moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveStat {
    pub max_hit_dist: Option<i32>,
    pub min_hit_dist: Option<i32>,
    pub value: i32,
    pub attempts: i32,
    pub consecutive: i32,
    /// Distance to the opponent when the move was last picked
    pub last_dist: Option<i32>,
}

impl Default for MoveStat {
    fn default() -> Self {
        Self {
            max_hit_dist: None,
            min_hit_dist: None,
            value: 0,
            attempts: 0,
            consecutive: 0,
            last_dist: None,
        }
    }
}

impl MoveStat {
    fn record_hit(&mut self) {
        if let Some(dist) = self.last_dist {
            self.max_hit_dist = Some(self.max_hit_dist.map_or(dist, |m| m.max(dist)));
            self.min_hit_dist = Some(self.min_hit_dist.map_or(dist, |m| m.min(dist)));
        }
        self.value = (self.value + 1).min(MAX_MOVE_VALUE);
    }

    /// Bonus for being at a distance this move is known to land from
    fn distance_bonus(&self, dist: i32) -> i32 {
        match (self.min_hit_dist, self.max_hit_dist) {
            (Some(min), Some(max)) if dist < max + 5 && dist > min + 5 => 2,
            (Some(_), Some(max)) if dist > max + 10 => -3,
            _ => 0,
        }
    }
}

/// Move the AI is currently typing
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selected {
    id: u8,
    input: Vec<u8>,
    /// Index into `input`, counting down to the final button
    pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Idle {
    Forward,
    Back,
    Stand,
    CrouchBlock,
}

/// Computer opponent
#[derive(Debug, Clone)]
pub struct AiController {
    player: u8,
    difficulty: u8,
    rng: Pcg32,
    act_timer: i32,
    input_lag_timer: u32,
    selected: Option<Selected>,
    last_move_id: Option<u8>,
    stats: Vec<MoveStat>,
    /// Last pick was blocked already
    blocked: bool,
    thrown: u32,
    shot: u32,
}

impl AiController {
    /// AI for a player slot; `difficulty` is clamped to 1..=7
    pub fn new(player: u8, difficulty: u8, match_seed: u64) -> Self {
        let difficulty = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        let seed = match_seed ^ (0x9E37_79B9_7F4A_7C15u64.wrapping_mul(u64::from(player) + 1));
        log::debug!("AI for player {player} at difficulty {difficulty}");
        Self {
            player,
            difficulty,
            rng: Pcg32::seed_from_u64(seed),
            act_timer: 0,
            input_lag_timer: INPUT_LAG,
            selected: None,
            last_move_id: None,
            stats: vec![MoveStat::default(); MAX_MOVES],
            blocked: false,
            thrown: 0,
            shot: 0,
        }
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    pub fn stat(&self, move_id: u8) -> Option<&MoveStat> {
        self.stats.get(move_id as usize)
    }

    /// Id of the move being typed
    pub fn selected_move(&self) -> Option<u8> {
        self.selected.as_ref().map(|s| s.id)
    }

    /// Difficulty check: passes `difficulty² / 49` of the time
    pub fn maybe(&mut self) -> bool {
        let d = u32::from(self.difficulty);
        self.rng.random_range(0..49u32) < d * d
    }

    fn roll(&mut self, n: u32) -> u32 {
        self.rng.random_range(0..n.max(1))
    }

    fn block_har(&mut self, me: &Entity, opp_ent: &Entity, opp: &Har) -> Option<Action> {
        let within = (opp_ent.pos.x - me.pos.x).abs() < BLOCK_HAR_RANGE;
        if !within || !opp.executing_move || !self.maybe() {
            return None;
        }
        let (_, back) = forward_back(me.direction);
        if opp.state == HarState::Crouching {
            Some(ACT_DOWN | back)
        } else {
            Some(back)
        }
    }

    fn block_projectile(&mut self, me: &Entity, view: &MatchView<'_>) -> Option<Action> {
        let near = view
            .incoming()
            .any(|(e, p)| !p.did_hit && (e.pos.x - me.pos.x).abs() < BLOCK_PROJECTILE_RANGE);
        if !near || !(self.maybe() || self.shot >= MAX_TIMES_SHOT) {
            return None;
        }
        let (_, back) = forward_back(me.direction);
        Some(ACT_DOWN | back)
    }

    /// Next button of the selected move. Inputs are typed oldest first.
    fn feed_selected(&mut self, facing: Facing) -> Option<Action> {
        let sel = self.selected.as_mut()?;
        if self.input_lag_timer > 0 {
            self.input_lag_timer -= 1;
        } else {
            sel.pos = sel.pos.saturating_sub(1);
            self.input_lag_timer = INPUT_LAG;
        }
        let token = sel.input.get(sel.pos).copied().unwrap_or(b'5');
        let action = input_to_action(token, facing).unwrap_or(ACT_STOP);
        if sel.pos == 0 {
            self.selected = None;
        }
        Some(action)
    }

    fn score(&mut self, mv: &Move, dist: i32) -> i32 {
        let stat = self.stats[mv.id() as usize];
        let mut value = stat.value + self.roll(10) as i32 + stat.distance_bonus(dist);
        if self.last_move_id == Some(mv.id()) {
            value -= self.roll(10) as i32;
        }
        if self.maybe() {
            value += mv.damage as i32 / 4;
        }
        value - stat.attempts / 2 - stat.consecutive * 2
    }

    /// Score every usable move and start typing the best one
    fn select_move(&mut self, har: &Har, dist: i32) -> bool {
        let character = har.character().clone();
        let mut best: Option<(&Move, i32)> = None;
        for mv in character.moves().filter(|m| is_valid_move(m, har)) {
            let value = self.score(mv, dist);
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((mv, value));
            }
        }
        let Some((mv, value)) = best else {
            return false;
        };

        for stat in &mut self.stats {
            stat.consecutive /= 2;
        }
        let stat = &mut self.stats[mv.id() as usize];
        stat.attempts += 1;
        stat.consecutive += 1;
        stat.last_dist = Some(dist);
        self.blocked = false;
        self.input_lag_timer = INPUT_LAG;
        let input = mv.move_string.as_bytes().to_vec();
        log::debug!(
            "AI {} picks move {} ({}) scoring {value}",
            self.player,
            mv.id(),
            mv.move_string
        );
        self.selected = Some(Selected {
            id: mv.id(),
            pos: input.len().saturating_sub(1),
            input,
        });
        true
    }

    fn idle(&mut self, me: &Entity, har: &Har) -> Vec<Action> {
        let mut out = Vec::new();
        let (fwd, back) = forward_back(me.direction);
        if self.act_timer <= 0 {
            let choice = self.pick_idle(har);
            let action = match choice {
                Idle::Forward => fwd,
                Idle::Back => back,
                Idle::Stand => ACT_STOP,
                Idle::CrouchBlock => ACT_DOWN | back,
            };
            self.act_timer = ACT_TIMER - i32::from(self.difficulty) - self.roll(3) as i32;
            out.push(action);
        }
        if self.roll(JUMP_CHANCE) == 0 {
            let jump = if me.vel.x < 0.0 {
                ACT_UP | ACT_LEFT
            } else if me.vel.x > 0.0 {
                ACT_UP | ACT_RIGHT
            } else {
                ACT_UP
            };
            out.push(jump);
        }
        out
    }

    fn pick_idle(&mut self, har: &Har) -> Idle {
        // thrown too often: keep away; shot too often: close in
        let (fwd, back) = if self.thrown >= MAX_TIMES_THROWN {
            (2, 5)
        } else if self.shot >= MAX_TIMES_SHOT {
            (6, 1)
        } else {
            (4, 2)
        };
        let back = if har.wall_hugging { 0 } else { back };
        let r = self.roll(10);
        if r < fwd {
            Idle::Forward
        } else if r < fwd + back {
            Idle::Back
        } else if r % 2 == 0 {
            Idle::CrouchBlock
        } else {
            Idle::Stand
        }
    }
}

/// Move the AI may start from the HAR's current situation
pub fn is_valid_move(mv: &Move, har: &Har) -> bool {
    let jumping = har.state == HarState::Jumping;
    match mv.category {
        MoveCategory::Close | MoveCategory::Low | MoveCategory::Medium | MoveCategory::High
            if !har.close && !jumping =>
        {
            return false;
        }
        MoveCategory::Scrap if har.state != HarState::Victory => return false,
        MoveCategory::Destruction if har.state != HarState::Scrap => return false,
        MoveCategory::FireIce => return false,
        _ => {}
    }
    if (mv.category == MoveCategory::Jumping) != jumping {
        return false;
    }
    let typeable = mv
        .move_string
        .bytes()
        .all(|c| matches!(c, b'1'..=b'9' | b'K' | b'P'));
    if !typeable || mv.move_string.is_empty() {
        return false;
    }
    mv.damage > 0.0
        || matches!(
            mv.category,
            MoveCategory::Projectile | MoveCategory::Scrap | MoveCategory::Destruction
        )
}

impl Controller for AiController {
    fn poll(&mut self, view: &MatchView<'_>) -> Vec<Action> {
        if !view.is_fighting() {
            self.selected = None;
            return Vec::new();
        }
        let (Some((me, har)), Some((opp_ent, opp))) = (view.me(), view.opponent()) else {
            return Vec::new();
        };
        self.act_timer -= 1;

        if let Some(action) = self.block_har(me, opp_ent, opp) {
            return vec![action];
        }
        if let Some(action) = self.block_projectile(me, view) {
            return vec![action];
        }
        if let Some(action) = self.feed_selected(me.direction) {
            return vec![action];
        }

        let free = matches!(
            har.state,
            HarState::Standing | HarState::Walking | HarState::Crouching
        ) && !har.executing_move;
        if !free {
            return Vec::new();
        }

        let dist = (opp_ent.pos.x - me.pos.x).abs() as i32;
        if self.roll(100) < u32::from(self.difficulty) && self.select_move(har, dist) {
            self.act_timer = ACT_TIMER;
            return Vec::new();
        }
        self.idle(me, har)
    }

    fn har_event(&mut self, event: HarEvent, view: &MatchView<'_>) {
        match event {
            HarEvent::Attack { .. } => self.selected = None,
            HarEvent::LandHit { move_id } => {
                self.selected = None;
                if let Some(stat) = self.stats.get_mut(move_id as usize) {
                    stat.record_hit();
                }
                self.last_move_id = Some(move_id);
            }
            HarEvent::EnemyBlock { move_id } => {
                self.selected = None;
                if !self.blocked {
                    self.blocked = true;
                    if let Some(stat) = self.stats.get_mut(move_id as usize) {
                        stat.value = (stat.value - 1).max(0);
                    }
                    self.last_move_id = Some(move_id);
                }
            }
            HarEvent::TakeHit { move_id } => {
                let category = view
                    .opponent()
                    .and_then(|(_, opp)| opp.character().get_move(move_id).map(|m| m.category));
                match category {
                    Some(MoveCategory::Close) => {
                        self.thrown += 1;
                        if self.thrown == MAX_TIMES_THROWN {
                            log::debug!("AI {} adjusting to repeated throws", self.player);
                        }
                    }
                    Some(MoveCategory::Projectile) => {
                        self.shot += 1;
                        if self.shot == MAX_TIMES_SHOT {
                            log::debug!("AI {} adjusting to repeated projectiles", self.player);
                        }
                    }
                    _ => {}
                }
            }
            HarEvent::Land => self.act_timer = 0,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use crate::sim::state::GameState;
    use std::sync::Arc;

    fn state() -> GameState {
        let mut s = GameState::new(77);
        s.add_har(0, sample::fighter().unwrap(), 100.0, Facing::Right);
        s.add_har(1, sample::fighter().unwrap(), 180.0, Facing::Left);
        s
    }

    fn medium(input: &str) -> Move {
        Move {
            move_string: input.into(),
            category: MoveCategory::Medium,
            damage: 8.0,
            next_move: None,
            successor_id: None,
            scrap_amount: 0,
            footer_string: String::new(),
            animation: Arc::new(crate::sim::animation::Animation::new(40, "A5")),
        }
    }

    fn har() -> Har {
        let f = sample::fighter().unwrap();
        Har::new(0, f.character, f.pilot)
    }

    #[test]
    fn test_maybe_at_top_difficulty_always_passes() {
        let mut ai = AiController::new(0, MAX_DIFFICULTY, 5);
        assert!((0..500).all(|_| ai.maybe()));
    }

    #[test]
    fn test_maybe_tracks_difficulty_squared() {
        let mut ai = AiController::new(0, 3, 5);
        let hits = (0..4900).filter(|_| ai.maybe()).count();
        // 9 / 49 of the time
        assert!((700..1100).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_difficulty_clamped() {
        assert_eq!(AiController::new(1, 0, 1).difficulty(), MIN_DIFFICULTY);
        assert_eq!(AiController::new(1, 12, 1).difficulty(), MAX_DIFFICULTY);
    }

    #[test]
    fn test_close_gate_for_hand_to_hand_moves() {
        let mv = medium("66K");
        let mut h = har();
        h.state = HarState::Walking;
        h.close = false;
        assert!(!is_valid_move(&mv, &h));
        h.close = true;
        assert!(is_valid_move(&mv, &h));
    }

    #[test]
    fn test_move_validity_rules() {
        let mut h = har();
        h.close = true;
        let mut mv = medium("K2");
        mv.damage = 0.0;
        assert!(!is_valid_move(&mv, &h));

        mv.category = MoveCategory::Projectile;
        assert!(is_valid_move(&mv, &h));
        mv.move_string = "PX".into();
        assert!(!is_valid_move(&mv, &h));

        let mut jump_kick = medium("K");
        jump_kick.category = MoveCategory::Jumping;
        assert!(!is_valid_move(&jump_kick, &h));
        h.state = HarState::Jumping;
        assert!(is_valid_move(&jump_kick, &h));
        // airborne, only jumping moves
        assert!(!is_valid_move(&medium("P"), &h));
    }

    #[test]
    fn test_blocks_attacking_opponent() {
        let mut s = state();
        s.with_har(1, |_, h, _| h.executing_move = true);
        let mut ai = AiController::new(0, MAX_DIFFICULTY, 1);
        let view = MatchView::new(&s, 0);
        assert_eq!(ai.poll(&view), vec![ACT_LEFT]);

        s.with_har(1, |_, h, _| h.state = HarState::Crouching);
        let view = MatchView::new(&s, 0);
        assert_eq!(ai.poll(&view), vec![ACT_DOWN | ACT_LEFT]);
    }

    #[test]
    fn test_selected_move_typed_oldest_first() {
        let mut ai = AiController::new(0, 1, 1);
        ai.selected = Some(Selected {
            id: 20,
            input: b"K2".to_vec(),
            pos: 1,
        });
        let mut typed = Vec::new();
        while let Some(a) = ai.feed_selected(Facing::Right) {
            typed.push(a);
        }
        assert_eq!(typed.first(), Some(&ACT_DOWN));
        assert_eq!(typed.last(), Some(&ACT_KICK));
        assert_eq!(typed.len(), INPUT_LAG as usize + 1);
        assert!(ai.selected_move().is_none());
    }

    #[test]
    fn test_idle_while_paused_or_starting() {
        let mut s = state();
        s.paused = true;
        let mut ai = AiController::new(0, MAX_DIFFICULTY, 1);
        ai.selected = Some(Selected {
            id: 20,
            input: b"P".to_vec(),
            pos: 0,
        });
        assert!(ai.poll(&MatchView::new(&s, 0)).is_empty());
        assert!(ai.selected_move().is_none());

        s.paused = false;
        s.set_start_delay(50);
        assert!(ai.poll(&MatchView::new(&s, 0)).is_empty());
    }

    #[test]
    fn test_learning_from_hits_and_blocks() {
        let s = state();
        let view = MatchView::new(&s, 0);
        let mut ai = AiController::new(0, 4, 1);
        ai.stats[sample::MOVE_PUNCH as usize].last_dist = Some(40);

        for _ in 0..15 {
            ai.har_event(HarEvent::LandHit { move_id: sample::MOVE_PUNCH }, &view);
        }
        let stat = *ai.stat(sample::MOVE_PUNCH).unwrap();
        assert_eq!(stat.value, MAX_MOVE_VALUE);
        assert_eq!(stat.max_hit_dist, Some(40));
        assert_eq!(stat.min_hit_dist, Some(40));

        ai.har_event(HarEvent::EnemyBlock { move_id: sample::MOVE_PUNCH }, &view);
        ai.har_event(HarEvent::EnemyBlock { move_id: sample::MOVE_PUNCH }, &view);
        assert_eq!(ai.stat(sample::MOVE_PUNCH).unwrap().value, MAX_MOVE_VALUE - 1);
    }

    #[test]
    fn test_distance_bonus_band() {
        let stat = MoveStat {
            min_hit_dist: Some(30),
            max_hit_dist: Some(50),
            ..Default::default()
        };
        assert_eq!(stat.distance_bonus(40), 2);
        assert_eq!(stat.distance_bonus(54), 2);
        // the band starts five past the closest landed hit
        assert_eq!(stat.distance_bonus(33), 0);
        assert_eq!(stat.distance_bonus(35), 0);
        assert_eq!(stat.distance_bonus(58), 0);
        assert_eq!(stat.distance_bonus(61), -3);
        assert_eq!(MoveStat::default().distance_bonus(40), 0);
    }

    #[test]
    fn test_counts_throws_taken() {
        let s = state();
        let view = MatchView::new(&s, 1);
        let mut ai = AiController::new(1, 4, 1);
        for _ in 0..MAX_TIMES_THROWN {
            ai.har_event(HarEvent::TakeHit { move_id: sample::MOVE_THROW }, &view);
        }
        ai.har_event(HarEvent::TakeHit { move_id: sample::MOVE_PUNCH }, &view);
        assert_eq!(ai.thrown, MAX_TIMES_THROWN);
        assert_eq!(ai.shot, 0);
    }

    #[test]
    fn test_select_move_updates_stats() {
        let s = state();
        let mut ai = AiController::new(0, 4, 3);
        let mut h = s.har(0).unwrap().clone();
        h.close = true;
        assert!(ai.select_move(&h, 40));
        let id = ai.selected_move().unwrap();
        let stat = ai.stat(id).unwrap();
        assert_eq!(stat.attempts, 1);
        assert_eq!(stat.consecutive, 1);
        assert_eq!(stat.last_dist, Some(40));
        let mv = h.character().get_move(id).unwrap();
        assert!(is_valid_move(mv, &h));
    }
}
