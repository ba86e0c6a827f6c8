//! Animation playback state machine
//!
//! Walks a parsed [`Script`] one tick per `run` call, forwards or backwards,
//! reporting when a new frame is entered so the owner can apply the frame's
//! side effects.

use glam::Vec2;

use super::entity::Facing;
use super::script::{Frame, Script};
use crate::consts::SCREEN_WIDTH;

/// Playback position over a script
#[derive(Debug, Clone, Default)]
pub struct Player {
    script: Script,
    /// Tick that will be shown by the next `run`
    pub current_tick: i32,
    /// Tick shown by the last `run`
    pub previous_tick: i32,
    current_frame: Option<usize>,
    /// Stop once playback passes this frame
    pub end_frame: Option<usize>,
    pub repeat: bool,
    pub reverse: bool,
    pub finished: bool,
    /// Ignore `d` (rewind) tags
    pub disable_rewind: bool,
}

impl Player {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// Replace the script and rewind, keeping no playback flags
    pub fn load(&mut self, script: Script) {
        *self = Self::new(script);
    }

    /// Replace the script and rewind, keeping the repeat/reverse flags
    pub fn reload(&mut self, script: Script) {
        let (repeat, reverse) = (self.repeat, self.reverse);
        self.load(script);
        self.repeat = repeat;
        self.reverse = reverse;
        if reverse {
            self.current_tick = self.total_ticks() as i32 - 1;
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn total_ticks(&self) -> u32 {
        self.script.total_ticks()
    }

    /// Advance one tick. Returns the frame index when a new frame is entered.
    pub fn run(&mut self) -> Option<usize> {
        if self.finished {
            return None;
        }
        let total = self.script.total_ticks() as i32;
        if total == 0 {
            self.finished = true;
            return None;
        }

        if self.current_tick >= total || self.current_tick < 0 {
            if !self.repeat {
                self.finished = true;
                return None;
            }
            self.current_tick = if self.reverse { total - 1 } else { 0 };
            self.current_frame = None;
        }

        let idx = self.script.frame_at(self.current_tick as u32)?;
        if self.end_frame.is_some_and(|end| idx > end) {
            self.finished = true;
            return None;
        }

        let entered = self.current_frame != Some(idx);
        self.current_frame = Some(idx);
        self.previous_tick = self.current_tick;
        self.current_tick += if self.reverse { -1 } else { 1 };
        entered.then_some(idx)
    }

    /// Seek. Negative ticks count back from the end of the script.
    pub fn jump_to_tick(&mut self, tick: i32) {
        let total = self.script.total_ticks() as i32;
        let target = if tick < 0 { total + tick } else { tick };
        self.current_tick = target.clamp(0, total);
        self.current_frame = None;
        self.finished = false;
    }

    /// Force completion
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Index of the frame currently shown
    pub fn current_frame_index(&self) -> Option<usize> {
        self.current_frame
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.and_then(|i| self.script.frame(i))
    }

    /// Showing the final frame of the playback direction
    pub fn is_last_frame(&self) -> bool {
        let frames = self.script.frames().len();
        match self.current_frame {
            Some(i) if self.reverse => i == 0,
            Some(i) => i + 1 == frames,
            None => false,
        }
    }

    /// Read a tag of any frame without touching playback
    pub fn peek_tag(&self, frame: usize, key: &str) -> Option<i32> {
        self.script.frame(frame).and_then(|f| f.get(key))
    }

    /// Tag set on the frame currently shown
    pub fn frame_isset(&self, key: &str) -> bool {
        self.current_frame().is_some_and(|f| f.is_set(key))
    }
}

/// Spawn instruction carried by a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnHint {
    pub id: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub gravity: f32,
    pub flags: i32,
}

/// Sound cue carried by a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundCue {
    pub id: u8,
    pub volume: f32,
    pub pan: f32,
    pub pitch: f32,
}

/// Everything entering a frame asks of its owner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameEffects {
    pub sprite: u8,
    /// Absolute position override
    pub position: Option<Vec2>,
    pub spawn: Option<SpawnHint>,
    pub destroy: Option<u8>,
    pub sound: Option<SoundCue>,
    pub rewind: Option<i32>,
}

impl FrameEffects {
    /// Decode a frame for an owner at `pos`, whose animation started at `origin`
    pub fn from_frame(frame: &Frame, origin: Vec2, pos: Vec2, direction: Facing) -> Self {
        let dir = direction.sign();

        let position = match (frame.get("x="), frame.get("y=")) {
            (None, None) => None,
            (x, y) => Some(Vec2::new(
                x.map_or(pos.x, |x| origin.x + x as f32 * dir),
                y.map_or(pos.y, |y| origin.y + y as f32),
            )),
        };

        let spawn = frame.get("m").map(|id| {
            let base = if frame.is_set("ms") { pos } else { position.unwrap_or(pos) };
            let offset = Vec2::new(
                frame.get("mx").unwrap_or(0) as f32 * dir,
                frame.get("my").unwrap_or(0) as f32,
            );
            SpawnHint {
                id: id.clamp(0, u8::MAX as i32) as u8,
                pos: base + offset,
                vel: Vec2::new(
                    frame.get("vx").unwrap_or(0) as f32 * dir,
                    frame.get("vy").unwrap_or(0) as f32,
                ),
                gravity: frame.get("mg").unwrap_or(0) as f32 / 256.0,
                flags: frame.get("mp").unwrap_or(0),
            }
        });

        let sound = frame.get("s").map(|id| SoundCue {
            id: id.clamp(0, u8::MAX as i32) as u8,
            volume: frame.get("l").map_or(1.0, |l| (l as f32 / 100.0).clamp(0.0, 1.0)),
            pan: frame.get("sb").map_or_else(
                || (pos.x / SCREEN_WIDTH * 2.0 - 1.0).clamp(-1.0, 1.0),
                |p| (p as f32 / 100.0).clamp(-1.0, 1.0),
            ),
            pitch: 1.0 + frame.get("sf").unwrap_or(0) as f32 / 100.0,
        });

        Self {
            sprite: frame.sprite,
            position,
            spawn,
            destroy: frame.get("md").map(|id| id.clamp(0, u8::MAX as i32) as u8),
            sound,
            rewind: frame.get("d"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn player(src: &str) -> Player {
        Player::new(Script::parse(src))
    }

    #[test]
    fn test_run_reports_frame_entries() {
        let mut p = player("A2-B1");
        assert_eq!(p.run(), Some(0));
        assert_eq!(p.run(), None);
        assert_eq!(p.run(), Some(1));
        assert!(!p.finished);
        assert_eq!(p.run(), None);
        assert!(p.finished);
    }

    #[test]
    fn test_finished_is_sticky() {
        let mut p = player("A1");
        p.run();
        p.run();
        assert!(p.finished);
        assert!(p.finished);
        assert_eq!(p.run(), None);
        assert!(p.finished);
    }

    #[test]
    fn test_repeat_loops_and_reenters() {
        let mut p = player("A1-B1");
        p.repeat = true;
        let entered: Vec<_> = (0..5).map(|_| p.run()).collect();
        assert_eq!(entered, vec![Some(0), Some(1), Some(0), Some(1), Some(0)]);
        assert!(!p.finished);
    }

    #[test]
    fn test_reverse_playback() {
        let mut p = player("A1-B1-C1");
        p.reverse = true;
        p.jump_to_tick(-1);
        assert_eq!(p.run(), Some(2));
        assert_eq!(p.run(), Some(1));
        assert_eq!(p.run(), Some(0));
        assert!(p.is_last_frame());
        assert_eq!(p.run(), None);
        assert!(p.finished);
    }

    #[test]
    fn test_jump_to_tick_from_end() {
        let mut p = player("A10-B10-C10");
        p.jump_to_tick(-5);
        assert_eq!(p.current_tick, 25);
        assert_eq!(p.run(), Some(2));
        p.jump_to_tick(12);
        assert_eq!(p.run(), Some(1));
        p.jump_to_tick(-100);
        assert_eq!(p.current_tick, 0);
    }

    #[test]
    fn test_end_frame_stops_early() {
        let mut p = player("A1-B1-C1");
        p.end_frame = Some(1);
        p.run();
        p.run();
        assert!(!p.finished);
        assert_eq!(p.run(), None);
        assert!(p.finished);
    }

    #[test]
    fn test_peek_does_not_move_playback() {
        let mut p = player("k7A2-B2");
        assert_eq!(p.peek_tag(0, "k"), Some(7));
        assert_eq!(p.peek_tag(1, "k"), None);
        assert_eq!(p.current_tick, 0);
        assert_eq!(p.run(), Some(0));
        assert!(p.frame_isset("k"));
    }

    #[test]
    fn test_empty_script_finishes() {
        let mut p = player("");
        assert_eq!(p.run(), None);
        assert!(p.finished);
    }

    #[test]
    fn test_frame_effects_spawn_mirrors_offset() {
        let script = Script::parse("m30mx40my-60vx3A5");
        let frame = script.frame(0).unwrap();
        let fx = FrameEffects::from_frame(frame, Vec2::ZERO, Vec2::new(100.0, 190.0), Facing::Left);
        let spawn = fx.spawn.unwrap();
        assert_eq!(spawn.id, 30);
        assert_relative_eq!(spawn.pos.x, 60.0);
        assert_relative_eq!(spawn.pos.y, 130.0);
        assert_relative_eq!(spawn.vel.x, -3.0);
    }

    #[test]
    fn test_frame_effects_position_and_sound() {
        let script = Script::parse("x=10s4l50A5");
        let frame = script.frame(0).unwrap();
        let origin = Vec2::new(100.0, 190.0);
        let fx = FrameEffects::from_frame(frame, origin, Vec2::new(104.0, 190.0), Facing::Right);
        assert_eq!(fx.position, Some(Vec2::new(110.0, 190.0)));
        let sound = fx.sound.unwrap();
        assert_eq!(sound.id, 4);
        assert_relative_eq!(sound.volume, 0.5);
        assert_relative_eq!(sound.pitch, 1.0);
    }
}
