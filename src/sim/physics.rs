//! Free-form physics for spawned debris and projectiles
//!
//! A small position/velocity integrator with gravity, friction, bounce and a
//! vertical-state machine. Callers observe contacts through [`PhysicsHooks`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::snap_zero;

/// Vertical motion sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalState {
    #[default]
    None,
    Jump,
    Crouch,
    Recoil,
}

impl VerticalState {
    /// Grounded states accept move/crouch/jump commands
    #[inline]
    pub fn is_grounded(self) -> bool {
        matches!(self, VerticalState::None | VerticalState::Crouch)
    }
}

/// Which bound was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
    Ceiling,
}

/// Axis-aligned limits the body is kept inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub floor: f32,
    pub ceiling: f32,
    pub wall_left: f32,
    pub wall_right: f32,
}

impl Bounds {
    /// The standard arena box
    pub fn arena() -> Self {
        use crate::consts::*;
        Self {
            floor: ARENA_FLOOR,
            ceiling: ARENA_CEILING,
            wall_left: ARENA_LEFT_WALL,
            wall_right: ARENA_RIGHT_WALL,
        }
    }
}

/// Contact and motion notifications.
///
/// All methods default to no-ops so implementors only override what they
/// care about.
pub trait PhysicsHooks {
    fn wall_hit(&mut self, _side: WallSide, _vstate: VerticalState) {}
    fn floor_hit(&mut self, _vstate: VerticalState) {}
    fn fall(&mut self) {}
    fn moved(&mut self) {}
    fn stopped(&mut self) {}
}

impl PhysicsHooks for () {}

/// Position/velocity integrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    pub pos: Vec2,
    pub spd: Vec2,
    pub bounds: Bounds,
    pub gravity: f32,
    /// Fraction of horizontal speed removed per tick (0..1)
    pub friction: f32,
    /// Fraction of speed kept after hitting a bound (0..1)
    pub bounciness: f32,
    pub vstate: VerticalState,
}

impl PhysicsState {
    pub fn init(
        pos: Vec2,
        spd: Vec2,
        bounds: Bounds,
        gravity: f32,
        friction: f32,
        bounciness: f32,
    ) -> Self {
        let vstate = if pos.y < bounds.floor {
            VerticalState::Jump
        } else {
            VerticalState::None
        };
        Self {
            pos,
            spd,
            bounds,
            gravity,
            friction,
            bounciness,
            vstate,
        }
    }

    /// True while gravity applies
    #[inline]
    pub fn is_airborne(&self) -> bool {
        matches!(self.vstate, VerticalState::Jump | VerticalState::Recoil)
            || self.pos.y < self.bounds.floor
    }

    /// Advance one tick
    pub fn tick<H: PhysicsHooks>(&mut self, hooks: &mut H) {
        self.spd.x *= 1.0 - self.friction;
        self.pos += self.spd;

        let b = self.bounds;
        if self.pos.x < b.wall_left {
            self.pos.x = b.wall_left;
            self.spd.x = -self.spd.x * self.bounciness;
            hooks.wall_hit(WallSide::Left, self.vstate);
        } else if self.pos.x > b.wall_right {
            self.pos.x = b.wall_right;
            self.spd.x = -self.spd.x * self.bounciness;
            hooks.wall_hit(WallSide::Right, self.vstate);
        }

        if self.pos.y < b.ceiling {
            self.pos.y = b.ceiling;
            self.spd.y = -self.spd.y * self.bounciness;
            hooks.wall_hit(WallSide::Ceiling, self.vstate);
        }

        if self.pos.y >= b.floor && self.spd.y >= 0.0 && self.is_airborne_or_falling() {
            self.pos.y = b.floor;
            let vstate = self.vstate;
            self.spd.y = -self.spd.y * self.bounciness;
            if snap_zero(self.spd.y) == 0.0 {
                self.spd.y = 0.0;
                self.vstate = VerticalState::None;
            }
            hooks.floor_hit(vstate);
        } else if self.is_airborne() {
            let before = self.spd.y;
            self.spd.y += self.gravity;
            if before < 0.0 && self.spd.y >= 0.0 {
                hooks.fall();
            }
        }

        self.spd.x = snap_zero(self.spd.x);
        self.spd.y = snap_zero(self.spd.y);
    }

    fn is_airborne_or_falling(&self) -> bool {
        self.is_airborne() || self.spd.y > 0.0
    }

    /// Start a jump; only from a grounded state
    pub fn jump(&mut self, spd_y: f32) {
        if self.vstate.is_grounded() {
            self.spd.y = spd_y;
            self.vstate = VerticalState::Jump;
        }
    }

    /// Knockback; always applies
    pub fn recoil(&mut self, spd_x: f32, spd_y: f32) {
        self.spd = Vec2::new(spd_x, spd_y);
        self.vstate = VerticalState::Recoil;
    }

    /// Set horizontal speed while grounded
    pub fn move_x<H: PhysicsHooks>(&mut self, spd_x: f32, hooks: &mut H) {
        if !self.vstate.is_grounded() {
            return;
        }
        let was_moving = self.spd.x != 0.0;
        self.spd.x = spd_x;
        self.vstate = VerticalState::None;
        match (was_moving, spd_x != 0.0) {
            (false, true) => hooks.moved(),
            (true, false) => hooks.stopped(),
            _ => {}
        }
    }

    /// Enter crouch while grounded
    pub fn crouch(&mut self) {
        if self.vstate.is_grounded() {
            self.vstate = VerticalState::Crouch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        walls: Vec<WallSide>,
        floors: u32,
        falls: u32,
        moves: u32,
        stops: u32,
    }

    impl PhysicsHooks for Recorder {
        fn wall_hit(&mut self, side: WallSide, _vstate: VerticalState) {
            self.walls.push(side);
        }
        fn floor_hit(&mut self, _vstate: VerticalState) {
            self.floors += 1;
        }
        fn fall(&mut self) {
            self.falls += 1;
        }
        fn moved(&mut self) {
            self.moves += 1;
        }
        fn stopped(&mut self) {
            self.stops += 1;
        }
    }

    fn grounded() -> PhysicsState {
        PhysicsState::init(
            Vec2::new(100.0, 190.0),
            Vec2::ZERO,
            Bounds::arena(),
            0.5,
            0.0,
            0.0,
        )
    }

    #[test]
    fn test_jump_from_crouch_then_again_is_noop() {
        let mut p = grounded();
        p.crouch();
        assert_eq!(p.vstate, VerticalState::Crouch);

        p.jump(-5.0);
        assert_eq!(p.vstate, VerticalState::Jump);
        assert_relative_eq!(p.spd.y, -5.0);

        p.jump(-9.0);
        assert_eq!(p.vstate, VerticalState::Jump);
        assert_relative_eq!(p.spd.y, -5.0);
    }

    #[test]
    fn test_jump_arc_fires_fall_and_lands() {
        let mut p = grounded();
        let mut rec = Recorder::default();
        p.jump(-5.0);
        for _ in 0..60 {
            p.tick(&mut rec);
        }
        assert_eq!(rec.falls, 1);
        assert_eq!(rec.floors, 1);
        assert_eq!(p.vstate, VerticalState::None);
        assert_relative_eq!(p.pos.y, 190.0);
        assert_eq!(p.spd.y, 0.0);
    }

    #[test]
    fn test_recoil_overrides_state() {
        let mut p = grounded();
        p.jump(-4.0);
        p.recoil(-3.0, -6.0);
        assert_eq!(p.vstate, VerticalState::Recoil);
        assert_eq!(p.spd, Vec2::new(-3.0, -6.0));
    }

    #[test]
    fn test_move_only_when_grounded_and_clears_crouch() {
        let mut p = grounded();
        let mut rec = Recorder::default();
        p.crouch();
        p.move_x(2.0, &mut rec);
        assert_eq!(p.vstate, VerticalState::None);
        assert_eq!(rec.moves, 1);

        p.move_x(0.0, &mut rec);
        assert_eq!(rec.stops, 1);

        p.jump(-5.0);
        p.move_x(3.0, &mut rec);
        assert_eq!(p.spd.x, 0.0);
        assert_eq!(rec.moves, 1);
    }

    #[test]
    fn test_crouch_ignored_in_air() {
        let mut p = grounded();
        p.jump(-5.0);
        p.crouch();
        assert_eq!(p.vstate, VerticalState::Jump);
    }

    #[test]
    fn test_wall_bounce_reports_side() {
        let mut p = PhysicsState::init(
            Vec2::new(300.0, 190.0),
            Vec2::new(10.0, 0.0),
            Bounds::arena(),
            0.5,
            0.0,
            0.5,
        );
        let mut rec = Recorder::default();
        p.tick(&mut rec);
        assert_eq!(rec.walls, vec![WallSide::Right]);
        assert_relative_eq!(p.pos.x, 305.0);
        assert_relative_eq!(p.spd.x, -5.0);
    }

    #[test]
    fn test_friction_and_snap() {
        let mut p = grounded();
        p.friction = 0.5;
        p.spd.x = 0.3;
        p.tick(&mut ());
        // 0.3 -> 0.15 after friction, then kept
        assert_relative_eq!(p.spd.x, 0.15);
        p.tick(&mut ());
        assert_eq!(p.spd.x, 0.0);
    }
}
