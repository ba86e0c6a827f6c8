//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod action;
pub mod animation;
pub mod collision;
pub mod entity;
pub mod har;
pub mod hazard;
pub mod hitpoint;
pub mod moves;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod scrap;
pub mod script;
pub mod shape;
pub mod state;
pub mod tick;

pub use action::Action;
pub use animation::{Animation, CollisionCoord, Sprite};
pub use entity::{Entity, EntityId, EntitySnapshot, Facing, Specialization};
pub use har::{Har, HarState, PilotStats};
pub use hazard::{HazardInfo, SceneData};
pub use moves::{CharacterData, Move, MoveCategory};
pub use state::{ArenaPhase, Fighter, GameEvent, GameState, HarEvent, World};
pub use tick::{TickInput, tick};
