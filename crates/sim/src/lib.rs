//! Split Self Simulation Core
//!
//! Deterministic, fixed-timestep simulation of one Split Self level attempt:
//! the player's discrete moves, the recorder that remembers them, and the
//! shadow that appears after `memory_steps` moves and replays that prefix in
//! lockstep with the player's later actions.
//!
//! # Constraints
//!
//! The simulation core does no I/O of its own, never reads the wall clock
//! and has no randomness. Level geometry reaches it only through the
//! [`Terrain`] probes and the rendered shadow only through [`Avatar`], so a
//! host engine, a headless test or a replay verifier all drive the same code.
//! [`LevelConfig::load`] is the one exception and runs before the first tick.
//!
//! # Tick order
//!
//! [`Level::advance`] runs ground probes, input dispatch, interpolation,
//! gravity, the shadow spawn check and the exit check, in that order, once
//! per tick at [`LevelConfig::tick_rate_hz`].

#![deny(unsafe_code)]

mod action;
mod config;
mod digest;
mod level;
mod motion;
mod recorder;
mod shadow;
mod terrain;

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation timestep.
pub type Tick = u64;

/// World-space position or offset, `[x, y]`.
pub type Vec2 = [f64; 2];

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{ActionCode, InputFrame, UnknownActionCode};
pub use config::{
    ConfigError, ExitConfig, LevelConfig, MEMORY_STEPS, MotionConfig, ShadowConfig, TICK_RATE_HZ,
};
pub use digest::STATE_DIGEST_ALGO_ID;
pub use level::{Level, LevelOutcome, LevelSnapshot};
pub use motion::{
    Body, BodySnapshot, DropReason, Execution, Facing, MotionKind, MotionState, Transition,
};
pub use recorder::InputRecorder;
pub use shadow::{Avatar, Puppet, ReplayStep, Shadow, ShadowSnapshot, ShadowState};
pub use terrain::{Block, BlockKind, BlockTerrain, Terrain};
