//! Level tuning.
//!
//! Every field has a default taken from the shipped level scripts, so a TOML
//! file only needs to name what it overrides:
//!
//! ```toml
//! tick_rate_hz = 60
//!
//! [shadow]
//! memory_steps = 3
//! spawn_point = [0.0, 0.5]
//!
//! [shadow.motion]
//! step_distance = 2.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Vec2;

/// Default simulation rate in Hz.
pub const TICK_RATE_HZ: u32 = 60;

/// Default number of recorded actions the shadow replays.
pub const MEMORY_STEPS: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tuning of one motion state machine (player or shadow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Horizontal distance covered by one step.
    pub step_distance: f64,
    /// Seconds one step takes.
    pub step_duration: f64,
    /// Vertical distance covered by one climb up.
    pub climb_distance: f64,
    pub climb_duration: f64,
    /// Extra displacement applied to the climb-up target.
    pub climb_offset: Vec2,
    /// Vertical distance covered by one climb down.
    pub descend_distance: f64,
    pub descend_duration: f64,
    /// Downward acceleration while falling (units/s²).
    pub gravity: f64,
    /// Magnitude cap on the falling speed (units/s).
    pub max_fall_speed: f64,
    /// Ground probe origin relative to the body position.
    pub ground_probe_offset: Vec2,
    /// Downward reach of the ground probe.
    pub ground_probe_distance: f64,
    /// Lateral reach of the ladder probe, applied on both sides.
    pub ladder_reach: f64,
    /// Reject steps whose target lies inside a wall.
    pub wall_check: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_distance: 4.0,
            step_duration: 0.2,
            climb_distance: 2.0,
            climb_duration: 0.5,
            climb_offset: [0.0, 0.0],
            descend_distance: 2.0,
            descend_duration: 0.5,
            gravity: 9.8,
            max_fall_speed: 10.0,
            ground_probe_offset: [0.0, -0.5],
            ground_probe_distance: 0.3,
            ladder_reach: 1.0,
            wall_check: false,
        }
    }
}

impl MotionConfig {
    /// Player defaults: same tuning as the shadow, but steps respect walls.
    pub fn player() -> Self {
        Self {
            wall_check: true,
            ..Self::default()
        }
    }

    fn validate(&self, prefix: &'static str) -> Result<(), ConfigError> {
        positive(prefix, "step_duration", self.step_duration)?;
        positive(prefix, "climb_duration", self.climb_duration)?;
        positive(prefix, "descend_duration", self.descend_duration)?;
        non_negative(prefix, "step_distance", self.step_distance)?;
        non_negative(prefix, "climb_distance", self.climb_distance)?;
        non_negative(prefix, "descend_distance", self.descend_distance)?;
        non_negative(prefix, "gravity", self.gravity)?;
        non_negative(prefix, "max_fall_speed", self.max_fall_speed)?;
        non_negative(prefix, "ground_probe_distance", self.ground_probe_distance)?;
        non_negative(prefix, "ladder_reach", self.ladder_reach)?;
        finite_vec(prefix, "climb_offset", self.climb_offset)?;
        finite_vec(prefix, "ground_probe_offset", self.ground_probe_offset)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Length of the recorded prefix the shadow replays.
    pub memory_steps: usize,
    /// Where the shadow appears; falls back to the player position when unset.
    pub spawn_point: Option<Vec2>,
    pub spawn_offset: Vec2,
    pub motion: MotionConfig,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            memory_steps: MEMORY_STEPS,
            spawn_point: None,
            spawn_offset: [0.0, 0.0],
            motion: MotionConfig::default(),
        }
    }
}

impl ShadowConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_memory_steps(self.memory_steps)?;
        if let Some(point) = self.spawn_point {
            finite_vec("shadow", "spawn_point", point)?;
        }
        finite_vec("shadow", "spawn_offset", self.spawn_offset)?;
        self.motion.validate("shadow.motion")
    }
}

/// A shadow replays at least one action.
pub(crate) fn check_memory_steps(steps: usize) -> Result<(), ConfigError> {
    if steps == 0 {
        return Err(ConfigError::Invalid {
            field: "memory_steps",
            reason: "shadow.memory_steps must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Exit pad behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Downward reach of the probe from the shadow position.
    pub probe_distance: f64,
    /// Seconds between the shadow touching the pad and the level completing.
    pub delay: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            probe_distance: 1.0,
            delay: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub tick_rate_hz: u32,
    pub player_start: Vec2,
    pub player: MotionConfig,
    pub shadow: ShadowConfig,
    pub exit: ExitConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            player_start: [0.0, 0.5],
            player: MotionConfig::player(),
            shadow: ShadowConfig::default(),
            exit: ExitConfig::default(),
        }
    }
}

impl LevelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Seconds per tick.
    pub fn dt_seconds(&self) -> f64 {
        1.0 / f64::from(self.tick_rate_hz)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate_hz",
                reason: "must be positive".to_string(),
            });
        }
        finite_vec("level", "player_start", self.player_start)?;
        self.player.validate("player")?;
        self.shadow.validate()?;
        non_negative("exit", "probe_distance", self.exit.probe_distance)?;
        non_negative("exit", "delay", self.exit.delay)?;
        Ok(())
    }

    /// Flat `(key, value)` view of every numeric tuning parameter, in a fixed
    /// order. Recorded with attempts so a replay can detect retuning.
    pub fn tuning_parameters(&self) -> Vec<(String, f64)> {
        let mut params = vec![
            ("tick_rate_hz".to_string(), f64::from(self.tick_rate_hz)),
            ("player_start.x".to_string(), self.player_start[0]),
            ("player_start.y".to_string(), self.player_start[1]),
            ("shadow.memory_steps".to_string(), self.shadow.memory_steps as f64),
            ("shadow.spawn_offset.x".to_string(), self.shadow.spawn_offset[0]),
            ("shadow.spawn_offset.y".to_string(), self.shadow.spawn_offset[1]),
            ("exit.probe_distance".to_string(), self.exit.probe_distance),
            ("exit.delay".to_string(), self.exit.delay),
        ];
        if let Some(point) = self.shadow.spawn_point {
            params.push(("shadow.spawn_point.x".to_string(), point[0]));
            params.push(("shadow.spawn_point.y".to_string(), point[1]));
        }
        push_motion(&mut params, "player", &self.player);
        push_motion(&mut params, "shadow.motion", &self.shadow.motion);
        params
    }
}

fn push_motion(params: &mut Vec<(String, f64)>, prefix: &str, motion: &MotionConfig) {
    let fields = [
        ("step_distance", motion.step_distance),
        ("step_duration", motion.step_duration),
        ("climb_distance", motion.climb_distance),
        ("climb_duration", motion.climb_duration),
        ("climb_offset.x", motion.climb_offset[0]),
        ("climb_offset.y", motion.climb_offset[1]),
        ("descend_distance", motion.descend_distance),
        ("descend_duration", motion.descend_duration),
        ("gravity", motion.gravity),
        ("max_fall_speed", motion.max_fall_speed),
        ("ground_probe_offset.x", motion.ground_probe_offset[0]),
        ("ground_probe_offset.y", motion.ground_probe_offset[1]),
        ("ground_probe_distance", motion.ground_probe_distance),
        ("ladder_reach", motion.ladder_reach),
        ("wall_check", if motion.wall_check { 1.0 } else { 0.0 }),
    ];
    params.extend(
        fields
            .into_iter()
            .map(|(key, value)| (format!("{prefix}.{key}"), value)),
    );
}

fn positive(section: &'static str, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{section}.{field} must be a positive number, got {value}"),
        })
    }
}

fn non_negative(
    section: &'static str,
    field: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{section}.{field} must be a non-negative number, got {value}"),
        })
    }
}

fn finite_vec(section: &'static str, field: &'static str, value: Vec2) -> Result<(), ConfigError> {
    if value.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{section}.{field} must be finite, got {value:?}"),
        })
    }
}
