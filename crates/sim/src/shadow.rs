//! The shadow: a companion that replays the player's first moves.
//!
//! Once the player has made `memory_steps` moves, the shadow appears and
//! copies that prefix of the player's history into its replay queue. From
//! then on every new player action pops exactly one queued action and hands
//! it to the shadow's own motion state machine. An action the shadow cannot
//! perform (busy, no ladder, no ground) still uses up its slot; the queue is
//! consumed once, in order, one entry per player action.

use crate::config::{ConfigError, ShadowConfig, check_memory_steps};
use crate::motion::{Body, Execution, Facing, MotionKind};
use crate::terrain::Terrain;
use crate::{ActionCode, Vec2};

/// Host-side presentation of the shadow.
pub trait Avatar {
    /// Move the rendered shadow to `position`.
    fn place(&mut self, position: Vec2);

    /// Show and simulate (`true`) or hide and freeze (`false`) the shadow.
    fn set_active(&mut self, active: bool);

    fn face(&mut self, _facing: Facing) {}
}

/// In-memory [`Avatar`] that just remembers what it was told.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Puppet {
    pub position: Vec2,
    pub active: bool,
    pub facing: Facing,
}

impl Avatar for Puppet {
    fn place(&mut self, position: Vec2) {
        self.position = position;
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn face(&mut self, facing: Facing) {
        self.facing = facing;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowState {
    NotSpawned,
    Idle,
    Moving,
    ClimbingUp,
    ClimbingDown,
    Falling,
}

impl ShadowState {
    pub(crate) fn tag(self) -> u64 {
        match self {
            Self::NotSpawned => 0,
            Self::Idle => MotionKind::Idle.tag(),
            Self::Moving => MotionKind::Moving.tag(),
            Self::ClimbingUp => MotionKind::ClimbingUp.tag(),
            Self::ClimbingDown => MotionKind::ClimbingDown.tag(),
            Self::Falling => MotionKind::Falling.tag(),
        }
    }
}

impl From<MotionKind> for ShadowState {
    fn from(kind: MotionKind) -> Self {
        match kind {
            MotionKind::Idle => Self::Idle,
            MotionKind::Moving => Self::Moving,
            MotionKind::ClimbingUp => Self::ClimbingUp,
            MotionKind::ClimbingDown => Self::ClimbingDown,
            MotionKind::Falling => Self::Falling,
        }
    }
}

/// One consumed replay queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStep {
    /// Queue index the action was taken from.
    pub index: usize,
    pub action: ActionCode,
    pub execution: Execution,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSnapshot {
    pub state: ShadowState,
    pub position: Vec2,
    pub facing: Facing,
    pub visible: bool,
    pub cursor: usize,
    pub queue_len: usize,
    pub vertical_velocity: f64,
}

#[derive(Debug, Clone)]
pub struct Shadow<A: Avatar = Puppet> {
    memory_steps: usize,
    spawn_point: Option<Vec2>,
    spawn_offset: Vec2,
    body: Body,
    avatar: A,
    spawned: bool,
    queue: Vec<ActionCode>,
    cursor: usize,
    warned_no_spawn: bool,
}

impl Shadow<Puppet> {
    pub fn new(config: &ShadowConfig) -> Self {
        Self::with_avatar(config, Puppet::default())
    }
}

impl<A: Avatar> Shadow<A> {
    pub fn with_avatar(config: &ShadowConfig, mut avatar: A) -> Self {
        let home = config
            .spawn_point
            .map(|point| offset(point, config.spawn_offset))
            .unwrap_or_default();
        avatar.place(home);
        avatar.set_active(false);

        Self {
            memory_steps: config.memory_steps,
            spawn_point: config.spawn_point,
            spawn_offset: config.spawn_offset,
            body: Body::new(config.motion.clone(), home),
            avatar,
            spawned: false,
            queue: Vec::new(),
            cursor: 0,
            warned_no_spawn: false,
        }
    }

    pub fn state(&self) -> ShadowState {
        if self.spawned {
            self.body.state().kind().into()
        } else {
            ShadowState::NotSpawned
        }
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn memory_steps(&self) -> usize {
        self.memory_steps
    }

    /// Change the replay length. Only a future spawn sees the new value.
    /// Zero is refused.
    pub fn set_memory_steps(&mut self, steps: usize) -> Result<(), ConfigError> {
        check_memory_steps(steps)?;
        tracing::debug!(steps, spawned = self.spawned, "memory steps changed");
        self.memory_steps = steps;
        Ok(())
    }

    pub fn queue(&self) -> &[ActionCode] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Queue entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len() - self.cursor
    }

    pub fn position(&self) -> Vec2 {
        self.body.position()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn avatar(&self) -> &A {
        &self.avatar
    }

    pub fn snapshot(&self) -> ShadowSnapshot {
        ShadowSnapshot {
            state: self.state(),
            position: self.body.position(),
            facing: self.body.facing(),
            visible: self.spawned,
            cursor: self.cursor,
            queue_len: self.queue.len(),
            vertical_velocity: self.body.vertical_velocity(),
        }
    }

    /// Spawn once `history` holds at least `memory_steps` actions.
    ///
    /// The shadow appears at its spawn point, or at `player_position` when no
    /// spawn point is configured. Returns whether it spawned on this call.
    pub fn try_spawn(&mut self, history: &[ActionCode], player_position: Option<Vec2>) -> bool {
        if self.spawned || history.len() < self.memory_steps {
            return false;
        }

        let Some(anchor) = self.spawn_point.or(player_position) else {
            if !self.warned_no_spawn {
                tracing::warn!("shadow has neither a spawn point nor a player position; not spawning");
                self.warned_no_spawn = true;
            }
            return false;
        };
        let position = offset(anchor, self.spawn_offset);

        self.queue = history[..self.memory_steps.min(history.len())].to_vec();
        self.cursor = 0;
        self.spawned = true;
        self.body.place(position);
        self.avatar.place(position);
        self.avatar.set_active(true);

        tracing::info!(
            ?position,
            memory_steps = self.memory_steps,
            queue_len = self.queue.len(),
            "shadow spawned"
        );
        true
    }

    /// Lockstep replay: consume one queued action for one player action.
    ///
    /// Returns `None` when the shadow is not spawned or the queue is spent.
    pub fn on_player_action<T: Terrain>(
        &mut self,
        player_action: ActionCode,
        terrain: &T,
    ) -> Option<ReplayStep> {
        if !self.spawned {
            return None;
        }
        let Some(&action) = self.queue.get(self.cursor) else {
            tracing::debug!(%player_action, "shadow replay queue exhausted");
            return None;
        };

        let index = self.cursor;
        let execution = self.body.request(action, terrain);
        self.cursor += 1;

        match execution {
            Execution::Executed => {
                if action.direction().is_some() {
                    self.avatar.face(self.body.facing());
                }
                tracing::debug!(index, %action, %player_action, "shadow replayed action");
            }
            Execution::Dropped(reason) => {
                tracing::debug!(
                    index,
                    %action,
                    %player_action,
                    reason = reason.as_str(),
                    "shadow skipped action"
                );
            }
        }

        Some(ReplayStep {
            index,
            action,
            execution,
        })
    }

    /// Ground probe for this tick.
    pub fn sense<T: Terrain>(&mut self, terrain: &T) {
        if self.spawned {
            self.body.sense(terrain);
        }
    }

    /// Advance interpolation and gravity by `dt` and sync the avatar.
    pub fn tick<T: Terrain>(&mut self, dt: f64, terrain: &T) {
        if !self.spawned {
            return;
        }
        self.body.update(dt, terrain);
        self.body.apply_gravity(dt);
        self.avatar.place(self.body.position());
    }

    /// Back to NotSpawned: hidden, at the spawn point, empty queue.
    ///
    /// Safe at any tick; an in-flight step, climb or fall is discarded.
    pub fn reset(&mut self) {
        self.spawned = false;
        self.queue.clear();
        self.cursor = 0;

        let position = match self.spawn_point {
            Some(point) => offset(point, self.spawn_offset),
            None => self.body.position(),
        };
        self.body.place(position);
        self.avatar.place(position);
        self.avatar.set_active(false);

        tracing::info!(?position, "shadow reset");
    }
}

fn offset(point: Vec2, by: Vec2) -> Vec2 {
    [point[0] + by[0], point[1] + by[1]]
}
