//! One level attempt: player, recorder, shadow and exit pad on a fixed tick.

use crate::config::{ConfigError, ExitConfig, LevelConfig};
use crate::digest::Fnv1a64;
use crate::motion::{Body, BodySnapshot, Execution, Facing};
use crate::recorder::InputRecorder;
use crate::shadow::{Avatar, Puppet, ReplayStep, Shadow, ShadowSnapshot};
use crate::terrain::Terrain;
use crate::{ActionCode, InputFrame, Tick};

/// Progress towards finishing the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelOutcome {
    Playing,
    /// The shadow reached the exit pad; the level completes at `completes_at`.
    Exiting { completes_at: Tick },
    Completed,
}

impl LevelOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Exiting { .. } => "exiting",
            Self::Completed => "completed",
        }
    }

    fn tag(&self) -> u64 {
        match self {
            Self::Playing => 0,
            Self::Exiting { .. } => 1,
            Self::Completed => 2,
        }
    }
}

/// Level state after a step.
///
/// `player_execution` and `replay` describe what the step's input did; both
/// are `None` for [`Level::snapshot`] and for steps without input.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSnapshot {
    pub tick: Tick,
    pub player: BodySnapshot,
    pub shadow: ShadowSnapshot,
    /// Actions recorded since the last reset.
    pub steps: usize,
    pub action: Option<ActionCode>,
    pub player_execution: Option<Execution>,
    pub replay: Option<ReplayStep>,
    pub outcome: LevelOutcome,
    pub digest: u64,
}

/// A level attempt advanced one fixed tick at a time.
///
/// Each [`Level::advance`] runs, in order: ground probes, input dispatch
/// (record, drive the player, forward to the shadow), step/climb
/// interpolation, gravity, the shadow spawn check and the exit check.
#[derive(Debug)]
pub struct Level<T: Terrain, A: Avatar = Puppet> {
    config: LevelConfig,
    terrain: T,
    tick: Tick,
    dt_seconds: f64,
    player: Body,
    recorder: InputRecorder,
    shadow: Shadow<A>,
    outcome: LevelOutcome,
}

impl<T: Terrain> Level<T, Puppet> {
    pub fn new(config: LevelConfig, terrain: T) -> Result<Self, ConfigError> {
        Self::with_avatar(config, terrain, Puppet::default())
    }
}

impl<T: Terrain, A: Avatar> Level<T, A> {
    /// Create a level at tick 0 with the player at its start position.
    pub fn with_avatar(config: LevelConfig, terrain: T, avatar: A) -> Result<Self, ConfigError> {
        config.validate()?;

        let player = Body::new(config.player.clone(), config.player_start);
        let shadow = Shadow::with_avatar(&config.shadow, avatar);

        Ok(Self {
            dt_seconds: config.dt_seconds(),
            config,
            terrain,
            tick: 0,
            player,
            recorder: InputRecorder::new(),
            shadow,
            outcome: LevelOutcome::Playing,
        })
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn terrain(&self) -> &T {
        &self.terrain
    }

    pub fn player(&self) -> &Body {
        &self.player
    }

    pub fn recorder(&self) -> &InputRecorder {
        &self.recorder
    }

    pub fn shadow(&self) -> &Shadow<A> {
        &self.shadow
    }

    pub fn outcome(&self) -> LevelOutcome {
        self.outcome
    }

    /// Change the shadow's replay length for its next spawn. Zero is refused
    /// and leaves the level unchanged.
    pub fn set_memory_steps(&mut self, steps: usize) -> Result<(), ConfigError> {
        self.shadow.set_memory_steps(steps)?;
        self.config.shadow.memory_steps = steps;
        Ok(())
    }

    /// Current state without stepping.
    pub fn snapshot(&self) -> LevelSnapshot {
        self.build_snapshot(None, None, None)
    }

    /// Advance from `tick` to `tick + 1`.
    ///
    /// # Panics
    /// If `tick != self.tick()`.
    pub fn advance(&mut self, tick: Tick, frame: &InputFrame) -> LevelSnapshot {
        assert_eq!(
            tick, self.tick,
            "advance() tick mismatch: expected {}, got {}",
            self.tick, tick
        );

        self.player.sense(&self.terrain);
        self.shadow.sense(&self.terrain);

        let action = frame.action();
        let mut player_execution = None;
        let mut replay = None;
        if let Some(action) = action {
            self.recorder.record(action);
            let execution = self.player.request(action, &self.terrain);
            if let Execution::Dropped(reason) = execution {
                tracing::debug!(tick, %action, reason = reason.as_str(), "player action not executed");
            }
            player_execution = Some(execution);
            replay = self.shadow.on_player_action(action, &self.terrain);
        }

        self.player.update(self.dt_seconds, &self.terrain);
        self.player.apply_gravity(self.dt_seconds);
        self.shadow.tick(self.dt_seconds, &self.terrain);

        self.shadow
            .try_spawn(self.recorder.history(), Some(self.player.position()));

        self.tick += 1;
        self.check_exit();

        self.build_snapshot(action, player_execution, replay)
    }

    /// Restart the attempt: player back at the start, history cleared,
    /// shadow hidden at its spawn point. The tick count keeps running.
    pub fn reset(&mut self) {
        self.player.place(self.config.player_start);
        self.recorder.clear();
        self.shadow.reset();
        self.outcome = LevelOutcome::Playing;
        tracing::info!(tick = self.tick, "level reset");
    }

    /// FNV-1a digest of the observable level state.
    pub fn state_digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();
        hasher.write_u64(self.tick);

        let player = self.player.snapshot();
        hasher.write_u64(player.motion.tag());
        hasher.write_u64(facing_tag(player.facing));
        hasher.write_vec2(player.position);
        hasher.write_f64(player.vertical_velocity);

        let shadow = self.shadow.snapshot();
        hasher.write_u64(shadow.state.tag());
        hasher.write_u64(facing_tag(shadow.facing));
        hasher.write_vec2(shadow.position);
        hasher.write_f64(shadow.vertical_velocity);
        hasher.write_u64(shadow.cursor as u64);
        hasher.write_u64(shadow.queue_len as u64);

        hasher.write_u64(self.recorder.steps() as u64);
        hasher.write_u64(self.outcome.tag());
        if let LevelOutcome::Exiting { completes_at } = self.outcome {
            hasher.write_u64(completes_at);
        }

        hasher.finish()
    }

    // ========================================================================
    // Internal Methods
    // ========================================================================

    fn check_exit(&mut self) {
        if self.outcome == LevelOutcome::Playing
            && self.shadow.is_spawned()
            && self
                .terrain
                .exit_within(self.shadow.position(), self.config.exit.probe_distance)
        {
            let completes_at = self.tick + delay_ticks(&self.config.exit, self.config.tick_rate_hz);
            tracing::info!(tick = self.tick, completes_at, "shadow reached the exit");
            self.outcome = LevelOutcome::Exiting { completes_at };
        }

        if let LevelOutcome::Exiting { completes_at } = self.outcome
            && self.tick >= completes_at
        {
            tracing::info!(tick = self.tick, "level completed");
            self.outcome = LevelOutcome::Completed;
        }
    }

    fn build_snapshot(
        &self,
        action: Option<ActionCode>,
        player_execution: Option<Execution>,
        replay: Option<ReplayStep>,
    ) -> LevelSnapshot {
        LevelSnapshot {
            tick: self.tick,
            player: self.player.snapshot(),
            shadow: self.shadow.snapshot(),
            steps: self.recorder.steps(),
            action,
            player_execution,
            replay,
            outcome: self.outcome,
            digest: self.state_digest(),
        }
    }
}

fn delay_ticks(exit: &ExitConfig, tick_rate_hz: u32) -> Tick {
    (exit.delay * f64::from(tick_rate_hz)).ceil() as Tick
}

fn facing_tag(facing: Facing) -> u64 {
    match facing {
        Facing::Left => 0,
        Facing::Right => 1,
    }
}
