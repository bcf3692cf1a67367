//! Split Self Attempt Replay
//!
//! Records level attempts as [`AttemptArtifact`]s and verifies that an
//! artifact re-simulates to the state it was recorded with.
//!
//! # Architecture
//!
//! - [`AttemptRecorder`]: collects input frames, resets and replay length
//!   changes while a level runs
//! - [`verify_attempt`]: replays an artifact on a fresh [`Level`] and compares
//!   the final tick, digest and outcome
//! - Tuning fingerprint: SHA-256 over the level configuration, so an artifact
//!   is only checked against the tuning it was recorded with

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use prost::Message;
use sha2::{Digest, Sha256};
use splitself_sim::{
    Avatar, ConfigError, InputFrame, Level, LevelConfig, LevelOutcome, LevelSnapshot,
    STATE_DIGEST_ALGO_ID, Terrain, TICK_RATE_HZ, Tick,
};
use splitself_wire::{AttemptArtifact, AttemptEventProto, EventKind, TuningParameter};

/// Artifact schema version written by [`AttemptRecorder::finalize`].
pub const ATTEMPT_FORMAT_VERSION: u32 = 1;

/// Default verification limit: one hour of play at the default tick rate.
pub const DEFAULT_MAX_CHECKPOINT_TICK: Tick = 60 * 60 * TICK_RATE_HZ as Tick;

// ============================================================================
// Attempt Events
// ============================================================================

/// Something that happened at a tick of a recorded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    /// A non-empty frame passed to `advance(tick, ..)`.
    Input { tick: Tick, frame: InputFrame },
    /// `reset()` called right before `advance(tick, ..)`.
    Reset { tick: Tick },
    /// `set_memory_steps(steps)` called right before `advance(tick, ..)`.
    SetMemorySteps { tick: Tick, steps: usize },
}

impl AttemptEvent {
    pub fn tick(&self) -> Tick {
        match self {
            Self::Input { tick, .. } | Self::Reset { tick } | Self::SetMemorySteps { tick, .. } => {
                *tick
            }
        }
    }
}

impl From<AttemptEvent> for AttemptEventProto {
    fn from(event: AttemptEvent) -> Self {
        match event {
            AttemptEvent::Input { tick, frame } => Self {
                tick,
                kind: EventKind::Input as i32,
                input_mask: u32::from(frame.to_bits()),
                memory_steps: 0,
            },
            AttemptEvent::Reset { tick } => Self {
                tick,
                kind: EventKind::Reset as i32,
                input_mask: 0,
                memory_steps: 0,
            },
            AttemptEvent::SetMemorySteps { tick, steps } => Self {
                tick,
                kind: EventKind::SetMemorySteps as i32,
                input_mask: 0,
                memory_steps: u32::try_from(steps).unwrap_or(u32::MAX),
            },
        }
    }
}

impl TryFrom<AttemptEventProto> for AttemptEvent {
    type Error = &'static str;

    fn try_from(proto: AttemptEventProto) -> Result<Self, Self::Error> {
        match EventKind::try_from(proto.kind) {
            Ok(EventKind::Input) => {
                if proto.memory_steps != 0 {
                    return Err("input event carries a memory step count");
                }
                let frame = u8::try_from(proto.input_mask)
                    .ok()
                    .and_then(InputFrame::from_bits)
                    .ok_or("input mask has bits above 0b1111")?;
                if frame.is_empty() {
                    return Err("input event with empty mask");
                }
                Ok(Self::Input {
                    tick: proto.tick,
                    frame,
                })
            }
            Ok(EventKind::Reset) => {
                if proto.input_mask != 0 || proto.memory_steps != 0 {
                    return Err("reset event carries a payload");
                }
                Ok(Self::Reset { tick: proto.tick })
            }
            Ok(EventKind::SetMemorySteps) => {
                if proto.input_mask != 0 {
                    return Err("memory step event carries an input mask");
                }
                if proto.memory_steps == 0 {
                    return Err("memory step count must be at least 1");
                }
                Ok(Self::SetMemorySteps {
                    tick: proto.tick,
                    steps: proto.memory_steps as usize,
                })
            }
            Err(_) => Err("unknown event kind"),
        }
    }
}

// ============================================================================
// Tuning Fingerprint
// ============================================================================

/// Lowercase hex SHA-256 of the tuning parameters, in the given order.
///
/// Each entry hashes as the UTF-8 key, a zero byte, then the little-endian
/// bits of the value with `-0.0` folded into `0.0`.
pub fn tuning_fingerprint(params: &[(String, f64)]) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in params {
        let value = if *value == 0.0 { 0.0 } else { *value };
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.to_bits().to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Attempt Recorder
// ============================================================================

/// Attempt recording error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// Verification replays from tick 0, so a later start cannot verify.
    #[error("Attempt recording must start at tick 0, level is at tick {tick}")]
    NotAtStart { tick: Tick },
}

/// Collects what a host fed into a [`Level`] so the attempt can be replayed.
///
/// Create it from the level before the first tick; the level's configuration
/// and initial digest are captured then.
#[derive(Debug, Clone)]
pub struct AttemptRecorder {
    tick_rate_hz: u32,
    memory_steps: usize,
    tuning_parameters: Vec<(String, f64)>,
    initial_digest: u64,
    events: Vec<AttemptEvent>,
}

impl AttemptRecorder {
    pub fn new<T: Terrain, A: Avatar>(level: &Level<T, A>) -> Result<Self, RecordError> {
        if level.tick() != 0 {
            return Err(RecordError::NotAtStart { tick: level.tick() });
        }
        let config = level.config();
        Ok(Self {
            tick_rate_hz: config.tick_rate_hz,
            memory_steps: config.shadow.memory_steps,
            tuning_parameters: config.tuning_parameters(),
            initial_digest: level.state_digest(),
            events: Vec::new(),
        })
    }

    /// Record the frame about to be passed to `advance(tick, ..)`.
    /// Empty frames are not stored.
    pub fn record_frame(&mut self, tick: Tick, frame: &InputFrame) {
        if !frame.is_empty() {
            self.events.push(AttemptEvent::Input {
                tick,
                frame: *frame,
            });
        }
    }

    /// Record a level reset performed before `advance(tick, ..)`.
    pub fn record_reset(&mut self, tick: Tick) {
        self.events.push(AttemptEvent::Reset { tick });
    }

    /// Record a replay length change made before `advance(tick, ..)`.
    pub fn record_memory_steps(&mut self, tick: Tick, steps: usize) {
        self.events.push(AttemptEvent::SetMemorySteps { tick, steps });
    }

    /// Record `frame` and advance `level` by one tick.
    pub fn advance<T: Terrain, A: Avatar>(
        &mut self,
        level: &mut Level<T, A>,
        frame: &InputFrame,
    ) -> LevelSnapshot {
        let tick = level.tick();
        self.record_frame(tick, frame);
        level.advance(tick, frame)
    }

    /// Record a reset and reset `level`.
    pub fn reset<T: Terrain, A: Avatar>(&mut self, level: &mut Level<T, A>) {
        self.record_reset(level.tick());
        level.reset();
    }

    /// Change the level's replay length and record it. A refused value is
    /// not recorded.
    pub fn set_memory_steps<T: Terrain, A: Avatar>(
        &mut self,
        level: &mut Level<T, A>,
        steps: usize,
    ) -> Result<(), ConfigError> {
        level.set_memory_steps(steps)?;
        self.record_memory_steps(level.tick(), steps);
        Ok(())
    }

    pub fn events(&self) -> &[AttemptEvent] {
        &self.events
    }

    /// Finalize the attempt artifact.
    pub fn finalize(
        self,
        final_digest: u64,
        checkpoint_tick: Tick,
        outcome: LevelOutcome,
    ) -> AttemptArtifact {
        let tuning_fingerprint = tuning_fingerprint(&self.tuning_parameters);
        let tuning_parameters = self
            .tuning_parameters
            .into_iter()
            .map(|(key, value)| TuningParameter { key, value })
            .collect();

        AttemptArtifact {
            attempt_format_version: ATTEMPT_FORMAT_VERSION,
            tick_rate_hz: self.tick_rate_hz,
            state_digest_algo_id: STATE_DIGEST_ALGO_ID.to_string(),
            memory_steps: u32::try_from(self.memory_steps).unwrap_or(u32::MAX),
            tuning_parameters,
            tuning_fingerprint,
            initial_digest: self.initial_digest,
            events: self.events.into_iter().map(Into::into).collect(),
            final_digest,
            checkpoint_tick,
            outcome: outcome.as_str().to_string(),
        }
    }
}

// ============================================================================
// Attempt Verification
// ============================================================================

/// Attempt verification error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("Unsupported attempt format version {version}")]
    UnsupportedFormat { version: u32 },

    #[error("Checkpoint tick {checkpoint_tick} exceeds the verification limit {max}")]
    CheckpointOutOfRange { checkpoint_tick: Tick, max: Tick },

    #[error("State digest algorithm mismatch: expected {expected}, got {actual}")]
    DigestAlgorithmMismatch { expected: String, actual: String },

    #[error("Tuning fingerprint mismatch: expected {expected}, got {actual}")]
    TuningMismatch { expected: String, actual: String },

    #[error("Invalid level configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Initialization anchor mismatch: expected {expected:#x}, got {actual:#x}")]
    InitializationAnchorMismatch { expected: u64, actual: u64 },

    #[error("Event stream invalid: {reason}")]
    EventStreamInvalid { reason: String },

    #[error("Final digest mismatch: expected {expected:#x}, got {actual:#x}")]
    FinalDigestMismatch { expected: u64, actual: u64 },

    #[error("Outcome mismatch: expected {expected}, got {actual}")]
    OutcomeMismatch { expected: String, actual: String },
}

/// Options for attempt verification.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Whether a tuning fingerprint mismatch fails verification.
    /// - true: fail on mismatch
    /// - false: warn and replay anyway
    pub strict_tuning_check: bool,
    /// Longest attempt, in ticks, that will be replayed.
    pub max_checkpoint_tick: Tick,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            strict_tuning_check: true,
            max_checkpoint_tick: DEFAULT_MAX_CHECKPOINT_TICK,
        }
    }
}

/// Verify that `artifact` replays to its recorded end state on `terrain`
/// under `config`.
///
/// The level is built from `config` with the artifact's recorded tick rate
/// and initial memory steps.
///
/// # Verification Steps
/// 1. Format version and state digest algorithm must match this build, and
///    `checkpoint_tick` must be within `options.max_checkpoint_tick`
/// 2. Tuning fingerprint must match `config` (strict: fail; lenient: warn)
/// 3. Event stream must be well formed
/// 4. A fresh level must start at the recorded initial digest
/// 5. Replay ticks `[0, checkpoint_tick)`; a tick's reset and replay length
///    change apply before its frame
/// 6. Final digest and outcome must match
pub fn verify_attempt<T: Terrain>(
    artifact: &AttemptArtifact,
    config: &LevelConfig,
    terrain: T,
    options: &VerifyOptions,
) -> Result<(), VerifyError> {
    // Step 1: Format
    if artifact.attempt_format_version != ATTEMPT_FORMAT_VERSION {
        return Err(VerifyError::UnsupportedFormat {
            version: artifact.attempt_format_version,
        });
    }
    if artifact.state_digest_algo_id != STATE_DIGEST_ALGO_ID {
        return Err(VerifyError::DigestAlgorithmMismatch {
            expected: artifact.state_digest_algo_id.clone(),
            actual: STATE_DIGEST_ALGO_ID.to_string(),
        });
    }
    if artifact.checkpoint_tick > options.max_checkpoint_tick {
        return Err(VerifyError::CheckpointOutOfRange {
            checkpoint_tick: artifact.checkpoint_tick,
            max: options.max_checkpoint_tick,
        });
    }

    // Step 2: Tuning fingerprint
    let current = tuning_fingerprint(&config.tuning_parameters());
    if current != artifact.tuning_fingerprint {
        if options.strict_tuning_check {
            return Err(VerifyError::TuningMismatch {
                expected: artifact.tuning_fingerprint.clone(),
                actual: current,
            });
        }
        tracing::warn!(
            expected = %artifact.tuning_fingerprint,
            actual = %current,
            "tuning fingerprint mismatch, replaying anyway"
        );
    }

    // Step 3: Event stream
    let events_by_tick = validate_event_stream(artifact)?;

    // Step 4: Initialization anchor
    let invalid_config = |e: ConfigError| VerifyError::InvalidConfig {
        reason: e.to_string(),
    };
    let replay_config = recorded_config(artifact, config);
    let mut level = Level::new(replay_config, terrain).map_err(invalid_config)?;
    let initial_digest = level.state_digest();
    if initial_digest != artifact.initial_digest {
        return Err(VerifyError::InitializationAnchorMismatch {
            expected: artifact.initial_digest,
            actual: initial_digest,
        });
    }

    // Step 5: Replay
    for tick in 0..artifact.checkpoint_tick {
        let events = events_by_tick.get(&tick);
        if events.is_some_and(|e| e.reset) {
            level.reset();
        }
        if let Some(steps) = events.and_then(|e| e.memory_steps) {
            level.set_memory_steps(steps).map_err(invalid_config)?;
        }
        let frame = events.and_then(|e| e.frame).unwrap_or_default();
        level.advance(tick, &frame);
    }

    // Step 6: End state
    let final_digest = level.state_digest();
    if final_digest != artifact.final_digest {
        return Err(VerifyError::FinalDigestMismatch {
            expected: artifact.final_digest,
            actual: final_digest,
        });
    }
    let outcome = level.outcome().as_str();
    if outcome != artifact.outcome {
        return Err(VerifyError::OutcomeMismatch {
            expected: artifact.outcome.clone(),
            actual: outcome.to_string(),
        });
    }

    tracing::info!(
        checkpoint_tick = artifact.checkpoint_tick,
        events = artifact.events.len(),
        outcome,
        "attempt verified"
    );
    Ok(())
}

/// `config` with the tick rate and initial replay length the artifact was
/// recorded with.
fn recorded_config(artifact: &AttemptArtifact, config: &LevelConfig) -> LevelConfig {
    let mut replay_config = config.clone();
    let memory_steps = artifact.memory_steps as usize;
    if replay_config.tick_rate_hz != artifact.tick_rate_hz
        || replay_config.shadow.memory_steps != memory_steps
    {
        tracing::warn!(
            recorded_tick_rate_hz = artifact.tick_rate_hz,
            recorded_memory_steps = memory_steps,
            tick_rate_hz = replay_config.tick_rate_hz,
            memory_steps = replay_config.shadow.memory_steps,
            "replaying with the recorded tick rate and memory steps"
        );
    }
    replay_config.tick_rate_hz = artifact.tick_rate_hz;
    replay_config.shadow.memory_steps = memory_steps;
    replay_config
}

#[derive(Debug, Default)]
struct TickEvents {
    reset: bool,
    memory_steps: Option<usize>,
    frame: Option<InputFrame>,
}

/// Validate the event stream and group it by tick.
fn validate_event_stream(
    artifact: &AttemptArtifact,
) -> Result<BTreeMap<Tick, TickEvents>, VerifyError> {
    let invalid = |reason: String| VerifyError::EventStreamInvalid { reason };
    let checkpoint_tick = artifact.checkpoint_tick;

    let mut by_tick: BTreeMap<Tick, TickEvents> = BTreeMap::new();
    let mut previous_tick = None;

    for (index, proto) in artifact.events.iter().enumerate() {
        let event = AttemptEvent::try_from(proto.clone())
            .map_err(|e| invalid(format!("event {index} at tick {}: {e}", proto.tick)))?;
        let tick = event.tick();

        if tick >= checkpoint_tick {
            return Err(invalid(format!(
                "event {index} at tick {tick} is outside valid range [0, {checkpoint_tick})"
            )));
        }
        if let Some(previous) = previous_tick
            && tick < previous
        {
            return Err(invalid(format!(
                "event {index} at tick {tick} follows an event at tick {previous}"
            )));
        }
        previous_tick = Some(tick);

        let slot = by_tick.entry(tick).or_default();
        match event {
            AttemptEvent::Input { frame, .. } => {
                if slot.frame.replace(frame).is_some() {
                    return Err(invalid(format!("duplicate input at tick {tick}")));
                }
            }
            AttemptEvent::Reset { .. } => {
                if std::mem::replace(&mut slot.reset, true) {
                    return Err(invalid(format!("duplicate reset at tick {tick}")));
                }
            }
            AttemptEvent::SetMemorySteps { steps, .. } => {
                if slot.memory_steps.replace(steps).is_some() {
                    return Err(invalid(format!("duplicate memory step change at tick {tick}")));
                }
            }
        }
    }

    Ok(by_tick)
}

// ============================================================================
// Attempt I/O
// ============================================================================

/// Write an attempt artifact to a file. Never overwrites.
pub fn write_attempt(artifact: &AttemptArtifact, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let encoded = artifact.encode_to_vec();
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Attempt artifact already exists at {}", path.display()),
                )
            } else {
                e
            }
        })?;
    file.write_all(&encoded)?;

    tracing::info!(path = %path.display(), bytes = encoded.len(), "attempt artifact written");
    Ok(())
}

/// Read an attempt artifact from a file.
pub fn read_attempt(path: &Path) -> io::Result<AttemptArtifact> {
    let data = fs::read(path)?;
    AttemptArtifact::decode(data.as_slice()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to decode attempt: {e}"),
        )
    })
}

// ============================================================================
// Tests
// ============================================================================
