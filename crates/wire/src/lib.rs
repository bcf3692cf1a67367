//! Split Self Wire Types
//!
//! Protobuf message types for attempt artifacts: everything needed to
//! re-simulate one level attempt and check that it ends in the same state.
//! The simulation crate never sees these types; `splitself-replay` converts
//! between them and the simulation's own input frames.

#![deny(unsafe_code)]

use prost::Message;

/// Tick type alias for the wire format.
pub type Tick = u64;

// ============================================================================
// Attempt Events
// ============================================================================

/// What an [`AttemptEventProto`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum EventKind {
    /// A non-empty input frame fed to `advance()` at `tick`.
    Input = 0,
    /// A level reset performed before `advance()` at `tick`.
    Reset = 1,
    /// A shadow replay length change made before `advance()` at `tick`.
    SetMemorySteps = 2,
}

/// One recorded event of an attempt.
#[derive(Clone, PartialEq, Message)]
pub struct AttemptEventProto {
    /// Tick whose `advance()` the event belongs to.
    #[prost(uint64, tag = "1")]
    pub tick: Tick,

    #[prost(enumeration = "EventKind", tag = "2")]
    pub kind: i32,

    /// Button-down edges seen this tick as a bit mask: left, right, climb
    /// up, climb down from bit 0. Zero for other kinds.
    #[prost(uint32, tag = "3")]
    pub input_mask: u32,

    /// New replay length for `SetMemorySteps`. Zero for other kinds.
    #[prost(uint32, tag = "4")]
    pub memory_steps: u32,
}

/// Tuning parameter key-value pair.
#[derive(Clone, PartialEq, Message)]
pub struct TuningParameter {
    #[prost(string, tag = "1")]
    pub key: String,

    #[prost(double, tag = "2")]
    pub value: f64,
}

// ============================================================================
// Attempt Artifact
// ============================================================================

/// Complete record of one level attempt.
#[derive(Clone, PartialEq, Message)]
pub struct AttemptArtifact {
    /// Schema version (starts at 1).
    #[prost(uint32, tag = "1")]
    pub attempt_format_version: u32,

    /// Simulation tick rate.
    #[prost(uint32, tag = "2")]
    pub tick_rate_hz: u32,

    /// State digest algorithm identifier.
    #[prost(string, tag = "3")]
    pub state_digest_algo_id: String,

    /// Shadow replay length the attempt started with; later changes are
    /// `SetMemorySteps` events.
    #[prost(uint32, tag = "4")]
    pub memory_steps: u32,

    /// Level tuning in the order the configuration lists it.
    #[prost(message, repeated, tag = "5")]
    pub tuning_parameters: Vec<TuningParameter>,

    /// Lowercase hex SHA-256 over `tuning_parameters`.
    #[prost(string, tag = "6")]
    pub tuning_fingerprint: String,

    /// State digest before the first tick.
    #[prost(uint64, tag = "7")]
    pub initial_digest: u64,

    /// Inputs, resets and replay length changes ordered by tick.
    #[prost(message, repeated, tag = "8")]
    pub events: Vec<AttemptEventProto>,

    /// State digest at `checkpoint_tick`.
    #[prost(uint64, tag = "9")]
    pub final_digest: u64,

    /// Post-step tick the attempt was recorded up to.
    #[prost(uint64, tag = "10")]
    pub checkpoint_tick: Tick,

    /// Level outcome at `checkpoint_tick` ("playing", "exiting", "completed").
    #[prost(string, tag = "11")]
    pub outcome: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> AttemptArtifact {
        AttemptArtifact {
            attempt_format_version: 1,
            tick_rate_hz: 60,
            state_digest_algo_id: "splitself-digest-v1-fnv1a64-le-f64canon".to_string(),
            memory_steps: 3,
            tuning_parameters: vec![TuningParameter {
                key: "player.step_distance".to_string(),
                value: 4.0,
            }],
            tuning_fingerprint: "ab".repeat(32),
            initial_digest: 0x1234,
            events: vec![
                AttemptEventProto {
                    tick: 0,
                    kind: EventKind::Input as i32,
                    input_mask: 0b0010,
                    memory_steps: 0,
                },
                AttemptEventProto {
                    tick: 40,
                    kind: EventKind::Reset as i32,
                    input_mask: 0,
                    memory_steps: 0,
                },
                AttemptEventProto {
                    tick: 41,
                    kind: EventKind::SetMemorySteps as i32,
                    input_mask: 0,
                    memory_steps: 2,
                },
            ],
            final_digest: 0xfeedface,
            checkpoint_tick: 120,
            outcome: "playing".to_string(),
        }
    }

    #[test]
    fn test_attempt_artifact_roundtrip() {
        let msg = sample_artifact();
        let encoded = msg.encode_to_vec();
        let decoded = AttemptArtifact::decode(encoded.as_slice()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_event_kind_from_wire() {
        assert_eq!(EventKind::try_from(0), Ok(EventKind::Input));
        assert_eq!(EventKind::try_from(1), Ok(EventKind::Reset));
        assert_eq!(EventKind::try_from(2), Ok(EventKind::SetMemorySteps));
        assert!(EventKind::try_from(7).is_err());
    }

    #[test]
    fn test_truncated_artifact_fails_to_decode() {
        let encoded = sample_artifact().encode_to_vec();
        let truncated = &encoded[..encoded.len() - 3];
        assert!(AttemptArtifact::decode(truncated).is_err());
    }
}
