//! Discrete player actions and the per-tick input frame they are derived from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One discrete action recognized by the recorder.
///
/// The integer codes are stable: they are what gets recorded and replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCode {
    MoveLeft,
    ClimbUp,
    MoveRight,
    ClimbDown,
}

/// Integer does not name an [`ActionCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown action code {0}")]
pub struct UnknownActionCode(pub i32);

impl ActionCode {
    pub const ALL: [ActionCode; 4] = [
        ActionCode::MoveLeft,
        ActionCode::ClimbUp,
        ActionCode::MoveRight,
        ActionCode::ClimbDown,
    ];

    /// Stable integer code: MoveLeft=-1, ClimbUp=0, MoveRight=1, ClimbDown=2.
    pub const fn code(self) -> i32 {
        match self {
            Self::MoveLeft => -1,
            Self::ClimbUp => 0,
            Self::MoveRight => 1,
            Self::ClimbDown => 2,
        }
    }

    /// Horizontal step direction, `None` for climbs.
    pub const fn direction(self) -> Option<f64> {
        match self {
            Self::MoveLeft => Some(-1.0),
            Self::MoveRight => Some(1.0),
            Self::ClimbUp | Self::ClimbDown => None,
        }
    }

    pub const fn is_climb(self) -> bool {
        matches!(self, Self::ClimbUp | Self::ClimbDown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MoveLeft => "move_left",
            Self::ClimbUp => "climb_up",
            Self::MoveRight => "move_right",
            Self::ClimbDown => "climb_down",
        }
    }
}

impl TryFrom<i32> for ActionCode {
    type Error = UnknownActionCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Self::MoveLeft),
            0 => Ok(Self::ClimbUp),
            1 => Ok(Self::MoveRight),
            2 => Ok(Self::ClimbDown),
            other => Err(UnknownActionCode(other)),
        }
    }
}

impl std::fmt::Display for ActionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Input Frame
// ============================================================================

const LEFT_BIT: u8 = 0b0001;
const RIGHT_BIT: u8 = 0b0010;
const CLIMB_UP_BIT: u8 = 0b0100;
const CLIMB_DOWN_BIT: u8 = 0b1000;

/// Button-down edges observed during one tick.
///
/// Only edges count: a held button produces one frame with its flag set and
/// then nothing until it is released and pressed again. The host's input
/// layer is responsible for edge detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InputFrame {
    pub left: bool,
    pub right: bool,
    pub climb_up: bool,
    pub climb_down: bool,
}

impl InputFrame {
    /// Frame with no edges.
    pub const fn idle() -> Self {
        Self {
            left: false,
            right: false,
            climb_up: false,
            climb_down: false,
        }
    }

    /// Frame carrying exactly the edge that produces `action`.
    pub const fn pressing(action: ActionCode) -> Self {
        let mut frame = Self::idle();
        match action {
            ActionCode::MoveLeft => frame.left = true,
            ActionCode::MoveRight => frame.right = true,
            ActionCode::ClimbUp => frame.climb_up = true,
            ActionCode::ClimbDown => frame.climb_down = true,
        }
        frame
    }

    pub const fn is_empty(&self) -> bool {
        !(self.left || self.right || self.climb_up || self.climb_down)
    }

    /// The single action this frame records.
    ///
    /// At most one action per tick; simultaneous edges resolve in the order
    /// left, right, climb-up, climb-down.
    pub const fn action(&self) -> Option<ActionCode> {
        if self.left {
            Some(ActionCode::MoveLeft)
        } else if self.right {
            Some(ActionCode::MoveRight)
        } else if self.climb_up {
            Some(ActionCode::ClimbUp)
        } else if self.climb_down {
            Some(ActionCode::ClimbDown)
        } else {
            None
        }
    }

    /// Pack into the low four bits (left, right, climb-up, climb-down).
    pub const fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.left {
            bits |= LEFT_BIT;
        }
        if self.right {
            bits |= RIGHT_BIT;
        }
        if self.climb_up {
            bits |= CLIMB_UP_BIT;
        }
        if self.climb_down {
            bits |= CLIMB_DOWN_BIT;
        }
        bits
    }

    /// Unpack from [`InputFrame::to_bits`]; `None` if any higher bit is set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !(LEFT_BIT | RIGHT_BIT | CLIMB_UP_BIT | CLIMB_DOWN_BIT) != 0 {
            return None;
        }
        Some(Self {
            left: bits & LEFT_BIT != 0,
            right: bits & RIGHT_BIT != 0,
            climb_up: bits & CLIMB_UP_BIT != 0,
            climb_down: bits & CLIMB_DOWN_BIT != 0,
        })
    }
}

impl From<ActionCode> for InputFrame {
    fn from(action: ActionCode) -> Self {
        Self::pressing(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes_are_stable() {
        assert_eq!(ActionCode::MoveLeft.code(), -1);
        assert_eq!(ActionCode::ClimbUp.code(), 0);
        assert_eq!(ActionCode::MoveRight.code(), 1);
        assert_eq!(ActionCode::ClimbDown.code(), 2);

        for action in ActionCode::ALL {
            assert_eq!(ActionCode::try_from(action.code()), Ok(action));
        }
    }

    #[test]
    fn test_unknown_action_code_rejected() {
        assert_eq!(ActionCode::try_from(3), Err(UnknownActionCode(3)));
        assert_eq!(ActionCode::try_from(-2), Err(UnknownActionCode(-2)));
        assert_eq!(UnknownActionCode(7).to_string(), "unknown action code 7");
    }

    #[test]
    fn test_direction_only_for_moves() {
        assert_eq!(ActionCode::MoveLeft.direction(), Some(-1.0));
        assert_eq!(ActionCode::MoveRight.direction(), Some(1.0));
        assert_eq!(ActionCode::ClimbUp.direction(), None);
        assert!(ActionCode::ClimbDown.is_climb());
    }

    #[test]
    fn test_frame_priority() {
        let all = InputFrame {
            left: true,
            right: true,
            climb_up: true,
            climb_down: true,
        };
        assert_eq!(all.action(), Some(ActionCode::MoveLeft));

        let right_and_up = InputFrame {
            right: true,
            climb_up: true,
            ..InputFrame::idle()
        };
        assert_eq!(right_and_up.action(), Some(ActionCode::MoveRight));

        let up_and_down = InputFrame {
            climb_up: true,
            climb_down: true,
            ..InputFrame::idle()
        };
        assert_eq!(up_and_down.action(), Some(ActionCode::ClimbUp));

        assert_eq!(InputFrame::idle().action(), None);
        assert!(InputFrame::idle().is_empty());
    }

    #[test]
    fn test_frame_bits() {
        for action in ActionCode::ALL {
            let frame = InputFrame::pressing(action);
            assert_eq!(frame.action(), Some(action));
            assert_eq!(InputFrame::from_bits(frame.to_bits()), Some(frame));
        }
        assert_eq!(InputFrame::from_bits(0b1_0000), None);
        assert_eq!(InputFrame::from_bits(0), Some(InputFrame::idle()));
    }
}
