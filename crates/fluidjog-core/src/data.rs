//! Data models for the jog tester
//!
//! Small value types shared by the protocol layer and the command line:
//! axes, controller status classification, boot state, and cycle counts.

use crate::error::JogError;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Machine axis that can be jogged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
}

impl Axis {
    /// All jog-capable axes
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    /// Axis letter as used in G-code words
    pub fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Axis {
    type Err = JogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            _ => Err(JogError::UnknownAxis(s.to_string())),
        }
    }
}

/// Status marker prefix on real-time status frames
pub const STATUS_FRAME_PREFIX: char = '<';

/// Substring identifying a jog-in-progress status frame
pub const JOG_MARKER: &str = "<Jog";

/// Substring identifying an idle controller
pub const IDLE_MARKER: &str = "Idle";

/// Acknowledgement token sent after each accepted line
pub const ACK_TOKEN: &str = "ok";

/// Classification of a single line received from the controller
///
/// Derived per read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// Controller reports no motion in progress
    Idle,
    /// Controller reports a jog in progress
    Jog,
    /// Anything else (other states, acks, messages)
    Other,
}

impl ControllerStatus {
    /// Classify a received line.
    ///
    /// An idle marker anywhere in the line wins over a jog marker.
    pub fn classify(line: &str) -> Self {
        if line.contains(IDLE_MARKER) {
            Self::Idle
        } else if line.contains(JOG_MARKER) {
            Self::Jog
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Jog => write!(f, "Jog"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Returns true for lines the "device said" log should hide:
/// status frames and bare acknowledgements.
pub fn is_protocol_noise(line: &str) -> bool {
    line.starts_with(STATUS_FRAME_PREFIX) || line == ACK_TOKEN
}

/// Whether the controller boot banner has been observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootState {
    /// No banner seen yet
    #[default]
    NotDetected,
    /// Banner seen; never reverts
    Detected,
}

impl BootState {
    /// Check whether boot was detected
    pub fn is_booted(self) -> bool {
        self == Self::Detected
    }
}

/// Number of forward/backward jog pairs to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleCount {
    /// Exactly this many cycles
    Finite(NonZeroU32),
    /// Run until cancelled
    Unbounded,
}

impl CycleCount {
    /// Check whether this count never runs out
    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Whether the 1-based `cycle` index is still inside the count
    pub fn includes(self, cycle: u64) -> bool {
        match self {
            Self::Finite(n) => cycle >= 1 && cycle <= u64::from(n.get()),
            Self::Unbounded => cycle >= 1,
        }
    }
}

impl From<u32> for CycleCount {
    /// Zero means unbounded, matching the command line convention.
    fn from(value: u32) -> Self {
        NonZeroU32::new(value).map_or(Self::Unbounded, Self::Finite)
    }
}

impl fmt::Display for CycleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parse() {
        assert_eq!("X".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("y".parse::<Axis>().unwrap(), Axis::Y);
        assert_eq!(
            "Z".parse::<Axis>().unwrap_err(),
            JogError::UnknownAxis("Z".to_string())
        );
        assert_eq!(Axis::Y.to_string(), "Y");
    }

    #[test]
    fn test_status_classify() {
        assert_eq!(
            ControllerStatus::classify("<Idle|MPos:0.000,0.000,0.000|FS:0,0>"),
            ControllerStatus::Idle
        );
        assert_eq!(
            ControllerStatus::classify("<Jog|MPos:1.000,0.000,0.000|FS:1000,0>"),
            ControllerStatus::Jog
        );
        assert_eq!(ControllerStatus::classify("ok"), ControllerStatus::Other);
        assert_eq!(
            ControllerStatus::classify("<Run|MPos:1.000,0.000,0.000>"),
            ControllerStatus::Other
        );
        // A bare "Jog" without the frame prefix is not a jog frame
        assert_eq!(ControllerStatus::classify("Jog"), ControllerStatus::Other);
    }

    #[test]
    fn test_protocol_noise() {
        assert!(is_protocol_noise("ok"));
        assert!(is_protocol_noise("<Idle|MPos:0,0,0>"));
        assert!(!is_protocol_noise("error:15"));
        assert!(!is_protocol_noise("okay"));
        assert!(!is_protocol_noise("[MSG:INFO: Caution: Unlocked]"));
    }

    #[test]
    fn test_cycle_count() {
        assert_eq!(CycleCount::from(0), CycleCount::Unbounded);
        let three = CycleCount::from(3);
        assert!(!three.is_unbounded());
        assert!(three.includes(1));
        assert!(three.includes(3));
        assert!(!three.includes(4));
        assert!(!three.includes(0));
        assert!(CycleCount::Unbounded.includes(u64::MAX));
        assert_eq!(three.to_string(), "3");
    }

    #[test]
    fn test_boot_state_default() {
        assert!(!BootState::default().is_booted());
        assert!(BootState::Detected.is_booted());
    }
}
