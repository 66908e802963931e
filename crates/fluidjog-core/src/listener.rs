//! Session listener interface
//!
//! The protocol layer reports its transcript (outbound commands, inbound
//! device lines) and operator notices through [`SessionListener`]. The binary
//! renders them on the console; tests record them.

use crate::data::CycleCount;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// Operator-facing milestones of a run
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Opening the serial port
    Connecting {
        /// Port name
        port: String,
        /// Baud rate
        baud_rate: u32,
    },
    /// Port open, scanning for the boot banner
    WaitingForBoot,
    /// Banner seen
    Booted,
    /// Banner not seen inside the boot window
    BootFailed,
    /// Unlock command sent
    Unlocked,
    /// Pausing before an unbounded loop
    LoopStartDelay(Duration),
    /// Starting the cycle loop
    LoopStarted(CycleCount),
    /// Starting cycle with 1-based index
    CycleStarted(u64),
    /// First jog status frame of a wait
    Jogging,
    /// Controller reported Idle
    JogComplete,
    /// Idle never reported; continuing
    IdleTimeout(Duration),
    /// Cancellation observed; loop stopped
    Stopped,
    /// All requested cycles done
    Finished {
        /// Cycles completed
        cycles: u64,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting { port, baud_rate } => {
                write!(f, "Connecting to {} at {} baud...", port, baud_rate)
            }
            Self::WaitingForBoot => write!(f, "Waiting for FluidNC to fully boot..."),
            Self::Booted => write!(f, "Controller booted."),
            Self::BootFailed => {
                write!(f, "FluidNC did not boot. Power cycle and try again.")
            }
            Self::Unlocked => write!(f, "Machine unlocked."),
            Self::LoopStartDelay(delay) => write!(
                f,
                "Giving FluidNC {:.1}s before starting loop...",
                delay.as_secs_f64()
            ),
            Self::LoopStarted(CycleCount::Unbounded) => {
                write!(f, "Looping until stopped. Press Ctrl+C to stop.")
            }
            Self::LoopStarted(CycleCount::Finite(n)) => write!(f, "Running {} cycles.", n),
            Self::CycleStarted(cycle) => write!(f, "Cycle {}:", cycle),
            Self::Jogging => write!(f, "Jogging..."),
            Self::JogComplete => write!(f, "Jog complete."),
            Self::IdleTimeout(timeout) => write!(
                f,
                "Timeout waiting for Idle after {:.1}s",
                timeout.as_secs_f64()
            ),
            Self::Stopped => write!(f, "Stopped by user. Exiting gracefully..."),
            Self::Finished { cycles } => write!(f, "Finished {} cycles.", cycles),
        }
    }
}

/// Listener for session transcript and notices
pub trait SessionListener: Send + Sync {
    /// A command line was written to the controller
    fn on_outbound(&self, _command: &str) {}

    /// The controller sent a line worth showing
    fn on_inbound(&self, _line: &str) {}

    /// A run milestone was reached
    fn on_notice(&self, _notice: &Notice) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpListener;

impl SessionListener for NoOpListener {}

/// Single recorded listener callback
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// See [`SessionListener::on_outbound`]
    Outbound(String),
    /// See [`SessionListener::on_inbound`]
    Inbound(String),
    /// See [`SessionListener::on_notice`]
    Notice(Notice),
}

/// Listener that keeps every callback in order
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingListener {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Recorded inbound lines only
    pub fn inbound(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Inbound(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded outbound commands only
    pub fn outbound(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Outbound(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded notices only
    pub fn notices(&self) -> Vec<Notice> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SessionListener for RecordingListener {
    fn on_outbound(&self, command: &str) {
        self.events
            .lock()
            .push(SessionEvent::Outbound(command.to_string()));
    }

    fn on_inbound(&self, line: &str) {
        self.events.lock().push(SessionEvent::Inbound(line.to_string()));
    }

    fn on_notice(&self, notice: &Notice) {
        self.events.lock().push(SessionEvent::Notice(notice.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_listener_keeps_order() {
        let listener = RecordingListener::new();
        listener.on_outbound("$X");
        listener.on_inbound("[MSG:Caution: Unlocked]");
        listener.on_notice(&Notice::Unlocked);

        assert_eq!(
            listener.events(),
            vec![
                SessionEvent::Outbound("$X".to_string()),
                SessionEvent::Inbound("[MSG:Caution: Unlocked]".to_string()),
                SessionEvent::Notice(Notice::Unlocked),
            ]
        );
        assert_eq!(listener.outbound(), vec!["$X".to_string()]);
        assert_eq!(listener.notices(), vec![Notice::Unlocked]);
    }

    #[test]
    fn test_notice_display() {
        assert_eq!(Notice::CycleStarted(2).to_string(), "Cycle 2:");
        assert_eq!(
            Notice::Connecting {
                port: "COM3".to_string(),
                baud_rate: 115200
            }
            .to_string(),
            "Connecting to COM3 at 115200 baud..."
        );
        assert_eq!(
            Notice::IdleTimeout(Duration::from_secs(10)).to_string(),
            "Timeout waiting for Idle after 10.0s"
        );
    }
}
