//! Operator console output
//!
//! Renders the session transcript and run notices for a person watching the
//! machine. Diagnostics go through `tracing` to stderr; this is the stdout
//! side.

use fluidjog_core::{Notice, SessionListener};
use parking_lot::Mutex;
use std::io::{self, Write};

/// [`SessionListener`] printing to a writer, stdout by default
pub struct ConsoleListener<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleListener {
    /// Listener writing to stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleListener<W> {
    /// Listener writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock();
        // A closed stdout must not abort the run
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            tracing::debug!("Console write failed: {}", e);
        }
    }
}

fn notice_icon(notice: &Notice) -> &'static str {
    match notice {
        Notice::Connecting { .. } => "🔌",
        Notice::WaitingForBoot | Notice::LoopStartDelay(_) | Notice::Jogging => "⏳",
        Notice::Booted | Notice::Unlocked | Notice::JogComplete | Notice::Finished { .. } => "✅",
        Notice::BootFailed | Notice::IdleTimeout(_) => "⚠️",
        Notice::LoopStarted(_) => "🔁",
        Notice::CycleStarted(_) => "▶️",
        Notice::Stopped => "🛑",
    }
}

impl<W: Write + Send> SessionListener for ConsoleListener<W> {
    fn on_outbound(&self, command: &str) {
        self.emit(&format!(">> {}", command));
    }

    fn on_inbound(&self, line: &str) {
        self.emit(&format!("<< {}", line));
    }

    fn on_notice(&self, notice: &Notice) {
        self.emit(&format!("{} {}", notice_icon(notice), notice));
    }
}
