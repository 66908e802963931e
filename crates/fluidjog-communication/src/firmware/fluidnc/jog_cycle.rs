//! Jog cycle sequencing
//!
//! One cycle is: forward jog, wait for Idle, backward jog, wait for Idle.
//! Cancellation is checked between those steps; a step already started runs
//! to completion and nothing already sent is undone.

use super::{ControllerSession, IdleOutcome, IdlePoller};
use async_trait::async_trait;
use fluidjog_core::{
    ControllerError, CycleCount, JogCommand, Notice, Result, SessionListener,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The two operations a jog cycle needs from the controller
#[async_trait]
pub trait JogDriver: Send {
    /// Send one jog line
    async fn send_jog(&mut self, command: &str) -> Result<()>;

    /// Block until the controller is idle again
    async fn wait_for_idle(&mut self, cancel: &CancellationToken) -> Result<IdleOutcome>;
}

/// [`JogDriver`] talking to a real session
pub struct SessionDriver<'a> {
    session: &'a mut ControllerSession,
    poller: IdlePoller,
}

impl<'a> SessionDriver<'a> {
    /// Pair a session with a poller
    pub fn new(session: &'a mut ControllerSession, poller: IdlePoller) -> Self {
        Self { session, poller }
    }
}

#[async_trait]
impl JogDriver for SessionDriver<'_> {
    async fn send_jog(&mut self, command: &str) -> Result<()> {
        self.session.send_and_log(command).await
    }

    async fn wait_for_idle(&mut self, cancel: &CancellationToken) -> Result<IdleOutcome> {
        self.poller.wait_for_idle(self.session, cancel).await
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// Every requested cycle ran
    #[default]
    Done,
    /// Cancellation stopped the loop
    Stopped,
}

/// Result of a jog run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Fully completed forward+backward pairs
    pub cycles_completed: u64,
    /// Waits that ended without seeing Idle
    pub idle_timeouts: u64,
    /// Done or stopped
    pub outcome: RunOutcome,
}

/// Runs forward/backward jog pairs
pub struct JogCycleRunner {
    cycles: CycleCount,
    listener: Arc<dyn SessionListener>,
    stop_on_idle_timeout: bool,
    idle_timeout: Duration,
}

impl JogCycleRunner {
    /// Create a runner for `cycles`
    pub fn new(cycles: CycleCount, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            cycles,
            listener,
            stop_on_idle_timeout: false,
            idle_timeout: Duration::ZERO,
        }
    }

    /// Make an idle timeout end the run with `ControllerError::IdleTimeout`
    pub fn with_stop_on_idle_timeout(mut self, enabled: bool, idle_timeout: Duration) -> Self {
        self.stop_on_idle_timeout = enabled;
        self.idle_timeout = idle_timeout;
        self
    }

    /// Summary for a run cancelled before the first cycle
    pub fn stopped_before_start(listener: &Arc<dyn SessionListener>) -> RunSummary {
        tracing::info!("Cancelled before jogging started");
        listener.on_notice(&Notice::Stopped);
        RunSummary {
            outcome: RunOutcome::Stopped,
            ..RunSummary::default()
        }
    }

    /// Run the cycles against `driver`
    pub async fn run<D>(
        &self,
        driver: &mut D,
        jog: &JogCommand,
        cancel: &CancellationToken,
    ) -> Result<RunSummary>
    where
        D: JogDriver + ?Sized,
    {
        let mut summary = RunSummary::default();
        self.listener.on_notice(&Notice::LoopStarted(self.cycles));
        tracing::info!(cycles = %self.cycles, forward = %jog.forward(), "Starting jog loop");

        let mut cycle: u64 = 1;
        while self.cycles.includes(cycle) {
            if cancel.is_cancelled() {
                return Ok(self.stop(summary));
            }
            tracing::info!(cycle, "Cycle started");
            self.listener.on_notice(&Notice::CycleStarted(cycle));

            for command in [jog.forward(), jog.backward()] {
                if cancel.is_cancelled() {
                    return Ok(self.stop(summary));
                }
                driver.send_jog(command).await?;

                match driver.wait_for_idle(cancel).await? {
                    IdleOutcome::Idle => {}
                    IdleOutcome::TimedOut => {
                        summary.idle_timeouts += 1;
                        if self.stop_on_idle_timeout {
                            tracing::error!(cycle, "Stopping after idle timeout");
                            return Err(ControllerError::IdleTimeout {
                                timeout_ms: self.idle_timeout.as_millis() as u64,
                            }
                            .into());
                        }
                    }
                    IdleOutcome::Cancelled => return Ok(self.stop(summary)),
                }
            }

            summary.cycles_completed = cycle;
            cycle += 1;
        }

        tracing::info!(cycles = summary.cycles_completed, "Jog loop finished");
        self.listener.on_notice(&Notice::Finished {
            cycles: summary.cycles_completed,
        });
        Ok(summary)
    }

    fn stop(&self, mut summary: RunSummary) -> RunSummary {
        tracing::info!(cycles = summary.cycles_completed, "Jog loop stopped");
        self.listener.on_notice(&Notice::Stopped);
        summary.outcome = RunOutcome::Stopped;
        summary
    }
}
