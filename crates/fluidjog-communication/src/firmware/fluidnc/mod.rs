//! FluidNC jog protocol
//!
//! The full run is strictly sequential:
//! open → boot scan → settle → drain → `$X` → (jog, poll for Idle)… → close.
//! Only one command is ever outstanding on the wire.

pub mod idle_poller;
pub mod jog_cycle;
pub mod session;

use fluidjog_core::{ControllerError, CycleCount, JogCommand, Notice, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use idle_poller::{IdleOutcome, IdlePoller};
pub use jog_cycle::{JogCycleRunner, JogDriver, RunOutcome, RunSummary, SessionDriver};
pub use session::ControllerSession;

/// Banner substring printed by FluidNC at boot
pub const FLUIDNC_BANNER: &str = "FluidNC";

/// Unlock (kill alarm lock) command
pub const UNLOCK_COMMAND: &str = "$X";

/// Real-time status query
pub const STATUS_QUERY: &str = "?";

/// Protocol constants and timings for a FluidNC session
#[derive(Debug, Clone, PartialEq)]
pub struct FluidNcConfig {
    /// Substring identifying the boot banner
    pub banner: String,
    /// Wait after opening the port (reset line settling)
    pub open_settle: Duration,
    /// How long to scan for the boot banner
    pub boot_window: Duration,
    /// Sleep between boot scans when nothing was received
    pub boot_poll: Duration,
    /// Wait after boot before flushing startup output
    pub post_boot_settle: Duration,
    /// Wait after each command before collecting replies
    pub command_settle: Duration,
    /// Status query cadence while waiting for Idle
    pub status_poll: Duration,
    /// Give up waiting for Idle after this long
    pub idle_timeout: Duration,
    /// Pause before an unbounded loop starts
    pub loop_start_delay: Duration,
    /// Treat an idle timeout as fatal instead of carrying on
    pub stop_on_idle_timeout: bool,
}

impl Default for FluidNcConfig {
    fn default() -> Self {
        Self {
            banner: FLUIDNC_BANNER.to_string(),
            open_settle: Duration::from_millis(500),
            boot_window: Duration::from_secs(10),
            boot_poll: Duration::from_millis(200),
            post_boot_settle: Duration::from_secs(2),
            command_settle: Duration::from_millis(250),
            status_poll: Duration::from_millis(250),
            idle_timeout: Duration::from_secs(10),
            loop_start_delay: Duration::from_secs(2),
            stop_on_idle_timeout: false,
        }
    }
}

/// Run the whole jog test on an already open session.
///
/// Boot failure is returned as `ControllerError::BootTimeout` before any
/// command is written. Cancellation during the boot scan stops the run
/// without writing anything. The caller owns teardown and must close the
/// session on every path.
pub async fn run_jog_test(
    session: &mut ControllerSession,
    jog: &JogCommand,
    cycles: CycleCount,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let config = session.config().clone();

    let boot = session.await_boot(config.boot_window, cancel).await?;
    if cancel.is_cancelled() {
        return Ok(JogCycleRunner::stopped_before_start(session.listener()));
    }
    if !boot.is_booted() {
        return Err(ControllerError::BootTimeout {
            banner: config.banner.clone(),
            window_ms: config.boot_window.as_millis() as u64,
        }
        .into());
    }

    session.clock().sleep(config.post_boot_settle).await;
    session.drain()?;

    if cancel.is_cancelled() {
        return Ok(JogCycleRunner::stopped_before_start(session.listener()));
    }

    session.unlock().await?;

    if cycles.is_unbounded() {
        session
            .listener()
            .on_notice(&Notice::LoopStartDelay(config.loop_start_delay));
        session.clock().sleep(config.loop_start_delay).await;
    }

    let runner = JogCycleRunner::new(cycles, session.listener().clone())
        .with_stop_on_idle_timeout(config.stop_on_idle_timeout, config.idle_timeout);
    let poller = IdlePoller::from_config(&config);
    let mut driver = SessionDriver::new(session, poller);
    runner.run(&mut driver, jog, cancel).await
}
