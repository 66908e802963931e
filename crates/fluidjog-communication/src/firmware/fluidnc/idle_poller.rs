//! Idle polling
//!
//! Sends `?` on a fixed cadence and watches the replies until the controller
//! reports Idle, the timeout runs out, or the run is cancelled.

use super::{ControllerSession, FluidNcConfig};
use fluidjog_core::{ControllerStatus, Notice, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a wait for Idle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// An Idle status was observed
    Idle,
    /// No Idle status before the timeout
    TimedOut,
    /// Cancellation was requested between poll iterations
    Cancelled,
}

/// Status poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePoller {
    interval: Duration,
    timeout: Duration,
}

impl IdlePoller {
    /// Create a poller with the given cadence and overall timeout
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Poller using the session timings
    pub fn from_config(config: &FluidNcConfig) -> Self {
        Self::new(config.status_poll, config.idle_timeout)
    }

    /// Block until the controller reports Idle.
    ///
    /// The first line containing the idle marker ends the wait; lines queued
    /// behind it stay unread in the session. A timeout is reported and
    /// returned as [`IdleOutcome::TimedOut`], not as an error.
    pub async fn wait_for_idle(
        &self,
        session: &mut ControllerSession,
        cancel: &CancellationToken,
    ) -> Result<IdleOutcome> {
        let clock = session.clock().clone();
        let listener = session.listener().clone();
        let start = clock.now();
        let mut jog_reported = false;

        while clock.elapsed_since(start) < self.timeout {
            if cancel.is_cancelled() {
                tracing::debug!("Idle wait cancelled");
                return Ok(IdleOutcome::Cancelled);
            }

            session.request_status()?;
            clock.sleep(self.interval).await;

            while let Some(line) = session.next_line()? {
                match ControllerStatus::classify(&line) {
                    ControllerStatus::Idle => {
                        tracing::debug!(
                            elapsed_ms = clock.elapsed_since(start).as_millis() as u64,
                            "Controller idle"
                        );
                        listener.on_notice(&Notice::JogComplete);
                        return Ok(IdleOutcome::Idle);
                    }
                    ControllerStatus::Jog if !jog_reported => {
                        jog_reported = true;
                        listener.on_notice(&Notice::Jogging);
                    }
                    _ => tracing::trace!(line = %line, "Ignored while polling"),
                }
            }
        }

        tracing::warn!(
            timeout_ms = self.timeout.as_millis() as u64,
            "Timeout waiting for Idle"
        );
        listener.on_notice(&Notice::IdleTimeout(self.timeout));
        Ok(IdleOutcome::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::{MockTransport, MockTransportHandle};
    use fluidjog_core::{ManualClock, RecordingListener};
    use std::sync::Arc;

    async fn mock_session() -> (
        ControllerSession,
        MockTransportHandle,
        Arc<ManualClock>,
        Arc<RecordingListener>,
    ) {
        let (transport, handle) = MockTransport::new("mock");
        let clock = Arc::new(ManualClock::new());
        let listener = Arc::new(RecordingListener::new());
        let session = ControllerSession::attach(
            Box::new(transport),
            FluidNcConfig::default(),
            clock.clone(),
            listener.clone(),
        )
        .await;
        (session, handle, clock, listener)
    }

    fn poller() -> IdlePoller {
        IdlePoller::from_config(&FluidNcConfig::default())
    }

    #[tokio::test]
    async fn test_first_idle_wins() {
        let (mut session, handle, _clock, listener) = mock_session().await;
        handle.push_line("<Jog|MPos:5.000,0.000,0.000|FS:1000,0>");
        handle.push_line("<Idle|MPos:25.400,0.000,0.000|FS:0,0>");
        handle.push_line("<Jog|MPos:25.400,0.000,0.000|FS:1000,0>");

        let outcome = poller()
            .wait_for_idle(&mut session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, IdleOutcome::Idle);
        assert_eq!(handle.writes(), vec!["?\n"]);
        assert_eq!(
            listener.notices(),
            vec![Notice::Jogging, Notice::JogComplete]
        );
        // The frame after Idle was not consumed
        assert_eq!(
            session.next_line().unwrap().as_deref(),
            Some("<Jog|MPos:25.400,0.000,0.000|FS:1000,0>")
        );
    }

    #[tokio::test]
    async fn test_times_out_without_idle() {
        let (mut session, handle, clock, listener) = mock_session().await;
        handle.reply_always("?", "<Jog|MPos:1.000,0.000,0.000|FS:1000,0>\n");
        let before = clock.elapsed();

        let outcome = poller()
            .wait_for_idle(&mut session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, IdleOutcome::TimedOut);
        assert_eq!(clock.elapsed() - before, Duration::from_secs(10));
        // 10s at a 250ms cadence
        assert_eq!(handle.writes_starting_with("?").len(), 40);
        // Jogging is announced once per wait
        assert_eq!(
            listener.notices(),
            vec![
                Notice::Jogging,
                Notice::IdleTimeout(Duration::from_secs(10))
            ]
        );
    }

    #[tokio::test]
    async fn test_idle_after_several_polls() {
        let (mut session, handle, clock, _listener) = mock_session().await;
        handle.reply_times("?", "<Jog|MPos:1.000,0.000,0.000|FS:1000,0>\n", 3);
        handle.reply_always("?", "<Idle|MPos:25.400,0.000,0.000|FS:0,0>\n");
        let before = clock.elapsed();

        let outcome = poller()
            .wait_for_idle(&mut session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, IdleOutcome::Idle);
        assert_eq!(handle.writes_starting_with("?").len(), 4);
        assert_eq!(clock.elapsed() - before, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_other_lines_ignored() {
        let (mut session, handle, _clock, listener) = mock_session().await;
        handle.push_line("ok");
        handle.push_line("[MSG:INFO: something]");
        handle.push_line("<Run|MPos:1.000,0.000,0.000|FS:1000,0>");
        handle.reply_always("?", "<Idle|MPos:0.000,0.000,0.000|FS:0,0>\n");

        let outcome = poller()
            .wait_for_idle(&mut session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, IdleOutcome::Idle);
        assert!(listener.inbound().is_empty());
        assert_eq!(listener.notices(), vec![Notice::JogComplete]);
    }

    #[tokio::test]
    async fn test_cancelled_before_polling() {
        let (mut session, handle, _clock, _listener) = mock_session().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poller().wait_for_idle(&mut session, &cancel).await.unwrap();
        assert_eq!(outcome, IdleOutcome::Cancelled);
        assert!(handle.writes().is_empty());
    }
}
