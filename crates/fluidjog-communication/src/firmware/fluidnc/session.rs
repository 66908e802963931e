//! FluidNC controller session
//!
//! Owns the serial channel for the lifetime of a run and implements the
//! handshake steps: boot banner detection, flushing startup noise, unlock, and
//! the generic "write a command, show what the device said" exchange.

use super::{FluidNcConfig, STATUS_QUERY, UNLOCK_COMMAND};
use crate::communication::{ConnectionParams, LineReader, RealSerialPort, Transport};
use fluidjog_core::{
    is_protocol_noise, BootState, Clock, ConnectionError, Error, Notice, Result, SessionListener,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Line terminator appended to every outbound command
const LINE_TERMINATOR: &str = "\n";

/// Exclusive owner of the controller connection
pub struct ControllerSession {
    transport: Option<Box<dyn Transport>>,
    reader: LineReader,
    config: FluidNcConfig,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn SessionListener>,
    boot_state: BootState,
}

impl ControllerSession {
    /// Open the serial port and wait for the reset line to settle.
    ///
    /// No retry: a port that cannot be opened is a configuration problem.
    pub async fn open(
        params: &ConnectionParams,
        config: FluidNcConfig,
        clock: Arc<dyn Clock>,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        listener.on_notice(&Notice::Connecting {
            port: params.port.clone(),
            baud_rate: params.baud_rate,
        });
        let port = RealSerialPort::open(params)?;
        Ok(Self::attach(Box::new(port), config, clock, listener).await)
    }

    /// Take ownership of an already open transport and apply the open settle delay
    pub async fn attach(
        transport: Box<dyn Transport>,
        config: FluidNcConfig,
        clock: Arc<dyn Clock>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        clock.sleep(config.open_settle).await;
        Self {
            transport: Some(transport),
            reader: LineReader::new(),
            config,
            clock,
            listener,
            boot_state: BootState::NotDetected,
        }
    }

    /// Session configuration
    pub fn config(&self) -> &FluidNcConfig {
        &self.config
    }

    /// Time source used for every wait
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Listener receiving transcript and notices
    pub fn listener(&self) -> &Arc<dyn SessionListener> {
        &self.listener
    }

    /// Whether the channel is still open
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Scan incoming lines for the boot banner for at most `window`.
    ///
    /// Every non-empty line seen is reported. Once the banner has been seen the
    /// scan is never repeated: later calls return `Detected` immediately.
    /// Cancellation ends the scan at the next poll and returns the state
    /// observed so far without reporting a boot failure.
    pub async fn await_boot(
        &mut self,
        window: Duration,
        cancel: &CancellationToken,
    ) -> Result<BootState> {
        if self.boot_state.is_booted() {
            return Ok(self.boot_state);
        }

        self.listener.on_notice(&Notice::WaitingForBoot);
        let start = self.clock.now();

        while self.clock.elapsed_since(start) < window {
            if cancel.is_cancelled() {
                tracing::debug!("Boot scan cancelled");
                return Ok(self.boot_state);
            }
            let Some(line) = self.next_line()? else {
                self.clock.sleep(self.config.boot_poll).await;
                continue;
            };
            if line.is_empty() {
                continue;
            }

            tracing::debug!(line = %line, "Boot scan");
            self.listener.on_inbound(&line);

            if line.contains(self.config.banner.as_str()) {
                self.boot_state = BootState::Detected;
                tracing::info!(
                    elapsed_ms = self.clock.elapsed_since(start).as_millis() as u64,
                    "Controller boot banner detected"
                );
                self.listener.on_notice(&Notice::Booted);
                return Ok(self.boot_state);
            }
        }

        tracing::warn!(
            banner = %self.config.banner,
            window_ms = window.as_millis() as u64,
            "No boot banner observed"
        );
        self.listener.on_notice(&Notice::BootFailed);
        Ok(self.boot_state)
    }

    /// Discard everything received so far. Returns the number of complete
    /// lines dropped.
    pub fn drain(&mut self) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;
        let filled = self.reader.fill_from(transport.as_mut());
        let dropped = self.reader.clear();
        filled.map_err(connection_lost)?;

        tracing::debug!(lines = dropped, "Drained startup output");
        Ok(dropped)
    }

    /// Write `command`, report it, wait the settle delay, then report every
    /// reply except status frames and bare `ok`.
    pub async fn send_and_log(&mut self, command: &str) -> Result<()> {
        self.write_line(command)?;
        self.listener.on_outbound(command);
        tracing::debug!(command = %command, "Sent");

        self.clock.sleep(self.config.command_settle).await;

        while let Some(line) = self.next_line()? {
            if line.is_empty() || is_protocol_noise(&line) {
                tracing::trace!(line = %line, "Suppressed");
                continue;
            }
            tracing::debug!(line = %line, "Received");
            self.listener.on_inbound(&line);
        }
        Ok(())
    }

    /// Send the unlock command. The reply is shown but not checked.
    pub async fn unlock(&mut self) -> Result<()> {
        self.send_and_log(UNLOCK_COMMAND).await?;
        tracing::info!("Unlock sent");
        self.listener.on_notice(&Notice::Unlocked);
        Ok(())
    }

    /// Write a status query without reporting it
    pub fn request_status(&mut self) -> Result<()> {
        self.write_line(STATUS_QUERY)
    }

    /// Write one line followed by the terminator
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{}{}", line, LINE_TERMINATOR);
        self.transport_mut()?
            .write(data.as_bytes())
            .map_err(connection_lost)
    }

    /// Next complete received line, reading from the channel if none is buffered
    pub fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.reader.next_line() {
            return Ok(Some(line));
        }
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;
        self.reader
            .fill_from(transport.as_mut())
            .map_err(connection_lost)?;
        Ok(self.reader.next_line())
    }

    /// Release the channel. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            tracing::debug!(port = %transport.name(), "Closing session");
            transport.close()?;
        }
        Ok(())
    }

    fn transport_mut(&mut self) -> Result<&mut Box<dyn Transport>> {
        self.transport
            .as_mut()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }
}

impl Drop for ControllerSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close session: {}", e);
        }
    }
}

fn connection_lost(e: io::Error) -> Error {
    ConnectionError::ConnectionLost {
        reason: e.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::{MockTransport, MockTransportHandle};
    use fluidjog_core::{ManualClock, RecordingListener};

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

    #[tokio::test]
    async fn test_attach_applies_open_settle() {
        let (session, _handle, clock, _listener) = mock_session().await;
        assert!(session.is_open());
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_send_and_log_filters_noise() {
        let (mut session, handle, _clock, listener) = mock_session().await;
        handle.reply_always(
            "$X",
            "ok\n<Idle|MPos:0.000,0.000,0.000>\n\n[MSG:Caution: Unlocked]\nerror:9\n",
        );

        session.send_and_log("$X").await.unwrap();

        assert_eq!(handle.writes(), vec!["$X\n"]);
        assert_eq!(listener.outbound(), vec!["$X".to_string()]);
        assert_eq!(
            listener.inbound(),
            vec!["[MSG:Caution: Unlocked]".to_string(), "error:9".to_string()]
        );
    }

    #[tokio::test]
    async fn test_await_boot_detects_banner() {
        let (mut session, handle, _clock, listener) = mock_session().await;
        handle.push_line("");
        handle.push_line("[MSG:INFO: Connecting to STA SSID:shop]");
        handle.push_line("Grbl 3.7 [FluidNC v3.7.8 (wifi) '$' for help]");
        handle.push_line("[MSG:INFO: '$H'|'$X' to unlock]");

        let state = session
            .await_boot(Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state, BootState::Detected);
        assert_eq!(
            listener.inbound(),
            vec![
                "[MSG:INFO: Connecting to STA SSID:shop]".to_string(),
                "Grbl 3.7 [FluidNC v3.7.8 (wifi) '$' for help]".to_string(),
            ]
        );
        assert!(listener.notices().contains(&Notice::Booted));

        // Single shot: a second call does not scan again
        handle.push_line("Grbl 3.7 [FluidNC v3.7.8 (wifi) '$' for help]");
        let state = session
            .await_boot(Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state, BootState::Detected);
        assert_eq!(listener.inbound().len(), 2);
    }

    #[tokio::test]
    async fn test_await_boot_times_out() {
        let (mut session, handle, clock, listener) = mock_session().await;
        handle.push_line("Grbl 1.1h ['$' for help]");
        let before = clock.elapsed();

        let state = session
            .await_boot(Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state, BootState::NotDetected);
        assert!(clock.elapsed() - before >= Duration::from_secs(10));
        assert!(listener.notices().contains(&Notice::BootFailed));
    }

    #[tokio::test]
    async fn test_await_boot_stops_on_cancel() {
        let (mut session, handle, clock, listener) = mock_session().await;
        let before = clock.elapsed();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let state = session
            .await_boot(Duration::from_secs(10), &cancel)
            .await
            .unwrap();
        assert_eq!(state, BootState::NotDetected);
        assert_eq!(clock.elapsed(), before);
        assert!(!listener.notices().contains(&Notice::BootFailed));
        assert!(handle.writes().is_empty());
    }

    #[tokio::test]
    async fn test_drain_discards_buffered_lines() {
        let (mut session, handle, _clock, listener) = mock_session().await;
        handle.push_inbound(b"[MSG:INFO: Heap 120000]\n[MSG:INFO: Axis count 3]\npartial");

        assert_eq!(session.drain().unwrap(), 2);
        assert_eq!(session.next_line().unwrap(), None);
        assert!(listener.inbound().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut session, handle, _clock, _listener) = mock_session().await;
        session.close().unwrap();
        session.close().unwrap();
        assert!(!session.is_open());
        assert_eq!(handle.close_calls(), 1);

        assert!(matches!(
            session.write_line("?"),
            Err(Error::Connection(ConnectionError::NotConnected))
        ));
        drop(session);
        assert_eq!(handle.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_drop_closes_transport() {
        let (session, handle, _clock, _listener) = mock_session().await;
        drop(session);
        assert!(handle.is_closed());
    }
}
