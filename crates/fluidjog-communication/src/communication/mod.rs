//! Communication layer
//!
//! Byte-level transport to the controller plus line framing on top of it.
//! The protocol code only ever sees the [`Transport`] trait, so a real serial
//! port and the in-memory [`mock::MockTransport`] are interchangeable.

pub mod line_reader;
pub mod mock;
pub mod serial;

use std::io;

pub use line_reader::LineReader;
pub use mock::{MockTransport, MockTransportHandle};
pub use serial::{default_port, list_ports, RealSerialPort, SerialPortInfo};

/// Default baud rate for FluidNC/GRBL controllers
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default blocking read timeout (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

/// Bidirectional byte stream to a controller
///
/// Reads never block waiting for data: when nothing is buffered they return
/// `Ok(0)`.
pub trait Transport: Send {
    /// Write all of `data` and flush
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is currently available into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Port or device name
    fn name(&self) -> &str;

    /// Release the underlying device. Calling it twice is harmless.
    fn close(&mut self) -> io::Result<()>;
}

/// Serial connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl ConnectionParams {
    /// Create parameters for `port` with default baud rate and timeout
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set read timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_params_builder() {
        let params = ConnectionParams::new("/dev/ttyACM0")
            .with_baud_rate(250_000)
            .with_timeout_ms(500);
        assert_eq!(params.port, "/dev/ttyACM0");
        assert_eq!(params.baud_rate, 250_000);
        assert_eq!(params.timeout_ms, 500);
    }

    #[test]
    fn test_connection_params_default() {
        let params = ConnectionParams::default();
        assert_eq!(params.port, default_port());
        assert_eq!(params.baud_rate, 115_200);
        assert_eq!(params.timeout_ms, 2000);
    }
}
