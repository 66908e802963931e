//! # fluidjog Communication
//!
//! Serial transport and the FluidNC jog protocol for fluidjog.
//! The transport layer only moves bytes and lines; everything that knows
//! about banners, `$X`, `$J=` and status frames lives under [`firmware`].

pub mod communication;
pub mod firmware;

pub use communication::{
    default_port, list_ports, ConnectionParams, LineReader, MockTransport, MockTransportHandle,
    RealSerialPort, SerialPortInfo, Transport, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS,
};

pub use firmware::{
    run_jog_test, ControllerSession, FluidNcConfig, IdleOutcome, IdlePoller, JogCycleRunner,
    JogDriver, RunOutcome, RunSummary, SessionDriver,
};
