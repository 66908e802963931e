//! Firmware protocol implementations
//!
//! Supported controllers:
//! - FluidNC (and GRBL-compatible firmware that prints a recognisable banner)

pub mod fluidnc;

pub use fluidnc::{
    run_jog_test, ControllerSession, FluidNcConfig, IdleOutcome, IdlePoller, JogCycleRunner,
    JogDriver, RunOutcome, RunSummary, SessionDriver,
};
