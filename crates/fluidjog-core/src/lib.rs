//! # fluidjog Core
//!
//! Core types, traits, and utilities for fluidjog.
//! Provides the error taxonomy, jog command generation, controller status
//! classification, the injectable clock, and the session listener interface.

pub mod clock;
pub mod data;
pub mod error;
pub mod jog;
pub mod listener;
pub mod units;

pub use clock::{Clock, ManualClock, TokioClock};

pub use data::{
    is_protocol_noise, Axis, BootState, ControllerStatus, CycleCount, ACK_TOKEN, IDLE_MARKER,
    JOG_MARKER, STATUS_FRAME_PREFIX,
};

pub use error::{ConnectionError, ControllerError, Error, JogError, Result};

pub use jog::{FeedrateLimits, JogCommand};

pub use listener::{NoOpListener, Notice, RecordingListener, SessionEvent, SessionListener};

pub use units::{inches_to_mm, to_mm, MeasurementSystem, MM_PER_INCH};
