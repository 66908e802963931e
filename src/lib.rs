//! # fluidjog
//!
//! Serial jog tester for FluidNC and GRBL-compatible CNC controllers. Opens
//! the controller's serial port, waits for the firmware boot banner, unlocks
//! the machine, then jogs one axis forward and back for a number of cycles
//! while echoing the protocol transcript.
//!
//! ## Architecture
//!
//! 1. **fluidjog-core** - Axes, jog command generation, errors, clock, listener
//! 2. **fluidjog-communication** - Serial transport, line framing, FluidNC session
//! 3. **fluidjog-settings** - Config file model and loading
//! 4. **fluidjog** - Command line binary tying them together

pub mod app;
pub mod cli;
pub mod console;

pub use app::{
    execute, exit_code, load_config, plan, print_ports, session_config, RunPlan, EXIT_BOOT,
    EXIT_CONNECTION, EXIT_FAILURE,
};
pub use cli::Args;
pub use console::ConsoleListener;

pub use fluidjog_communication::{RunOutcome, RunSummary};
pub use fluidjog_core::{Error, Result};

/// Install the tracing subscriber.
///
/// Diagnostics go to stderr so they never interleave with the operator
/// transcript on stdout. `RUST_LOG` overrides the default `warn` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
