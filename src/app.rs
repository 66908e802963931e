//! Run orchestration for the command line
//!
//! Turns parsed arguments and the config file into a [`RunPlan`], then drives
//! one jog test over a real serial port.

use crate::cli::Args;
use anyhow::{anyhow, Context};
use fluidjog_communication::{
    default_port, list_ports, run_jog_test, ConnectionParams, ControllerSession, FluidNcConfig,
    RunSummary,
};
use fluidjog_core::{to_mm, CycleCount, Error, JogCommand, SessionListener, TokioClock};
use fluidjog_settings::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit status for a serial port that could not be opened or was lost
pub const EXIT_CONNECTION: u8 = 2;

/// Exit status for a controller that never printed its boot banner
pub const EXIT_BOOT: u8 = 3;

/// Exit status for everything else (bad arguments, bad config)
pub const EXIT_FAILURE: u8 = 1;

/// Everything needed to run one jog test
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub params: ConnectionParams,
    pub session: FluidNcConfig,
    pub jog: JogCommand,
    pub cycles: CycleCount,
}

/// Load `path`, or the per-user config file when no path is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

/// Protocol timings from the config file
pub fn session_config(config: &Config) -> FluidNcConfig {
    let t = &config.timing;
    FluidNcConfig {
        banner: config.machine.boot_banner.clone(),
        open_settle: Duration::from_millis(t.open_settle_ms),
        boot_window: Duration::from_millis(t.boot_window_ms),
        boot_poll: Duration::from_millis(t.boot_poll_ms),
        post_boot_settle: Duration::from_millis(t.post_boot_settle_ms),
        command_settle: Duration::from_millis(t.command_settle_ms),
        status_poll: Duration::from_millis(t.status_poll_ms),
        idle_timeout: Duration::from_millis(t.idle_timeout_ms),
        loop_start_delay: Duration::from_millis(t.loop_start_delay_ms),
        stop_on_idle_timeout: config.safety.stop_on_idle_timeout,
    }
}

/// Resolve arguments against the config. Flags win over the file, the file
/// wins over built-in defaults.
pub fn plan(args: &Args, config: &Config) -> anyhow::Result<RunPlan> {
    let axis = args.axis.ok_or_else(|| anyhow!("--axis is required"))?;
    let distance = args
        .distance
        .ok_or_else(|| anyhow!("--distance is required"))?;

    let port = args
        .port
        .clone()
        .or_else(|| config.connection.port.clone())
        .unwrap_or_else(|| default_port().to_string());
    let baud_rate = args.baud.unwrap_or(config.connection.baud_rate);
    if baud_rate == 0 {
        return Err(anyhow!("Baud rate must be > 0"));
    }
    let params = ConnectionParams::new(port)
        .with_baud_rate(baud_rate)
        .with_timeout_ms(config.connection.read_timeout_ms);

    let limits = config.feedrate_limits()?;
    let jog = JogCommand::generate(axis, to_mm(distance, args.units), args.speed, &limits)?;

    Ok(RunPlan {
        params,
        session: session_config(config),
        jog,
        cycles: CycleCount::from(args.cycles),
    })
}

/// Open the port, run the test, and close the port on every path
pub async fn execute(
    plan: &RunPlan,
    listener: Arc<dyn SessionListener>,
    cancel: &CancellationToken,
) -> anyhow::Result<RunSummary> {
    tracing::info!(
        port = %plan.params.port,
        baud = plan.params.baud_rate,
        forward = %plan.jog.forward(),
        cycles = %plan.cycles,
        "Starting jog test"
    );

    let mut session = ControllerSession::open(
        &plan.params,
        plan.session.clone(),
        Arc::new(TokioClock),
        listener,
    )
    .await?;

    let result = run_jog_test(&mut session, &plan.jog, plan.cycles, cancel).await;

    if let Err(e) = session.close() {
        tracing::warn!("Failed to close {}: {}", plan.params.port, e);
    }
    Ok(result?)
}

/// Print detected CNC serial ports
pub fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No CNC serial ports found.");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}\t{} [{:04x}:{:04x}]",
                port.port_name, port.description, vid, pid
            ),
            _ => println!("{}\t{}", port.port_name, port.description),
        }
    }
    Ok(())
}

/// Process exit status for a failed run
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_connection_error() => EXIT_CONNECTION,
        Some(e) if e.is_boot_timeout() => EXIT_BOOT,
        _ => EXIT_FAILURE,
    }
}
