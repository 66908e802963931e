use clap::Parser;
use fluidjog::{
    execute, exit_code, init_logging, load_config, plan, print_ports, Args, ConsoleListener,
    RunOutcome, EXIT_FAILURE,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_FAILURE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.list_ports {
        return print_ports();
    }

    let config = load_config(args.config.as_deref())?;
    let plan = plan(&args, &config)?;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current step");
            token.cancel();
        }
    });

    let summary = execute(&plan, Arc::new(ConsoleListener::stdout()), &cancel).await?;
    tracing::info!(
        cycles = summary.cycles_completed,
        idle_timeouts = summary.idle_timeouts,
        stopped = summary.outcome == RunOutcome::Stopped,
        "Jog test finished"
    );
    Ok(())
}
