//! agent-canary command line entry point

mod cli;

use agent_canary::config::{load_from_yaml, CanaryConfig};
use agent_canary::observability::init_logging;
use agent_canary::{CanaryRunner, ObservabilityManager, RunSummary};
use anyhow::Context as _;
use clap::Parser;
use cli::{Args, OutputFormat};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut config = load_from_yaml(&args.config).with_context(|| {
        format!("Failed to load configuration from {}", args.config.display())
    })?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        config = %args.config.display(),
        mode = %config.mode,
        agent = %config.agent.agent_name,
        scenarios = ?config.scenarios,
        "Starting agent canary"
    );

    // Exporters are built and driven from blocking threads: the gRPC transport
    // needs the runtime handle, the HTTP transport uses a blocking client.
    let observability = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || build_observability(&config))
            .await
            .context("Telemetry setup task failed")?
    };

    let runner_observability = observability.clone();
    let work = tokio::task::spawn_blocking(move || {
        CanaryRunner::from_config(config)
            .with_observability(runner_observability)
            .run()
    });

    let outcome = tokio::select! {
        joined = work => joined.context("Canary run task failed")?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, flushing telemetry");
            shutdown(observability).await;
            std::process::exit(1);
        }
    };

    let code = match outcome {
        Ok(summary) => {
            print_report(&summary, args.output)?;
            summary.exit_code()
        }
        Err(e) => {
            error!(error = %e, "Canary run aborted");
            1
        }
    };

    shutdown(observability).await;
    Ok(if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_observability(config: &CanaryConfig) -> ObservabilityManager {
    match ObservabilityManager::from_otlp(&config.otlp, config.service_name()) {
        Ok(manager) => manager,
        Err(e) => {
            warn!(
                endpoint = %config.otlp.endpoint,
                error = %e,
                "OTLP export unavailable, telemetry disabled"
            );
            ObservabilityManager::disabled()
        }
    }
}

async fn shutdown(observability: ObservabilityManager) {
    if let Err(e) = tokio::task::spawn_blocking(move || observability.shutdown()).await {
        warn!(error = %e, "Telemetry shutdown task failed");
    }
}

fn print_report(summary: &RunSummary, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Text => print!("{}", summary.format_report()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?
        ),
    }
    Ok(())
}
