//! `carpenter-bot` CLI: load a project's build plan and replay it over RCON.
//!
//! ```bash
//! # Anchor at the nearest player, default plan file
//! RCON_PASSWORD=... carpenter-bot castle
//!
//! # Explicit origin and plan file
//! carpenter-bot castle 120 64 -40 full_build.json
//! ```

use std::process::ExitCode;

use carpenter_bot::cli::{exit_code, parse_trailing, Cli};
use carpenter_bot::{BuildError, BuildPlan, BuildRun, OriginSpec, RconAgent, RunReport, StatusReporter};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(&cli).await;
    if let Err(e) = &result {
        error!(error = %e, "carpenter-bot failed");
    }
    ExitCode::from(exit_code(&result, cli.fail_on_abort))
}

async fn run(cli: &Cli) -> Result<RunReport, BuildError> {
    let invocation = parse_trailing(&cli.rest)?;

    let plan_path = cli.plan_path(&invocation);
    let plan = BuildPlan::load(&plan_path)?;
    info!(
        project = %cli.project,
        path = %plan_path.display(),
        instructions = plan.len(),
        "loaded build plan"
    );

    let settings = cli.rcon_settings()?;

    let status = match &cli.status_pipe {
        Some(name) => StatusReporter::connect(name).unwrap_or_else(|e| {
            warn!(pipe = %name, error = %e, "status channel unavailable; continuing without it");
            StatusReporter::disabled()
        }),
        None => StatusReporter::disabled(),
    };

    let (agent, events) = RconAgent::connect(&settings, cli.agent.clone()).await?;
    let mut run = BuildRun::new(agent, events, cli.pacing()).with_status(status);
    run.execute(OriginSpec::from_coords(invocation.origin), plan).await
}
