use crate::{env::EnvManager, error::CliError, shutdown::ShutdownCoordinator};
use clap::Parser;
use commands::Commands;
use engine_config::settings::BridgeConfig;
use engine_processing::{
    decoder, state_manager::CursorStore, transform::mapping::EventMapper,
};
use engine_runtime::{
    actor::scheduler::{TickScheduler, log_summary},
    execution::{factory, orchestrator::StreamOrchestrator},
};
use model::core::identifiers::ShardId;
use std::{path::Path, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "kinesis-bridge",
    version = "0.1.0",
    about = "Forwards Kinesis records as analytics events"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            env_file,
            dry_run,
        } => {
            let config = load_config(&config, env_file.as_deref())?;
            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            let orchestrator =
                StreamOrchestrator::setup(&config, dry_run, shutdown.cancel_token()).await?;
            let scheduler = TickScheduler::new(
                Arc::new(orchestrator),
                config.poll_interval(),
                shutdown.cancel_token(),
            );
            let cycles = scheduler.run().await;

            if shutdown.is_shutdown_requested() {
                info!(cycles, "Stopped after shutdown signal");
            }
        }
        Commands::PollOnce {
            config,
            env_file,
            dry_run,
        } => {
            let config = load_config(&config, env_file.as_deref())?;
            let orchestrator =
                StreamOrchestrator::setup(&config, dry_run, CancellationToken::new()).await?;

            let outcomes = orchestrator.poll_once().await?.wait().await;
            log_summary(&outcomes, &orchestrator.context().metrics);
            output::print_outcomes(&outcomes)?;
        }
        Commands::Cursor { config, shard } => {
            let config = load_config(&config, None)?;
            let store = CursorStore::new(
                factory::open_cache(&config)?,
                Duration::from_secs(config.cursor_ttl_secs),
            );

            let key = CursorStore::cursor_key(&config.stream_name, &ShardId::from(shard));
            match store.load(&key).await? {
                Some(cursor) => println!("{key}: {}", cursor.as_str()),
                None => println!("{key}: no cursor (next cycle starts at LATEST)"),
            }
            if let Some(resume) = store.load_resume(&key).await? {
                println!("resume position: {resume}");
            }
        }
        Commands::Map {
            event_key,
            mappings,
            payload,
        } => {
            let bytes = tokio::fs::read(&payload).await?;
            let decoded = decoder::try_decode(&bytes)?;
            let mapper = EventMapper::from_config(&event_key, &mappings)?;
            output::print_event(mapper.map(&decoded).as_ref())?;
        }
    }

    Ok(())
}

fn load_config(path: &str, env_file: Option<&str>) -> Result<BridgeConfig, CliError> {
    let mut env = EnvManager::new();
    if let Some(env_file) = env_file {
        env.load_from_file(Path::new(env_file))?;
    }
    for (key, value) in env.overrides() {
        debug!(key = %key, value = %value, "Environment override");
    }

    let config = BridgeConfig::load(path, env.all())?;
    info!(path, stream = %config.stream_name, "Configuration loaded");
    Ok(config)
}
