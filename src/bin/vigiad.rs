use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigia::{
    ChatId,
    actors::monitor::MonitorHandle,
    config::read_config_file,
    notify::WebhookNotifier,
    providers::{CompositeProvider, docker::DockerProvider, system::SystemProvider},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (falls back to the VIGIA_CONFIG environment variable)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("vigia", LevelFilter::TRACE),
        ("vigiad", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args
        .file
        .or_else(|| std::env::var("VIGIA_CONFIG").ok())
        .context("no config file provided, pass -f or set VIGIA_CONFIG")?;

    let config = read_config_file(&path).context("failed to load configuration")?;

    let system = SystemProvider::new(config.disk_mounts.clone());
    let docker = config.docker.as_ref().map(DockerProvider::new);
    if docker.is_some() {
        debug!("docker metrics enabled");
    }
    let provider = Arc::new(CompositeProvider::new(system, docker));

    let notifier = Arc::new(WebhookNotifier::new(&config.webhook));

    // Allowed users double as the initial notification fan-out.
    let recipients: Vec<ChatId> = config
        .allowed_users
        .iter()
        .map(|user| ChatId(user.0))
        .collect();

    let monitor = MonitorHandle::spawn(
        &config.monitor,
        config.thresholds.clone(),
        recipients,
        provider,
        notifier,
    );

    info!(
        "monitoring every {}s with {} thresholds",
        config.monitor.check_interval_seconds,
        config.thresholds.len()
    );

    shutdown_signal().await;

    monitor.stop().await?;
    info!("shut down cleanly");

    Ok(())
}

/// Wait for SIGINT or SIGTERM so the daemon stops cleanly whether run
/// interactively or under a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => debug!("received ctrl-c, shutting down"),
        () = terminate => debug!("received sigterm, shutting down"),
    }
}
