mod backend;
mod config;
mod daemon;
mod directory;
mod ipc;
mod socket_client;
mod socket_server;
mod switcher_service;

use anyhow::Result;
use config::{Command, Config};
use daemon::Daemon;
use directory::WindowDirectory;
use ipc::IpcCommand;
use std::time::Duration;
use switcher_service::SwitcherService;
use tracing::info;

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize logging
    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let port = config.port;
    match config.command() {
        Command::Daemon => run_daemon(config),
        Command::Start => socket_client::send_command_and_exit(port, IpcCommand::Start),
        Command::Stop => socket_client::send_command_and_exit(port, IpcCommand::Stop),
        Command::Status => socket_client::send_command_and_exit(port, IpcCommand::Status),
        Command::Add { fragment } => {
            socket_client::send_command_and_exit(port, IpcCommand::Add(fragment.join(" ")))
        }
        Command::Remove { fragment } => {
            socket_client::send_command_and_exit(port, IpcCommand::Remove(fragment.join(" ")))
        }
        Command::Clear => socket_client::send_command_and_exit(port, IpcCommand::Clear),
        Command::Targets => socket_client::send_command_and_exit(port, IpcCommand::Targets),
        Command::Windows => socket_client::send_command_and_exit(port, IpcCommand::Windows),
        Command::Shutdown => socket_client::send_command_and_exit(port, IpcCommand::Shutdown),
    }
}

fn run_daemon(config: Config) -> Result<()> {
    anyhow::ensure!(config.interval > 0, "Interval must be greater than zero");

    info!("Starting win-rotator daemon");
    info!(
        "Interval: {} ms, initial targets: {:?}",
        config.interval, config.targets
    );

    // Fatal when the host has no supported window system; there is no
    // degraded mode to fall back to.
    let backend = backend::native_backend()?;
    let directory = WindowDirectory::new(backend);

    let mut service = SwitcherService::new(directory, config.targets.clone());
    service.set_status_callback(|running| {
        info!("Rotation {}", if running { "running" } else { "stopped" });
    });
    service.set_targets_callback(|targets| {
        info!("Targets now: {:?}", targets);
    });

    // The service holds non-Send observers, so the daemon future stays on
    // this thread via block_on rather than spawn.
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let requests = socket_server::start_server(config.port).await?;
        let daemon = Daemon::new(service, Duration::from_millis(config.interval));
        daemon.run(requests).await
    })?;

    info!("Daemon exited");
    Ok(())
}
