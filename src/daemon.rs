use crate::backend::WindowBackend;
use crate::ipc::{IpcCommand, IpcResponse};
use crate::socket_server::IpcRequest;
use crate::switcher_service::SwitcherService;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info};

/// Drives the rotation service from a periodic ticker and serves IPC
/// commands between ticks.
///
/// The ticker arm is guarded by the running flag, so stopping the service
/// cancels the cadence without tearing anything down; starting again
/// resets the ticker so the next switch lands a full period later.
pub struct Daemon<B: WindowBackend> {
    service: SwitcherService<B>,
    period: Duration,
}

impl<B: WindowBackend> Daemon<B> {
    pub fn new(service: SwitcherService<B>, period: Duration) -> Self {
        Daemon { service, period }
    }

    /// Main event loop
    pub async fn run(mut self, mut requests: mpsc::UnboundedReceiver<IpcRequest>) -> Result<()> {
        info!(
            "Starting daemon event loop (period {} ms)",
            self.period.as_millis()
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick(), if self.service.is_running() => {
                    self.service.switch_to_next();
                }
                request = requests.recv() => {
                    let Some(request) = request else {
                        info!("IPC channel closed, shutting down");
                        break;
                    };

                    debug!("Handling command: {:?}", request.command);
                    let shutdown = matches!(request.command, IpcCommand::Shutdown);
                    let response = self.handle_command(request.command, &mut ticker);
                    // The client may have given up already; that's fine.
                    let _ = request.reply.send(response);

                    if shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, command: IpcCommand, ticker: &mut Interval) -> IpcResponse {
        match command {
            IpcCommand::Start => {
                self.service.start();
                // The first switch happens right away; the periodic cadence
                // begins one full period from now.
                self.service.switch_to_next();
                ticker.reset();
                IpcResponse::Ok
            }
            IpcCommand::Stop => {
                self.service.stop();
                IpcResponse::Ok
            }
            IpcCommand::Status => IpcResponse::Status {
                running: self.service.is_running(),
                target_count: self.service.targets().len(),
                current_index: self.service.current_index(),
            },
            IpcCommand::Add(fragment) => {
                if self.service.add_target(&fragment) {
                    IpcResponse::Ok
                } else {
                    IpcResponse::Error(format!("Target already present: {}", fragment))
                }
            }
            IpcCommand::Remove(fragment) => {
                if self.service.remove_target(&fragment) {
                    IpcResponse::Ok
                } else {
                    IpcResponse::Error(format!("No such target: {}", fragment))
                }
            }
            IpcCommand::Clear => {
                self.service.clear_targets();
                IpcResponse::Ok
            }
            IpcCommand::Targets => IpcResponse::Targets(self.service.targets()),
            IpcCommand::Windows => match self.service.application_windows() {
                Ok(titles) => IpcResponse::Windows(titles),
                Err(e) => IpcResponse::Error(format!("{:#}", e)),
            },
            IpcCommand::Shutdown => {
                self.service.stop();
                IpcResponse::Ok
            }
        }
    }
}
