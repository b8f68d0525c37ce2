use crate::ipc::{IpcCommand, IpcResponse};
use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// How long a client connection waits for the daemon loop to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed command plus the channel its response travels back on.
pub struct IpcRequest {
    pub command: IpcCommand,
    pub reply: oneshot::Sender<IpcResponse>,
}

/// Start the IPC server on the loopback interface.
///
/// Returns a receiver for incoming requests; the daemon loop answers each
/// one through the request's reply channel.
pub async fn start_server(port: u16) -> Result<mpsc::UnboundedReceiver<IpcRequest>> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {} (is another instance running?)", addr))?;

    info!("IPC listening on {}", addr);

    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn task to accept connections
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let tx_clone = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, tx_clone).await {
                            debug!("Client {} connection error: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    });

    Ok(rx)
}

/// Handle a single client connection: one command, one response.
async fn handle_client(stream: TcpStream, tx: mpsc::UnboundedSender<IpcRequest>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;

    let response = match line.parse::<IpcCommand>() {
        Ok(command) => {
            debug!("Received IPC command: {:?}", command);

            let (reply_tx, reply_rx) = oneshot::channel();
            let request = IpcRequest {
                command,
                reply: reply_tx,
            };

            if tx.send(request).is_err() {
                IpcResponse::Error("Daemon is shutting down".to_string())
            } else {
                match tokio::time::timeout(REPLY_TIMEOUT, reply_rx).await {
                    Ok(Ok(response)) => response,
                    Ok(Err(_)) => IpcResponse::Error("Daemon dropped the request".to_string()),
                    Err(_) => IpcResponse::Error("Timed out waiting for the daemon".to_string()),
                }
            }
        }
        Err(_) => {
            warn!("Unknown IPC command: {}", line.trim());
            IpcResponse::Error(format!("Unknown command: {}", line.trim()))
        }
    };

    // Send response
    let response_json = serde_json::to_string(&response)?;
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    Ok(())
}
