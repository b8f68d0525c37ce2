use crate::ipc::{IpcCommand, IpcResponse};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Send a command to the daemon and get the response
pub fn send_command(port: u16, command: IpcCommand) -> Result<IpcResponse> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

    let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).with_context(|| {
        format!(
            "Failed to connect to daemon at {}. Is the daemon running?",
            addr
        )
    })?;

    // Set timeouts
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    // Send command as simple string
    writeln!(stream, "{}", command)?;
    stream.flush()?;

    // Read response
    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: IpcResponse =
        serde_json::from_str(&response_line).context("Failed to parse daemon response")?;

    Ok(response)
}

/// Send command and print result, exit with appropriate code
pub fn send_command_and_exit(port: u16, command: IpcCommand) -> ! {
    match send_command(port, command) {
        Ok(IpcResponse::Ok) => {
            std::process::exit(0);
        }
        Ok(IpcResponse::Status {
            running,
            target_count,
            current_index,
        }) => {
            println!("Daemon Status:");
            println!("  Running: {}", running);
            println!("  Target count: {}", target_count);
            println!("  Current index: {}", current_index);
            std::process::exit(0);
        }
        Ok(IpcResponse::Targets(targets)) => {
            for target in targets {
                println!("{}", target);
            }
            std::process::exit(0);
        }
        Ok(IpcResponse::Windows(titles)) => {
            for title in titles {
                println!("{}", title);
            }
            std::process::exit(0);
        }
        Ok(IpcResponse::Error(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
