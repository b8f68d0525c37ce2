use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default loopback port the daemon listens on.
pub const DEFAULT_PORT: u16 = 7733;

/// Commands sent from the CLI client to the daemon.
///
/// Wire format is one line per command: the verb, then for `add`/`remove`
/// the rest of the line is the target fragment (fragments may contain
/// spaces, e.g. `add Visual Studio Code`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IpcCommand {
    /// Start rotating through targets
    Start,
    /// Stop rotating
    Stop,
    /// Query daemon status
    Status,
    /// Add a target title fragment
    Add(String),
    /// Remove a target title fragment
    Remove(String),
    /// Remove all targets
    Clear,
    /// List current targets
    Targets,
    /// List application window titles (picker view)
    Windows,
    /// Shutdown the daemon gracefully
    Shutdown,
}

/// Response from daemon to CLI client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully
    Ok,
    /// Error occurred
    Error(String),
    /// Status response
    Status {
        running: bool,
        target_count: usize,
        current_index: usize,
    },
    /// Current target list
    Targets(Vec<String>),
    /// Application window titles
    Windows(Vec<String>),
}

/// Error returned when parsing an invalid IpcCommand string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIpcCommandError;

impl fmt::Display for ParseIpcCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IPC command")
    }
}

impl std::error::Error for ParseIpcCommandError {}

impl FromStr for IpcCommand {
    type Err = ParseIpcCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match (verb.to_lowercase().as_str(), rest) {
            ("start", "") => Ok(IpcCommand::Start),
            ("stop", "") => Ok(IpcCommand::Stop),
            ("status", "") => Ok(IpcCommand::Status),
            ("add", fragment) if !fragment.is_empty() => Ok(IpcCommand::Add(fragment.to_string())),
            ("remove", fragment) if !fragment.is_empty() => {
                Ok(IpcCommand::Remove(fragment.to_string()))
            }
            ("clear", "") => Ok(IpcCommand::Clear),
            ("targets", "") => Ok(IpcCommand::Targets),
            ("windows", "") => Ok(IpcCommand::Windows),
            ("shutdown", "") => Ok(IpcCommand::Shutdown),
            _ => Err(ParseIpcCommandError),
        }
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcCommand::Start => write!(f, "start"),
            IpcCommand::Stop => write!(f, "stop"),
            IpcCommand::Status => write!(f, "status"),
            IpcCommand::Add(fragment) => write!(f, "add {}", fragment),
            IpcCommand::Remove(fragment) => write!(f, "remove {}", fragment),
            IpcCommand::Clear => write!(f, "clear"),
            IpcCommand::Targets => write!(f, "targets"),
            IpcCommand::Windows => write!(f, "windows"),
            IpcCommand::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_command_from_str() {
        assert_eq!("start".parse(), Ok(IpcCommand::Start));
        assert_eq!("stop".parse(), Ok(IpcCommand::Stop));
        assert_eq!("status".parse(), Ok(IpcCommand::Status));
        assert_eq!("clear".parse(), Ok(IpcCommand::Clear));
        assert_eq!("targets".parse(), Ok(IpcCommand::Targets));
        assert_eq!("windows".parse(), Ok(IpcCommand::Windows));
        assert_eq!("shutdown".parse(), Ok(IpcCommand::Shutdown));
        assert_eq!("invalid".parse::<IpcCommand>(), Err(ParseIpcCommandError));
    }

    #[test]
    fn test_ipc_command_from_str_case_insensitive() {
        assert_eq!("START".parse(), Ok(IpcCommand::Start));
        assert_eq!("Start".parse(), Ok(IpcCommand::Start));
        assert_eq!("  start  ".parse(), Ok(IpcCommand::Start));
    }

    #[test]
    fn test_ipc_command_with_fragment() {
        assert_eq!(
            "add Chrome".parse(),
            Ok(IpcCommand::Add("Chrome".to_string()))
        );
        assert_eq!(
            "add Visual Studio Code".parse(),
            Ok(IpcCommand::Add("Visual Studio Code".to_string()))
        );
        assert_eq!(
            "remove Chrome".parse(),
            Ok(IpcCommand::Remove("Chrome".to_string()))
        );
    }

    #[test]
    fn test_ipc_command_fragment_preserves_case() {
        // Target matching is case-sensitive, so the wire protocol must not
        // fold the fragment even though the verb is case-insensitive.
        assert_eq!(
            "ADD Chrome".parse(),
            Ok(IpcCommand::Add("Chrome".to_string()))
        );
    }

    #[test]
    fn test_ipc_command_missing_fragment_rejected() {
        assert_eq!("add".parse::<IpcCommand>(), Err(ParseIpcCommandError));
        assert_eq!("remove ".parse::<IpcCommand>(), Err(ParseIpcCommandError));
    }

    #[test]
    fn test_ipc_command_roundtrip() {
        let commands = [
            IpcCommand::Start,
            IpcCommand::Stop,
            IpcCommand::Status,
            IpcCommand::Add("Google Chrome".to_string()),
            IpcCommand::Remove("Google Chrome".to_string()),
            IpcCommand::Clear,
            IpcCommand::Targets,
            IpcCommand::Windows,
            IpcCommand::Shutdown,
        ];

        for cmd in commands {
            let s = cmd.to_string();
            let parsed: IpcCommand = s.parse().unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn test_ipc_response_serialization() {
        let ok_response = IpcResponse::Ok;
        let json = serde_json::to_string(&ok_response).unwrap();
        assert!(json.contains("ok"));

        let error_response = IpcResponse::Error("test error".to_string());
        let json = serde_json::to_string(&error_response).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("test error"));

        let status_response = IpcResponse::Status {
            running: true,
            target_count: 3,
            current_index: 1,
        };
        let json = serde_json::to_string(&status_response).unwrap();
        assert!(json.contains("running"));
        assert!(json.contains("true"));

        let targets_response = IpcResponse::Targets(vec!["Chrome".to_string()]);
        let json = serde_json::to_string(&targets_response).unwrap();
        assert!(json.contains("Chrome"));
    }
}
