use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Connection failed to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("Command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out waiting for scrape of {0}")]
    JoinTimeout(String),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    pub fn connection(host: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::Connection {
            host: host.into(),
            reason: reason.to_string(),
        }
    }

    pub fn command(command: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::Command {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
