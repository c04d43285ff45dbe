use crate::error::{Result, ScanError};
use crate::model::DeviceOs;
use async_trait::async_trait;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Login credentials shared by every session of a crawl.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// An open command session on one device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Run `command` and return its output split into lines.
    async fn execute(&mut self, command: &str) -> Result<Vec<String>>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions to devices by name or address.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open(&self, host: &str, os: DeviceOs) -> Result<Box<dyn DeviceSession>>;
}

/// SSH connector backed by libssh2.
pub struct SshConnector {
    credentials: Credentials,
    port: u16,
    timeout: Duration,
}

impl SshConnector {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            port: 22,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn connect_sync(
        host: &str,
        port: u16,
        timeout: Duration,
        credentials: &Credentials,
    ) -> Result<ssh2::Session> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| ScanError::connection(host, e))?
            .next()
            .ok_or_else(|| ScanError::connection(host, "no address resolved"))?;
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| ScanError::connection(host, e))?;

        let mut session = ssh2::Session::new().map_err(|e| ScanError::connection(host, e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
        session
            .handshake()
            .map_err(|e| ScanError::connection(host, e))?;
        session
            .userauth_password(&credentials.username, &credentials.password)
            .map_err(|e| ScanError::connection(host, format!("authentication failed: {}", e)))?;
        if !session.authenticated() {
            return Err(ScanError::connection(host, "authentication failed"));
        }
        Ok(session)
    }
}

#[async_trait]
impl SessionConnector for SshConnector {
    async fn open(&self, host: &str, os: DeviceOs) -> Result<Box<dyn DeviceSession>> {
        debug!("Opening SSH session to {} ({})", host, os);
        let owned_host = host.to_string();
        let port = self.port;
        let timeout = self.timeout;
        let credentials = self.credentials.clone();

        let session = tokio::task::spawn_blocking(move || {
            SshConnector::connect_sync(&owned_host, port, timeout, &credentials)
        })
        .await??;

        Ok(Box::new(SshSession {
            host: host.to_string(),
            session: Arc::new(Mutex::new(session)),
        }))
    }
}

struct SshSession {
    host: String,
    session: Arc<Mutex<ssh2::Session>>,
}

impl SshSession {
    fn execute_sync(session: &ssh2::Session, command: &str) -> Result<String> {
        let mut channel = session
            .channel_session()
            .map_err(|e| ScanError::command(command, e))?;
        channel
            .exec(command)
            .map_err(|e| ScanError::command(command, e))?;
        let mut output = Vec::new();
        channel
            .read_to_end(&mut output)
            .map_err(|e| ScanError::command(command, e))?;
        channel.wait_close()?;
        Ok(decode_output(&output))
    }
}

/// Device output is not guaranteed to be UTF-8 (Latin-1 port descriptions
/// are common); invalid bytes become U+FFFD.
pub fn decode_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Split raw command output into lines without carriage returns.
pub fn split_output(output: &str) -> Vec<String> {
    output
        .split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

#[async_trait]
impl DeviceSession for SshSession {
    async fn execute(&mut self, command: &str) -> Result<Vec<String>> {
        debug!("Executing Command on {}: {}", self.host, command);
        let session = self.session.clone();
        let owned_command = command.to_string();

        let output = tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| ScanError::command(owned_command.as_str(), "session lock poisoned"))?;
            SshSession::execute_sync(&session, &owned_command)
        })
        .await??;

        Ok(split_output(&output))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| ScanError::Other("session lock poisoned".to_string()))?;
            session.disconnect(Some(ssh2::DisconnectCode::ByApplication), "", None)?;
            Ok::<(), ScanError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_output_strips_carriage_returns() {
        let lines = split_output("Device ID: sw2\r\nPlatform: cisco WS-C3850\r\n");
        assert_eq!(lines, vec!["Device ID: sw2", "Platform: cisco WS-C3850", ""]);
    }

    #[test]
    fn test_decode_output_tolerates_invalid_utf8() {
        // "Port Description: caf\xe9" in Latin-1
        let mut raw = b"Port Description: caf".to_vec();
        raw.push(0xe9);
        raw.extend_from_slice(b"\r\nSystem Name: sw2\r\n");

        let lines = split_output(&decode_output(&raw));
        assert_eq!(lines[0], "Port Description: caf\u{fffd}");
        assert_eq!(lines[1], "System Name: sw2");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("admin", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_connection_error() {
        let connector = SshConnector::new(Credentials::new("admin", "secret"))
            .with_timeout(Duration::from_millis(200));
        let result = connector.open("host.invalid", DeviceOs::CiscoIos).await;
        assert!(matches!(result, Err(ScanError::Connection { .. })));
    }
}
