//! Control channel to the companion process.
//!
//! Each call opens a fresh loopback TCP connection, writes one command line,
//! reads one response line and closes. No state survives between calls.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use zkgit_crypto::RepoSignature;
use zkgit_types::RemoteEndpoint;

use crate::control::{ControlCommand, ControlResponse};
use crate::error::{ProtocolError, ProtocolResult};

/// Timeouts applied to every control-channel exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
    /// Covers writing the command and waiting for the response line. The
    /// companion encrypts and uploads before answering `SEND`, so this is long.
    pub io_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(300),
        }
    }
}

/// Operations offered by the companion process.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Raw liveness probe: connect, send nothing, close.
    async fn is_reachable(&self) -> bool;

    /// `STATUS`: is the companion connected to its remote?
    async fn status(&self) -> ControlResponse;

    /// `SEND <path> <signature>`: upload the archived staging snapshot.
    async fn send_snapshot(&self, path: &str, signature: &RepoSignature) -> ControlResponse;

    /// `REQUEST <name> <signature>`: download the stored snapshot unless it
    /// already matches `signature`.
    async fn request_snapshot(&self, name: &str, signature: &RepoSignature) -> ControlResponse;

    /// `CLEAN <name>`: best-effort cleanup on the companion side.
    async fn cleanup(&self, name: &str) -> ControlResponse;

    /// Session precondition: the companion must be listening and connected.
    async fn ensure_ready(&self) -> ProtocolResult<()> {
        if !self.is_reachable().await {
            return Err(ProtocolError::CompanionNotRunning("no listener".into()));
        }
        match self.status().await {
            ControlResponse::Success => {
                info!("companion running and connected");
                Ok(())
            }
            other => Err(ProtocolError::CompanionNotConnected(other.to_string())),
        }
    }
}

/// [`ControlChannel`] over loopback TCP.
#[derive(Clone, Debug)]
pub struct TcpControlChannel {
    endpoint: RemoteEndpoint,
    config: ChannelConfig,
}

impl TcpControlChannel {
    pub fn new(endpoint: RemoteEndpoint, config: ChannelConfig) -> Self {
        Self { endpoint, config }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> io::Result<TcpStream> {
        if self.endpoint.is_unset() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "port 0"));
        }
        timeout(self.config.connect_timeout, TcpStream::connect(self.endpoint.addr()))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?
    }

    async fn try_exchange(&self, command: &ControlCommand) -> io::Result<Option<String>> {
        let stream = self.connect().await?;
        let (reader, mut writer) = stream.into_split();

        let io = async {
            writer.write_all(command.to_line().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;

            let mut line = String::new();
            let n = BufReader::new(reader).read_line(&mut line).await?;
            Ok::<_, io::Error>((n > 0).then_some(line))
        };

        timeout(self.config.io_timeout, io)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "response timed out"))?
    }

    async fn exchange(&self, command: ControlCommand) -> ControlResponse {
        debug!(endpoint = %self.endpoint, command = command.verb(), "control exchange");
        match self.try_exchange(&command).await {
            Ok(Some(line)) => {
                let response = ControlResponse::parse(&line);
                debug!(command = command.verb(), %response, "control response");
                response
            }
            Ok(None) => {
                warn!(command = command.verb(), "companion closed without answering");
                ControlResponse::Unreachable("no response".into())
            }
            Err(e) => {
                warn!(command = command.verb(), error = %e, "control channel I/O error");
                ControlResponse::Unreachable(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ControlChannel for TcpControlChannel {
    async fn is_reachable(&self) -> bool {
        self.connect().await.is_ok()
    }

    async fn status(&self) -> ControlResponse {
        self.exchange(ControlCommand::Status).await
    }

    async fn send_snapshot(&self, path: &str, signature: &RepoSignature) -> ControlResponse {
        info!("encrypting and transferring to remote");
        self.exchange(ControlCommand::Send { path: path.to_string(), signature: *signature })
            .await
    }

    async fn request_snapshot(&self, name: &str, signature: &RepoSignature) -> ControlResponse {
        info!("retrieving from remote and decrypting");
        let response = self
            .exchange(ControlCommand::Request { name: name.to_string(), signature: *signature })
            .await;
        match &response {
            ControlResponse::Success => info!("retrieval and decryption completed"),
            ControlResponse::UpToDate => info!("already up to date"),
            ControlResponse::NotFound => info!("no snapshot stored yet"),
            _ => {}
        }
        response
    }

    async fn cleanup(&self, name: &str) -> ControlResponse {
        info!("cleaning temporary files");
        self.exchange(ControlCommand::Clean { name: name.to_string() }).await
    }
}
