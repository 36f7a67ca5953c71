//! TOML configuration for the server and client.
//!
//! Both sides read a small, sectioned file. Missing keys fall back to
//! per-field defaults, so an empty file (or no file at all) is valid:
//!
//! ```toml
//! [Server]
//! hostname = "0.0.0.0"
//! server_port = 2103
//! video_folder = "./videos"
//!
//! [Socket]
//! backlog = 5
//! ```
//!
//! ```toml
//! [Connection]
//! server_addr = "localhost"
//! server_port = 2103
//! num_of_retry = 5
//! delay_between_retry = 2
//!
//! [Client]
//! rtsp_buffer_size = 1024
//! rtp_buffer_size = 20480
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server-side configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default, rename = "Server")]
    pub server: ServerSection,
    #[serde(default, rename = "Socket")]
    pub socket: SocketSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Bind address for the RTSP control listener.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// RTSP control port.
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Directory the served `.Mjpeg` files live in.
    #[serde(default = "default_video_folder")]
    pub video_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketSection {
    /// Requested listen backlog.
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

/// Client-side configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default, rename = "Connection")]
    pub connection: ConnectionSection,
    #[serde(default, rename = "Client")]
    pub client: ClientSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSection {
    /// Server host to connect to.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Server RTSP control port.
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Connection attempts before giving up. Must be positive.
    #[serde(default = "default_num_of_retry")]
    pub num_of_retry: u32,
    /// Seconds to sleep between attempts.
    #[serde(default = "default_retry_delay")]
    pub delay_between_retry: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    /// Receive buffer for RTSP responses, in bytes.
    #[serde(default = "default_rtsp_buffer")]
    pub rtsp_buffer_size: usize,
    /// Receive buffer for RTP datagrams, in bytes.
    #[serde(default = "default_rtp_buffer")]
    pub rtp_buffer_size: usize,
}

impl ServerConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.hostname.is_empty() {
            return Err(ConfigError::Invalid("Server.hostname is empty".into()));
        }
        if self.socket.backlog == 0 {
            return Err(ConfigError::Invalid("Socket.backlog must be positive".into()));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.server_addr.is_empty() {
            return Err(ConfigError::Invalid("Connection.server_addr is empty".into()));
        }
        if self.connection.num_of_retry == 0 {
            return Err(ConfigError::Invalid(
                "Connection.num_of_retry must be positive".into(),
            ));
        }
        if self.client.rtsp_buffer_size < 16 || self.client.rtp_buffer_size < 16 {
            return Err(ConfigError::Invalid(
                "Client buffer sizes must be at least 16 bytes".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            server_port: default_port(),
            video_folder: default_video_folder(),
        }
    }
}

impl Default for SocketSection {
    fn default() -> Self {
        Self {
            backlog: default_backlog(),
        }
    }
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            server_port: default_port(),
            num_of_retry: default_num_of_retry(),
            delay_between_retry: default_retry_delay(),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            rtsp_buffer_size: default_rtsp_buffer(),
            rtp_buffer_size: default_rtp_buffer(),
        }
    }
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2103
}

fn default_video_folder() -> PathBuf {
    PathBuf::from("./videos")
}

fn default_backlog() -> u32 {
    5
}

fn default_server_addr() -> String {
    "localhost".to_string()
}

fn default_num_of_retry() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_rtsp_buffer() -> usize {
    1024
}

fn default_rtp_buffer() -> usize {
    20480
}
