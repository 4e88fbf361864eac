//! Configuration management for the CSftp server
//!
//! Values come from built-in defaults, an optional `config.toml` and
//! `CSFTP_*` environment variables, in that order of precedence.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_NAME: &str = "config";

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address both the control listener and PASV listeners bind to
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// Address advertised in PASV replies; the control socket's local
    /// address is used when unset
    #[serde(default)]
    pub pasv_address: Option<String>,

    /// Port range PASV picks random data ports from
    pub data_port_min: u16,
    pub data_port_max: u16,

    /// Upper bound on random-port bind attempts for a single PASV
    pub max_bind_attempts: usize,

    /// How long RETR/NLST wait for the client to open the data connection
    pub data_connection_timeout_secs: u64,

    // ═══ SESSION ═══
    /// Root directory sessions start in and can never leave
    pub server_root: String,

    /// The single accepted login name
    pub username: String,

    /// Maximum FTP command length
    pub max_command_length: usize,

    /// Maximum concurrent clients
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            pasv_address: None,
            data_port_min: 1024,
            data_port_max: 65535,
            max_bind_attempts: 64,
            data_connection_timeout_secs: 60,
            server_root: "./server_root".to_string(),
            username: "cs317".to_string(),
            max_command_length: 512,
            max_clients: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration, reading `path` if given or `./config.toml` if present,
    /// with environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = ServerConfig::default();

        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", i64::from(defaults.control_port))?
            .set_default("data_port_min", i64::from(defaults.data_port_min))?
            .set_default("data_port_max", i64::from(defaults.data_port_max))?
            .set_default("max_bind_attempts", defaults.max_bind_attempts as i64)?
            .set_default(
                "data_connection_timeout_secs",
                defaults.data_connection_timeout_secs as i64,
            )?
            .set_default("server_root", defaults.server_root)?
            .set_default("username", defaults.username)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .set_default("max_clients", defaults.max_clients as i64)?
            .add_source(file_source)
            .add_source(Environment::with_prefix("CSFTP").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 {
            return Err(config::ConfigError::Message(
                "Control port cannot be 0".into(),
            ));
        }

        if self.data_port_min < 1024 {
            return Err(config::ConfigError::Message(
                "data_port_min must be at least 1024".into(),
            ));
        }

        if self.data_port_min > self.data_port_max {
            return Err(config::ConfigError::Message(
                "data_port_min must not exceed data_port_max".into(),
            ));
        }

        // PASV listeners share this address and PASV replies only carry IPv4.
        if !matches!(self.bind_ip(), Some(IpAddr::V4(_))) {
            return Err(config::ConfigError::Message(format!(
                "bind_address must be an IPv4 address: {}",
                self.bind_address
            )));
        }

        if let Some(addr) = &self.pasv_address {
            if addr.parse::<Ipv4Addr>().is_err() {
                return Err(config::ConfigError::Message(format!(
                    "pasv_address must be an IPv4 address: {}",
                    addr
                )));
            }
        }

        if self.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.username.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "username cannot be empty".into(),
            ));
        }

        if self.max_bind_attempts == 0 {
            return Err(config::ConfigError::Message(
                "max_bind_attempts must be greater than 0".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_command_length == 0 {
            return Err(config::ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> Result<SocketAddr, config::ConfigError> {
        let ip = self.bind_ip().ok_or_else(|| {
            config::ConfigError::Message(format!(
                "bind_address is not an IP address: {}",
                self.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.control_port))
    }

    pub fn bind_ip(&self) -> Option<IpAddr> {
        self.bind_address.parse().ok()
    }

    /// PASV address override, if configured
    pub fn pasv_ip(&self) -> Option<Ipv4Addr> {
        self.pasv_address.as_deref().and_then(|a| a.parse().ok())
    }

    /// Get data port range for PASV mode
    pub fn data_port_range(&self) -> RangeInclusive<u16> {
        self.data_port_min..=self.data_port_max
    }

    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn data_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connection_timeout_secs)
    }
}
