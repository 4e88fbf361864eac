use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "csftp-server", about = "A minimal passive-mode FTP server.")]
pub struct Cli {
    /// Control port to listen on (overrides the configuration file)
    pub port: Option<u16>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory served to clients
    #[arg(short, long)]
    pub root: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.control_port = port;
        }
        if let Some(root) = &self.root {
            config.server_root = root.to_string_lossy().into_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_port_overrides_config() {
        let cli = Cli::parse_from(["csftp-server", "3000", "--root", "/srv/ftp"]);
        let mut config = ServerConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.control_port, 3000);
        assert_eq!(config.server_root, "/srv/ftp");
    }

    #[test]
    fn no_arguments_leave_config_alone() {
        let cli = Cli::parse_from(["csftp-server"]);
        let mut config = ServerConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.control_port, 2121);
        assert!(cli.config.is_none());
    }
}
