//! CSftp Server - Entry Point
//!
//! A minimal passive-mode FTP server.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use csftp_server::cli::Cli;
use csftp_server::error::FtpServerError;
use csftp_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), FtpServerError> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    info!("Launching FTP server...");

    let server = Server::new(config).await?;
    server.start().await;
    Ok(())
}
