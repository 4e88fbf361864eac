use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::client::handle_client;
use crate::config::ServerConfig;
use crate::error::FtpServerError;
use crate::protocol::responses::{MSG_TOO_MANY, SERVICE_UNAVAILABLE, format_response};

pub struct Server {
    listener: TcpListener,
    root: PathBuf,
    slots: Arc<Semaphore>,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the control socket and prepares the server root.
    pub async fn new(config: ServerConfig) -> Result<Self, FtpServerError> {
        let control_socket = config.control_socket()?;

        let listener = match TcpListener::bind(control_socket).await {
            Ok(listener) => {
                info!("Server bound to {}", control_socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", control_socket, e);
                return Err(FtpServerError::IoError(e));
            }
        };

        // Ensure server root directory exists
        let server_root = config.server_root_path();
        if let Err(e) = std::fs::create_dir_all(&server_root) {
            warn!("Failed to create server root directory: {}", e);
        }
        let root = server_root.canonicalize()?;
        info!("Server root directory: {}", root.display());

        Ok(Self {
            listener,
            root,
            slots: Arc::new(Semaphore::new(config.max_clients)),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn start(&self) {
        match self.listener.local_addr() {
            Ok(addr) => info!(
                "Starting CSftp server on {} (max {} clients)",
                addr, self.config.max_clients
            ),
            Err(e) => warn!("Starting CSftp server on unknown address: {}", e),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Got connection from {}", addr);
                    self.spawn_session(stream, addr);
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    fn spawn_session(&self, mut stream: TcpStream, addr: SocketAddr) {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!("Rejecting {}: client limit reached", addr);
            tokio::spawn(async move {
                let reply = format_response(SERVICE_UNAVAILABLE, MSG_TOO_MANY);
                let _ = stream.write_all(reply.as_bytes()).await;
            });
            return;
        };

        let root = self.root.clone();
        let config = Arc::clone(&self.config);

        // Spawn a task for each client so accept loop doesn't block
        tokio::spawn(async move {
            handle_client(stream, addr, root, config).await;
            drop(permit);
        });
    }
}
