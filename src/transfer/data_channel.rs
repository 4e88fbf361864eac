//! Module `data_channel`
//!
//! Owns the passive-mode data connection of one session: the listening
//! socket, the background task accepting on it, and the connected stream it
//! produces. Every field lives behind one mutex shared with the acceptor task.
//! The lock is only taken around state transitions; `accept`, file reads and
//! data writes all happen outside it.

use log::{debug, error, info};
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::TransferError;
use crate::transfer::operations::bind_passive_listener;

/// Mutex-guarded state of the current passive cycle.
#[derive(Default)]
struct ChannelState {
    /// Bumped by every PASV so a stale acceptor can recognise itself.
    generation: u64,
    listener_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    acceptor: Option<JoinHandle<()>>,
    connected: Option<watch::Receiver<bool>>,
    is_connected: bool,
    is_task_running: bool,
}

/// Point-in-time view of a [`DataChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub listening: Option<SocketAddr>,
    pub connected: bool,
    pub acceptor_running: bool,
}

impl ChannelStatus {
    /// True when nothing is listening, connected or running.
    pub fn is_idle(&self) -> bool {
        self.listening.is_none() && !self.connected && !self.acceptor_running
    }
}

/// Passive-mode data channel of one control connection.
#[derive(Default)]
pub struct DataChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl DataChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quiesces any previous cycle, binds a fresh listener and starts the
    /// acceptor task. Returns the address the listener is bound to.
    pub async fn open_passive(
        &self,
        ip: IpAddr,
        ports: RangeInclusive<u16>,
        max_attempts: usize,
    ) -> Result<SocketAddr, TransferError> {
        self.teardown().await;

        let std_listener = bind_passive_listener(ip, ports, max_attempts)?;
        let listener = TcpListener::from_std(std_listener)
            .map_err(TransferError::ListenerConfigurationFailed)?;
        let local_addr = listener
            .local_addr()
            .map_err(TransferError::ListenerConfigurationFailed)?;

        let (tx, rx) = watch::channel(false);

        let mut state = self.state.lock().await;
        state.generation += 1;
        let generation = state.generation;

        let handle = tokio::spawn(accept_data_connection(
            listener,
            Arc::clone(&self.state),
            generation,
            tx,
        ));

        state.listener_addr = Some(local_addr);
        state.acceptor = Some(handle);
        state.connected = Some(rx);
        state.is_task_running = true;

        debug!("Passive cycle {} listening on {}", generation, local_addr);
        Ok(local_addr)
    }

    /// Takes the connected stream if the acceptor has produced one.
    ///
    /// Does not tear anything down; callers run [`DataChannel::teardown`]
    /// once the transfer is over.
    pub async fn take_connected_socket(&self) -> Option<TcpStream> {
        let mut state = self.state.lock().await;
        if state.is_connected {
            state.is_connected = false;
            state.stream.take()
        } else {
            None
        }
    }

    /// Waits up to `timeout` for the client to connect, then takes the stream.
    pub async fn wait_for_connection(&self, timeout: Duration) -> Result<TcpStream, TransferError> {
        let receiver = self.state.lock().await.connected.clone();
        let mut receiver = receiver.ok_or(TransferError::DataChannelNotInitialized)?;

        let outcome = time::timeout(timeout, receiver.wait_for(|connected| *connected))
            .await
            .map(|signal| signal.map(|_| ()));

        match outcome {
            Ok(Ok(())) => self
                .take_connected_socket()
                .await
                .ok_or(TransferError::AcceptorExited),
            Ok(Err(_)) => Err(TransferError::AcceptorExited),
            Err(_) => Err(TransferError::ConnectionTimeout(timeout)),
        }
    }

    /// Closes whatever is connected or listening. Safe to call at any time.
    pub async fn teardown(&self) {
        let acceptor = {
            let mut state = self.state.lock().await;

            if state.is_connected {
                debug!("Closing data connection");
                state.is_connected = false;
            }
            state.stream = None;
            state.connected = None;

            if state.is_task_running {
                debug!("Cancelling acceptor on {:?}", state.listener_addr);
                state.is_task_running = false;
            }
            state.listener_addr = None;

            let acceptor = state.acceptor.take();
            if let Some(handle) = &acceptor {
                handle.abort();
            }
            acceptor
        };

        // Join outside the lock: the acceptor may be queued on it.
        if let Some(handle) = acceptor {
            let _ = handle.await;
        }
    }

    pub async fn status(&self) -> ChannelStatus {
        let state = self.state.lock().await;
        ChannelStatus {
            listening: state.listener_addr,
            connected: state.is_connected,
            acceptor_running: state.is_task_running,
        }
    }
}

/// Body of the acceptor task spawned by every PASV.
///
/// Aborting the task drops `listener`, which closes the listening socket.
async fn accept_data_connection(
    listener: TcpListener,
    state: Arc<Mutex<ChannelState>>,
    generation: u64,
    connected: watch::Sender<bool>,
) {
    let accepted = listener.accept().await;

    let mut state = state.lock().await;
    drop(listener);

    if state.generation != generation {
        debug!("Discarding result of stale passive cycle {}", generation);
        return;
    }

    state.is_task_running = false;
    state.listener_addr = None;

    match accepted {
        Ok((stream, peer_addr)) => {
            info!("Data connection accepted from {}", peer_addr);
            state.stream = Some(stream);
            state.is_connected = true;
            let _ = connected.send(true);
        }
        Err(e) => {
            error!("Failed to accept data connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    async fn open(channel: &DataChannel) -> SocketAddr {
        channel
            .open_passive(LOCALHOST, 20000..=60000, 64)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn new_channel_is_idle() {
        let channel = DataChannel::new();
        assert!(channel.status().await.is_idle());
        assert!(channel.take_connected_socket().await.is_none());
    }

    #[tokio::test]
    async fn accepts_and_hands_over_stream() {
        let channel = DataChannel::new();
        let addr = open(&channel).await;

        let status = channel.status().await;
        assert_eq!(status.listening, Some(addr));
        assert!(status.acceptor_running);

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut server = channel
            .wait_for_connection(Duration::from_secs(5))
            .await
            .unwrap();

        server.write_all(b"payload").await.unwrap();
        drop(server);
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"payload");

        // The listener closes once a peer is accepted.
        let status = channel.status().await;
        assert_eq!(status.listening, None);
        assert!(!status.acceptor_running);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn wait_times_out_without_peer() {
        let channel = DataChannel::new();
        open(&channel).await;

        let result = channel.wait_for_connection(Duration::from_millis(200)).await;
        assert!(matches!(result, Err(TransferError::ConnectionTimeout(_))));

        channel.teardown().await;
        assert!(channel.status().await.is_idle());
    }

    #[tokio::test]
    async fn wait_without_pasv_is_rejected() {
        let channel = DataChannel::new();
        let result = channel.wait_for_connection(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TransferError::DataChannelNotInitialized)));
    }

    #[tokio::test]
    async fn second_pasv_closes_first_listener() {
        let channel = DataChannel::new();
        let first = open(&channel).await;
        let mut second = open(&channel).await;
        // A repeated random port would reopen the first address.
        while second == first {
            second = open(&channel).await;
        }

        let status = channel.status().await;
        assert_eq!(status.listening, Some(second));
        assert!(status.acceptor_running);

        assert!(TcpStream::connect(first).await.is_err());
        assert!(TcpStream::connect(second).await.is_ok());
    }

    #[tokio::test]
    async fn teardown_closes_connected_stream() {
        let channel = DataChannel::new();
        let addr = open(&channel).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        // Give the acceptor a moment to register the connection.
        for _ in 0..50 {
            if channel.status().await.connected {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(channel.status().await.connected);

        channel.teardown().await;
        channel.teardown().await;
        assert!(channel.status().await.is_idle());

        let mut buf = [0u8; 1];
        let n = client.read(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);
    }
}
