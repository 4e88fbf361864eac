use log::{error, info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;

use crate::client::Session;
use crate::config::ServerConfig;
use crate::protocol::responses::{
    MSG_CONNECTED, MSG_TOO_LONG, READY, SYNTAX_ERROR, format_response,
};
use crate::protocol::{CommandStatus, handle_command, parse_command};
use crate::transfer::DataChannel;

/// Handles one FTP control connection from greeting to close.
///
/// - Reads one `\n`-terminated command line at a time.
/// - Dispatches commands using `handle_command`.
/// - Owns the session's `Session` and `DataChannel`, tearing the channel
///   down before the connection is dropped.
pub async fn handle_client(
    cmd_stream: TcpStream,
    client_addr: SocketAddr,
    root: PathBuf,
    config: Arc<ServerConfig>,
) {
    let advertised_ip = advertised_ip(&cmd_stream, &config);
    let (read_half, mut write_half) = cmd_stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    let mut session = Session::new(root, advertised_ip);
    session.set_client_addr(Some(client_addr));
    let channel = DataChannel::new();

    if let Err(e) = write_reply(&mut write_half, &format_response(READY, MSG_CONNECTED)).await {
        error!("Failed to greet {}: {}", client_addr, e);
        return;
    }

    // One byte past the limit is enough to tell an overlong line apart.
    let read_limit = config.max_command_length as u64 + 1;

    loop {
        buf.clear();
        match (&mut reader).take(read_limit).read_until(b'\n', &mut buf).await {
            Ok(0) => {
                // Client closed the connection
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(_) => {
                // Enforce command length limit
                if buf.len() > config.max_command_length {
                    warn!(
                        "Command from {} exceeds {} bytes",
                        client_addr, config.max_command_length
                    );
                    let reply = format_response(SYNTAX_ERROR, MSG_TOO_LONG);
                    if write_reply(&mut write_half, &reply).await.is_err() {
                        break;
                    }
                    if !buf.ends_with(b"\n") {
                        match discard_line(&mut reader).await {
                            Ok(true) => {}
                            Ok(false) => {
                                info!("Connection closed by client {}", client_addr);
                                break;
                            }
                            Err(e) => {
                                error!("Failed to read from {}: {}", client_addr, e);
                                break;
                            }
                        }
                    }
                    continue;
                }

                let command = parse_command(&buf);
                info!("Received from {}: {:?}", client_addr, &command);

                let result =
                    handle_command(&mut session, &channel, &command, &mut write_half, &config)
                        .await;

                match result.status {
                    CommandStatus::CloseConnection => {
                        channel.teardown().await;
                        if let Some(msg) = result.message {
                            let _ = write_reply(&mut write_half, &msg).await;
                        }
                        info!("Client {} requested to quit", client_addr);
                        break;
                    }
                    CommandStatus::Success | CommandStatus::Failure(_) => {
                        if let CommandStatus::Failure(reason) = &result.status {
                            warn!("Command from {} failed: {}", client_addr, reason);
                        }
                        if let Some(msg) = result.message {
                            info!("Sending response to client {}: {}", client_addr, msg.trim());
                            if let Err(e) = write_reply(&mut write_half, &msg).await {
                                error!("Failed to write to {}: {}", client_addr, e);
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        }
    }

    channel.teardown().await;
    info!("Client {} disconnected", client_addr);
}

/// Skips input up to and including the next `\n` without buffering it.
/// Returns false if the peer closed the connection first.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(false);
        }
        let newline = available.iter().position(|&b| b == b'\n');
        match newline {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(true);
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

async fn write_reply<W>(writer: &mut W, msg: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(msg.as_bytes()).await?;
    writer.flush().await
}

/// Picks the IPv4 address PASV replies advertise: the configured override,
/// else the local end of the control connection.
fn advertised_ip(stream: &TcpStream, config: &ServerConfig) -> Ipv4Addr {
    if let Some(ip) = config.pasv_ip() {
        return ip;
    }

    match stream.local_addr().map(|a| a.ip()) {
        Ok(IpAddr::V4(ip)) => ip,
        Ok(IpAddr::V6(ip)) => ip.to_ipv4_mapped().unwrap_or_else(|| {
            warn!("Control connection is IPv6 ({}); advertising 127.0.0.1 for PASV", ip);
            Ipv4Addr::LOCALHOST
        }),
        Err(e) => {
            warn!("Could not read control socket address: {}", e);
            Ipv4Addr::LOCALHOST
        }
    }
}
