//! Transfer operations
//!
//! Passive-mode listener allocation and PASV reply formatting.

use log::{debug, warn};
use rand::Rng;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::ops::RangeInclusive;

use crate::error::TransferError;

/// Binds a listener on a random port from `ports`.
///
/// A port already in use is retried with a fresh random pick; any other bind
/// error is returned immediately. At most `max_attempts` binds are tried.
/// The returned listener is already non-blocking.
pub fn bind_passive_listener(
    ip: IpAddr,
    ports: RangeInclusive<u16>,
    max_attempts: usize,
) -> Result<TcpListener, TransferError> {
    let mut rng = rand::thread_rng();

    for attempt in 1..=max_attempts {
        let port = rng.gen_range(ports.clone());
        let data_socket = SocketAddr::new(ip, port);

        match TcpListener::bind(data_socket) {
            Ok(listener) => {
                // Set listener to non-blocking so tokio can drive accept
                listener
                    .set_nonblocking(true)
                    .map_err(TransferError::ListenerConfigurationFailed)?;
                debug!("Bound data listener {} on attempt {}", data_socket, attempt);
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!("Data port {} in use, picking another", port);
            }
            Err(e) => return Err(TransferError::PortBindingFailed(data_socket, e)),
        }
    }

    Err(TransferError::NoAvailablePort(max_attempts))
}

/// Formats `ip` and `port` as `(h1,h2,h3,h4,p1,p2)` where `port = p1*256 + p2`.
pub fn pasv_tuple(ip: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = ip.octets();
    format!("({},{},{},{},{},{})", h1, h2, h3, h4, port / 256, port % 256)
}
