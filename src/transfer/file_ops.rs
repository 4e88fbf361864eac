//! Module `file_transfer`
//!
//! Streams file contents to a client over an established data connection.

use log::{error, info};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::TransferError;

const BUFFER_SIZE: usize = 8192; // 8KB buffer for better performance

/// Copies the already opened `file` to `data_stream`, returning bytes sent.
///
/// Bytes are sent unmodified in both ASCII and binary TYPE.
pub async fn send_file<W>(
    file: File,
    data_stream: &mut W,
    path: &Path,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    info!("Starting file download: {}", path.display());

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let total_bytes_sent = match io::copy(&mut reader, data_stream).await {
        Ok(n) => n,
        Err(e) => {
            error!("Transfer of {} failed: {}", path.display(), e);
            return Err(TransferError::TransferFailed(e));
        }
    };

    if let Err(e) = data_stream.flush().await {
        error!("Failed to flush data stream: {}", e);
        return Err(TransferError::TransferFailed(e));
    }

    info!(
        "File download completed successfully: {} ({} bytes)",
        path.display(),
        total_bytes_sent
    );
    Ok(total_bytes_sent)
}
