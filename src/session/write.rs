// Helper to serialize writes to the session's transport

use std::io::Error;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

/// Writes bytes to the session write stream, serialized behind the mutex so
/// concurrent response batches (connect reply, onStatus, media passthrough)
/// never interleave on the wire.
pub async fn session_write_bytes<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    write_stream: &Mutex<TW>,
    bytes: &[u8],
) -> Result<(), Error> {
    let mut write_stream_v = write_stream.lock().await;
    write_stream_v.write_all(bytes).await
}
