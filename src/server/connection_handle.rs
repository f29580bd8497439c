// Connection handling logic

use std::{net::IpAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{log::Logger, session::handle_rtmp_session};

use super::RtmpServerContext;

/// Handles an accepted connection: assigns it a session ID and runs the
/// RTMP session driver against it.
pub async fn handle_connection<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    server_context: RtmpServerContext,
    read_stream: TR,
    write_stream: Arc<Mutex<TW>>,
    ip: IpAddr,
) {
    let session_id = server_context
        .session_id_generator
        .lock()
        .await
        .generate_id();

    let session_logger = Arc::new(logger.make_child_logger(&format!("[#{}] ", session_id)));

    handle_rtmp_session(
        session_logger,
        server_context,
        session_id,
        ip,
        read_stream,
        write_stream,
    )
    .await;
}
