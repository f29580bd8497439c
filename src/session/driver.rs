// Main per-connection protocol driver (C7)

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    chunk::{ByteReader, ChunkDemultiplexer},
    log::Logger,
    rtmp::{
        perform_handshake, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_AUDIO,
        RTMP_TYPE_DATA, RTMP_TYPE_EVENT, RTMP_TYPE_FLEX_MESSAGE, RTMP_TYPE_INVOKE,
        RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_VIDEO,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
    server::RtmpServerContext,
};

use super::{
    handle_rtmp_packet_control, handle_rtmp_packet_invoke, handle_rtmp_packet_media, session_write_bytes,
    AckState, RtmpSessionRuntime, SessionState,
};

/// How long the driver waits, after the active publisher leaves, for chunks
/// still in flight before emitting the end-of-stream/reset signal
const END_OF_STREAM_GRACE: Duration = Duration::from_millis(100);

fn is_control_packet_type(packet_type: u32) -> bool {
    matches!(
        packet_type,
        RTMP_TYPE_SET_CHUNK_SIZE
            | RTMP_TYPE_ABORT
            | RTMP_TYPE_ACKNOWLEDGEMENT
            | RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE
            | RTMP_TYPE_SET_PEER_BANDWIDTH
            | RTMP_TYPE_EVENT
    )
}

fn is_media_packet_type(packet_type: u32) -> bool {
    matches!(packet_type, RTMP_TYPE_AUDIO | RTMP_TYPE_VIDEO | RTMP_TYPE_DATA)
}

fn is_invoke_packet_type(packet_type: u32) -> bool {
    matches!(packet_type, RTMP_TYPE_INVOKE | RTMP_TYPE_FLEX_MESSAGE)
}

/// Runs a single RTMP connection end to end: handshake, then the chunk
/// read loop, dispatching each reassembled message to the control, invoke,
/// or media handler, until the peer disconnects, a protocol error occurs,
/// or the session goes idle past its configured timeout.
pub async fn handle_rtmp_session<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    server_context: RtmpServerContext,
    session_id: u64,
    ip: IpAddr,
    mut read_stream: TR,
    write_stream: Arc<Mutex<TW>>,
) {
    let config = server_context.config.clone();

    if config.log_requests {
        logger.log_info(&format!("Connection accepted from {}", ip));
    }

    {
        let mut write_stream_v = write_stream.lock().await;
        if let Err(e) = perform_handshake(&mut read_stream, &mut *write_stream_v).await {
            if config.log_requests {
                logger.log_info(&format!("Handshake failed: {}", e));
            }
            return;
        }
    }

    let runtime = Mutex::new(RtmpSessionRuntime::new());
    RtmpSessionRuntime::set_state(&runtime, SessionState::Connecting).await;

    let mut byte_reader = ByteReader::new(read_stream);
    let mut demux = ChunkDemultiplexer::new();
    let mut ack_state = AckState::new();

    let idle_timeout = Duration::from_secs(config.timeout_sec as u64);

    loop {
        let read_result = tokio::time::timeout(idle_timeout, demux.read_message(&mut byte_reader)).await;

        let packet = match read_result {
            Ok(Ok(packet)) => packet,
            Ok(Err(e)) => {
                if config.log_requests && logger.config.debug_enabled {
                    logger.log_debug(&format!("Session ending: {}", e));
                }
                break;
            }
            Err(_) => {
                if config.log_requests {
                    logger.log_info("Session ending: idle timeout exceeded");
                }
                break;
            }
        };

        if let Some(ack_bytes) = ack_state.note_bytes_received(packet.header.length as u64) {
            if session_write_bytes(&write_stream, &ack_bytes).await.is_err() {
                break;
            }
        }

        let packet_type = packet.header.packet_type;

        let should_continue = if is_control_packet_type(packet_type) {
            handle_rtmp_packet_control(&packet, &mut demux, &mut ack_state, &write_stream, &config, &logger)
                .await
        } else if is_media_packet_type(packet_type) {
            handle_rtmp_packet_media(&packet, &runtime, &server_context.queue).await;
            true
        } else if is_invoke_packet_type(packet_type) {
            handle_rtmp_packet_invoke(
                &packet,
                session_id,
                &write_stream,
                &config,
                &server_context.status,
                &runtime,
                &logger,
            )
            .await
        } else {
            true
        };

        if !should_continue {
            break;
        }
    }

    RtmpSessionRuntime::set_state(&runtime, SessionState::Disconnected).await;

    let was_publisher = RtmpSessionRuntime::is_publisher(&runtime).await;

    if was_publisher {
        server_context.status.lock().await.release(session_id);

        tokio::time::sleep(END_OF_STREAM_GRACE).await;

        if config.loop_mode {
            if config.log_requests {
                logger.log_info("Publisher disconnected, loop mode: waiting for the next one");
            }
            server_context.queue.push_reset().await;
        } else {
            if config.log_requests {
                logger.log_info("Publisher disconnected: shutting down");
            }
            server_context.queue.push_end_of_stream().await;
            server_context.shutdown.trigger();
        }
    }

    if config.log_requests {
        logger.log_info("Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{RTMP_TYPE_DATA, RTMP_TYPE_FLEX_MESSAGE, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE};

    #[test]
    fn test_classifies_control_media_and_invoke_packet_types() {
        assert!(is_control_packet_type(RTMP_TYPE_SET_CHUNK_SIZE));
        assert!(is_control_packet_type(RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE));
        assert!(!is_control_packet_type(RTMP_TYPE_AUDIO));

        assert!(is_media_packet_type(RTMP_TYPE_AUDIO));
        assert!(is_media_packet_type(RTMP_TYPE_VIDEO));
        assert!(is_media_packet_type(RTMP_TYPE_DATA));
        assert!(!is_media_packet_type(RTMP_TYPE_INVOKE));

        assert!(is_invoke_packet_type(RTMP_TYPE_INVOKE));
        assert!(is_invoke_packet_type(RTMP_TYPE_FLEX_MESSAGE));
        assert!(!is_invoke_packet_type(RTMP_TYPE_AUDIO));
    }
}
