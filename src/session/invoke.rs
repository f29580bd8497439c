// Command message dispatch (4.6)

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{RtmpCommand, RtmpPacket, RTMP_TYPE_FLEX_MESSAGE},
    server::{RtmpServerConfiguration, RtmpServerStatus},
};

use super::{
    handle_rtmp_command_check_bw, handle_rtmp_command_connect, handle_rtmp_command_create_stream,
    handle_rtmp_command_fc_publish, handle_rtmp_command_publish, handle_rtmp_command_release_stream,
    RtmpSessionRuntime, SessionState,
};

/// Decodes and dispatches a Command message (AMF0 type 20, or AMF3 type 17
/// with its leading format-marker byte stripped). Returns false to end the
/// session's read loop.
pub async fn handle_rtmp_packet_invoke<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    packet: &RtmpPacket,
    session_id: u64,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    server_status: &Mutex<RtmpServerStatus>,
    runtime: &Mutex<RtmpSessionRuntime>,
    logger: &Logger,
) -> bool {
    let offset = if packet.header.packet_type == RTMP_TYPE_FLEX_MESSAGE { 1 } else { 0 };

    if packet.header.length <= offset || packet.header.length > packet.payload.len() {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug("Packet error: command payload shorter than declared length");
        }
        return false;
    }

    let cmd = match RtmpCommand::decode(&packet.payload[offset..packet.header.length]) {
        Ok(c) => c,
        Err(_) => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Packet error: could not decode AMF command");
            }
            return false;
        }
    };

    if config.log_requests && logger.config.trace_enabled {
        logger.log_trace(&format!("COMMAND: {}", cmd.to_debug_string()));
    }

    match cmd.cmd.as_str() {
        "connect" => handle_rtmp_command_connect(&cmd, write_stream, config, runtime, logger).await,
        "releaseStream" => {
            handle_rtmp_command_release_stream(&cmd, write_stream, config, logger).await
        }
        "FCPublish" => handle_rtmp_command_fc_publish().await,
        "createStream" => {
            handle_rtmp_command_create_stream(&cmd, write_stream, config, runtime, logger).await
        }
        "publish" => {
            handle_rtmp_command_publish(
                &cmd,
                session_id,
                write_stream,
                config,
                server_status,
                runtime,
                logger,
            )
            .await
        }
        "_checkbw" | "checkbw" => {
            handle_rtmp_command_check_bw(&cmd, write_stream, config, logger).await
        }
        "deleteStream" => {
            if config.log_requests {
                logger.log_info("DELETE STREAM: ending session");
            }
            RtmpSessionRuntime::set_state(runtime, SessionState::Disconnected).await;
            false
        }
        _ => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!("Unrecognized command: {}", cmd.cmd));
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::AMF0Value;
    use crate::log::Logger;
    use crate::rtmp::{RtmpPacketHeader, RTMP_TYPE_INVOKE};
    use crate::server::TlsServerConfiguration;

    fn test_config() -> RtmpServerConfiguration {
        RtmpServerConfiguration {
            port: 1935,
            bind_address: "0.0.0.0".to_string(),
            tls: TlsServerConfiguration {
                port: 443,
                bind_address: "0.0.0.0".to_string(),
                certificate: "".to_string(),
                key: "".to_string(),
            },
            application: "live".to_string(),
            stream_key: None,
            timeout_sec: 30,
            chunk_size: 4096,
            loop_mode: false,
            log_requests: false,
        }
    }

    fn packet_for(cmd: RtmpCommand) -> RtmpPacket {
        let payload = cmd.encode();
        RtmpPacket {
            header: RtmpPacketHeader {
                timestamp: 0,
                format: 0,
                channel_id: 3,
                packet_type: RTMP_TYPE_INVOKE,
                stream_id: 0,
                length: payload.len(),
            },
            clock: 0,
            bytes: 0,
            handled: false,
            used: false,
            payload,
        }
    }

    #[tokio::test]
    async fn test_create_stream_routes_to_its_handler_and_continues_the_session() {
        let mut cmd = RtmpCommand::new("createStream".to_string());
        cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 4.0 });

        let packet = packet_for(cmd);
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();
        let config = test_config();

        let ok = handle_rtmp_packet_invoke(&packet, 1, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(ok);
        assert_eq!(runtime.lock().await.stream_id, 1);
        assert!(!write_stream.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_stream_ends_the_session() {
        let packet = packet_for(RtmpCommand::new("deleteStream".to_string()));
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();
        let config = test_config();

        let ok = handle_rtmp_packet_invoke(&packet, 1, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(!ok);
        assert_eq!(runtime.lock().await.state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_unknown_command_is_logged_and_session_continues() {
        let packet = packet_for(RtmpCommand::new("someUnknownCommand".to_string()));
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();
        let config = test_config();

        let ok = handle_rtmp_packet_invoke(&packet, 1, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(ok);
        assert!(write_stream.lock().await.is_empty());
    }
}
