// Small command replies that need no session-state transition (4.6)

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    amf::AMF0Value,
    log::Logger,
    rtmp::{rtmp_make_create_stream_response, rtmp_make_generic_result_message, RtmpCommand},
    server::RtmpServerConfiguration,
};

use super::{session_write_bytes, RtmpSessionRuntime};

fn get_trans_id(cmd: &RtmpCommand) -> i64 {
    match cmd.get_argument("transId") {
        Some(t) => t.get_integer(),
        None => 0,
    }
}

/// `releaseStream` always replies `_result(txn, null, true)`; the server has
/// no separate stream-reservation concept to validate against
pub async fn handle_rtmp_command_release_stream<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    cmd: &RtmpCommand,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    logger: &Logger,
) -> bool {
    let bytes = rtmp_make_generic_result_message(
        get_trans_id(cmd),
        AMF0Value::Bool { value: true },
        config.chunk_size as usize,
    );

    if let Err(e) = session_write_bytes(write_stream, &bytes).await {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Send error: could not reply to releaseStream: {}", e));
        }
        return false;
    }

    true
}

/// `FCPublish` is acknowledged silently: no reply is required for the
/// encoders this server targets to proceed to `publish`
pub async fn handle_rtmp_command_fc_publish() -> bool {
    true
}

/// `createStream` always hands out stream ID 1: this server never
/// multiplexes more than one media stream per connection
pub async fn handle_rtmp_command_create_stream<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    cmd: &RtmpCommand,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    runtime: &Mutex<RtmpSessionRuntime>,
    logger: &Logger,
) -> bool {
    const FIXED_STREAM_ID: u32 = 1;

    runtime.lock().await.stream_id = FIXED_STREAM_ID;

    let bytes = rtmp_make_create_stream_response(get_trans_id(cmd), FIXED_STREAM_ID, config.chunk_size as usize);

    if let Err(e) = session_write_bytes(write_stream, &bytes).await {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Send error: could not reply to createStream: {}", e));
        }
        return false;
    }

    true
}

/// `_checkbw`/`checkbw` always reply `_result(txn, null, 0.0)`
pub async fn handle_rtmp_command_check_bw<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    cmd: &RtmpCommand,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    logger: &Logger,
) -> bool {
    let bytes = rtmp_make_generic_result_message(
        get_trans_id(cmd),
        AMF0Value::Number { value: 0.0 },
        config.chunk_size as usize,
    );

    if let Err(e) = session_write_bytes(write_stream, &bytes).await {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Send error: could not reply to checkbw: {}", e));
        }
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Logger;
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

    #[tokio::test]
    async fn test_release_stream_always_replies() {
        let cmd = RtmpCommand::new("releaseStream".to_string());
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let logger = Logger::new_disabled();

        assert!(handle_rtmp_command_release_stream(&cmd, &write_stream, &test_config(), &logger).await);
        assert!(!write_stream.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fc_publish_is_a_silent_no_op() {
        assert!(handle_rtmp_command_fc_publish().await);
    }

    #[tokio::test]
    async fn test_create_stream_always_assigns_stream_id_one() {
        let cmd = RtmpCommand::new("createStream".to_string());
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let logger = Logger::new_disabled();

        assert!(
            handle_rtmp_command_create_stream(&cmd, &write_stream, &test_config(), &runtime, &logger).await
        );
        assert_eq!(runtime.lock().await.stream_id, 1);
        assert!(!write_stream.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_bw_always_replies() {
        let cmd = RtmpCommand::new("_checkbw".to_string());
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let logger = Logger::new_disabled();

        assert!(handle_rtmp_command_check_bw(&cmd, &write_stream, &test_config(), &logger).await);
        assert!(!write_stream.lock().await.is_empty());
    }
}
