// connect command handling (4.7)

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        rtmp_make_chunk_size_set_message, rtmp_make_connect_response, rtmp_make_error_response,
        rtmp_make_on_bw_done, rtmp_make_peer_bandwidth_set_message, rtmp_make_stream_status_message,
        rtmp_make_window_ack, RtmpCommand, RTMP_DEFAULT_WINDOW_ACK_SIZE, RTMP_PEER_BANDWIDTH_DYNAMIC,
        STREAM_BEGIN,
    },
    server::RtmpServerConfiguration,
    utils::DEFAULT_MAX_ID_LENGTH,
};

use super::{session_write_bytes, EnhancedCapabilities, RtmpSessionRuntime, SessionState};
use crate::utils::validate_id_string;

/// Handles the `connect` command. Returns false when the session must end
/// (bad arguments, or the requested application does not match).
pub async fn handle_rtmp_command_connect<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    cmd: &RtmpCommand,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    runtime: &Mutex<RtmpSessionRuntime>,
    logger: &Logger,
) -> bool {
    let cmd_obj = match cmd.get_argument("cmdObj") {
        Some(o) => o,
        None => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Command error: connect received without cmdObj");
            }
            return false;
        }
    };

    let app = match cmd_obj.get_object_property("app") {
        Some(a) => a.get_string().to_string(),
        None => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Command error: connect cmdObj missing app");
            }
            return false;
        }
    };

    if !validate_id_string(&app, DEFAULT_MAX_ID_LENGTH) {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Command error: invalid app value: {}", app));
        }
        return false;
    }

    let trans_id = match cmd.get_argument("transId") {
        Some(t) => t.get_integer(),
        None => 0,
    };

    if app != config.application {
        if config.log_requests {
            logger.log_info(&format!(
                "REJECTED connect: app '{}' does not match configured application",
                app
            ));
        }

        let bytes = rtmp_make_error_response(
            trans_id,
            "NetConnection.Connect.Rejected".to_string(),
            Some("Unknown application name".to_string()),
            config.chunk_size as usize,
        );
        let _ = session_write_bytes(write_stream, &bytes).await;

        return false;
    }

    let object_encoding_requested = match cmd_obj.get_object_property("objectEncoding") {
        Some(oe) if !oe.is_undefined() => oe.get_integer() as u32,
        _ => 0,
    };
    let amf3_capable = object_encoding_requested == 3;

    let capabilities = EnhancedCapabilities::from_connect_cmd_obj(cmd_obj);

    {
        let mut runtime_v = runtime.lock().await;

        if runtime_v.is_connected() {
            drop(runtime_v);
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Protocol error: connect received twice");
            }
            return false;
        }

        runtime_v.application = Some(app.clone());
        runtime_v.amf3_capable = amf3_capable;
        runtime_v.capabilities = capabilities.clone();
        runtime_v.state = SessionState::Connected;
    }

    if config.log_requests {
        logger.log_info(&format!("CONNECT: app={}", app));
    }

    // Server-initiated batch (4.5/4.7/8#5): written as one buffer so no
    // other outbound message can interleave with it.
    let mut batch = Vec::new();

    batch.extend(rtmp_make_window_ack(RTMP_DEFAULT_WINDOW_ACK_SIZE));
    batch.extend(rtmp_make_peer_bandwidth_set_message(
        RTMP_DEFAULT_WINDOW_ACK_SIZE,
        RTMP_PEER_BANDWIDTH_DYNAMIC,
    ));
    batch.extend(rtmp_make_chunk_size_set_message(config.chunk_size));

    let object_encoding_reply = if amf3_capable { Some(3) } else { None };
    batch.extend(rtmp_make_connect_response(
        trans_id,
        object_encoding_reply,
        &capabilities.video_fourcc_support,
        config.chunk_size as usize,
    ));

    batch.extend(rtmp_make_on_bw_done(config.chunk_size as usize));
    batch.extend(rtmp_make_stream_status_message(STREAM_BEGIN, 0));

    if let Err(e) = session_write_bytes(write_stream, &batch).await {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Send error: could not send connect reply batch: {}", e));
        }
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::AMF0Value;
    use crate::log::Logger;
    use crate::server::TlsServerConfiguration;
    use std::collections::HashMap;

    fn test_config(application: &str) -> RtmpServerConfiguration {
        RtmpServerConfiguration {
            port: 1935,
            bind_address: "0.0.0.0".to_string(),
            tls: TlsServerConfiguration {
                port: 443,
                bind_address: "0.0.0.0".to_string(),
                certificate: "".to_string(),
                key: "".to_string(),
            },
            application: application.to_string(),
            stream_key: None,
            timeout_sec: 30,
            chunk_size: 4096,
            loop_mode: false,
            log_requests: false,
        }
    }

    fn connect_cmd(app: &str, object_encoding: Option<f64>) -> RtmpCommand {
        let mut cmd = RtmpCommand::new("connect".to_string());

        let mut cmd_obj = HashMap::new();
        cmd_obj.insert("app".to_string(), AMF0Value::String { value: app.to_string() });
        if let Some(oe) = object_encoding {
            cmd_obj.insert("objectEncoding".to_string(), AMF0Value::Number { value: oe });
        }

        cmd.set_argument("cmdObj".to_string(), AMF0Value::Object { properties: cmd_obj });
        cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 1.0 });

        cmd
    }

    #[tokio::test]
    async fn test_accepts_matching_application_and_sends_the_reply_batch() {
        let config = test_config("live");
        let cmd = connect_cmd("live", None);
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_connect(&cmd, &write_stream, &config, &runtime, &logger).await;

        assert!(ok);
        assert!(!write_stream.lock().await.is_empty());

        let runtime_v = runtime.lock().await;
        assert_eq!(runtime_v.state, SessionState::Connected);
        assert_eq!(runtime_v.application.as_deref(), Some("live"));
        assert!(!runtime_v.amf3_capable);
    }

    #[tokio::test]
    async fn test_rejects_mismatched_application() {
        let config = test_config("live");
        let cmd = connect_cmd("otherapp", None);
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_connect(&cmd, &write_stream, &config, &runtime, &logger).await;

        assert!(!ok);
        assert!(!runtime.lock().await.is_connected());
        // An _error reply is still written before closing.
        assert!(!write_stream.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_negotiates_amf3_when_requested() {
        let config = test_config("live");
        let cmd = connect_cmd("live", Some(3.0));
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let logger = Logger::new_disabled();

        assert!(handle_rtmp_command_connect(&cmd, &write_stream, &config, &runtime, &logger).await);
        assert!(runtime.lock().await.amf3_capable);
    }

    #[tokio::test]
    async fn test_rejects_a_second_connect_on_the_same_session() {
        let config = test_config("live");
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let logger = Logger::new_disabled();

        assert!(
            handle_rtmp_command_connect(&connect_cmd("live", None), &write_stream, &config, &runtime, &logger)
                .await
        );
        assert!(
            !handle_rtmp_command_connect(&connect_cmd("live", None), &write_stream, &config, &runtime, &logger)
                .await
        );
    }
}
