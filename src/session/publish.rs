// publish command handling (4.8)

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        rtmp_make_status_message, rtmp_make_status_message_on_channel,
        rtmp_make_stream_status_message, RtmpCommand, RTMP_CHANNEL_VIDEO, STREAM_BEGIN,
    },
    server::{RtmpServerConfiguration, RtmpServerStatus},
    utils::{string_compare_constant_time, validate_id_string, DEFAULT_MAX_ID_LENGTH},
};

use super::{session_write_bytes, RtmpSessionRuntime, SessionState};

async fn reply_publish_error<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    write_stream: &Mutex<TW>,
    stream_id: u32,
    code: &str,
    description: &str,
    config: &RtmpServerConfiguration,
) {
    let bytes = rtmp_make_status_message(
        stream_id,
        "error".to_string(),
        code.to_string(),
        Some(description.to_string()),
        config.chunk_size as usize,
    );
    let _ = session_write_bytes(write_stream, &bytes).await;
}

/// Handles the `publish` command. Returns false when the session must end.
pub async fn handle_rtmp_command_publish<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    cmd: &RtmpCommand,
    session_id: u64,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    server_status: &Mutex<RtmpServerStatus>,
    runtime: &Mutex<RtmpSessionRuntime>,
    logger: &Logger,
) -> bool {
    let stream_id = runtime.lock().await.stream_id;

    if !RtmpSessionRuntime::get_state(runtime).await.eq(&SessionState::Connected) {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug("Protocol error: publish received outside the Connected state");
        }
        reply_publish_error(
            write_stream,
            stream_id,
            "NetStream.Publish.BadConnection",
            "No connection established",
            config,
        )
        .await;
        return false;
    }

    let raw_stream_name = match cmd.get_argument("streamName") {
        Some(s) => s.get_string().to_string(),
        None => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Command error: publish missing streamName");
            }
            reply_publish_error(
                write_stream,
                stream_id,
                "NetStream.Publish.BadName",
                "No stream key provided",
                config,
            )
            .await;
            return false;
        }
    };

    // A trailing `?query` is a convention many encoders use to append
    // metadata to the stream key; it is not part of the key itself.
    let key = raw_stream_name
        .split('?')
        .next()
        .unwrap_or(&raw_stream_name)
        .to_string();

    if !validate_id_string(&key, DEFAULT_MAX_ID_LENGTH) {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Command error: invalid streamName value: {}", key));
        }
        reply_publish_error(
            write_stream,
            stream_id,
            "NetStream.Publish.BadName",
            "Invalid stream key provided",
            config,
        )
        .await;
        return false;
    }

    if let Some(expected_key) = &config.stream_key {
        if !string_compare_constant_time(&key, expected_key) {
            if config.log_requests {
                logger.log_info("REJECTED publish: stream key did not match");
            }
            reply_publish_error(
                write_stream,
                stream_id,
                "NetStream.Publish.BadName",
                "Invalid stream key provided",
                config,
            )
            .await;
            return false;
        }
    }

    {
        let mut server_status_v = server_status.lock().await;
        if !server_status_v.try_acquire(session_id) {
            drop(server_status_v);
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Cannot publish: another session is already publishing");
            }
            reply_publish_error(
                write_stream,
                stream_id,
                "NetStream.Publish.BadName",
                "Stream already publishing",
                config,
            )
            .await;
            return false;
        }
    }

    {
        let mut runtime_v = runtime.lock().await;
        runtime_v.state = SessionState::Publishing;
        runtime_v.stream_key = Some(key.clone());
        runtime_v.is_publisher = true;
    }

    if config.log_requests {
        logger.log_info(&format!("PUBLISH ({}): {}", stream_id, key));
    }

    let mut batch = Vec::new();
    batch.extend(rtmp_make_stream_status_message(STREAM_BEGIN, stream_id));
    batch.extend(rtmp_make_status_message_on_channel(
        RTMP_CHANNEL_VIDEO,
        stream_id,
        "status".to_string(),
        "NetStream.Publish.Start".to_string(),
        Some("Publishing started.".to_string()),
        config.chunk_size as usize,
    ));

    if let Err(e) = session_write_bytes(write_stream, &batch).await {
        if config.log_requests && logger.config.debug_enabled {
            logger.log_debug(&format!("Send error: could not send publish-start batch: {}", e));
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

    fn test_config(stream_key: Option<&str>) -> RtmpServerConfiguration {
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
            stream_key: stream_key.map(|s| s.to_string()),
            timeout_sec: 30,
            chunk_size: 4096,
            loop_mode: false,
            log_requests: false,
        }
    }

    fn connected_runtime() -> RtmpSessionRuntime {
        let mut runtime = RtmpSessionRuntime::new();
        runtime.state = SessionState::Connected;
        runtime.application = Some("live".to_string());
        runtime.stream_id = 1;
        runtime
    }

    fn publish_cmd(stream_name: &str) -> RtmpCommand {
        let mut cmd = RtmpCommand::new("publish".to_string());
        cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 2.0 });
        cmd.set_argument("streamName".to_string(), AMF0Value::String { value: stream_name.to_string() });
        cmd.set_argument("type".to_string(), AMF0Value::String { value: "live".to_string() });
        cmd
    }

    #[tokio::test]
    async fn test_accepts_publish_and_acquires_the_server_slot() {
        let config = test_config(Some("secret"));
        let cmd = publish_cmd("secret?extra=1");
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(connected_runtime());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_publish(&cmd, 7, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(ok);
        assert!(!write_stream.lock().await.is_empty());
        assert!(status.lock().await.is_occupied());

        let runtime_v = runtime.lock().await;
        assert_eq!(runtime_v.state, SessionState::Publishing);
        assert!(runtime_v.is_publisher);
        assert_eq!(runtime_v.stream_key.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_rejects_mismatched_stream_key() {
        let config = test_config(Some("secret"));
        let cmd = publish_cmd("wrong-key");
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(connected_runtime());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_publish(&cmd, 7, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(!ok);
        assert!(!status.lock().await.is_occupied());
        assert!(!runtime.lock().await.is_publisher);
    }

    #[tokio::test]
    async fn test_rejects_publish_when_another_session_already_holds_the_slot() {
        let config = test_config(None);
        let cmd = publish_cmd("anything");
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(connected_runtime());
        let status = Mutex::new(RtmpServerStatus::new());
        assert!(status.lock().await.try_acquire(999));
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_publish(&cmd, 7, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(!ok);
        assert!(!runtime.lock().await.is_publisher);
    }

    #[tokio::test]
    async fn test_rejects_publish_outside_the_connected_state() {
        let config = test_config(None);
        let cmd = publish_cmd("anything");
        let write_stream: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let status = Mutex::new(RtmpServerStatus::new());
        let logger = Logger::new_disabled();

        let ok = handle_rtmp_command_publish(&cmd, 7, &write_stream, &config, &status, &runtime, &logger).await;

        assert!(!ok);
    }
}
