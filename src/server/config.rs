// RTMP server configuration

use crate::{
    log::Logger,
    rtmp::{RTMP_MAX_CHUNK_SIZE, RTMP_MIN_CHUNK_SIZE},
    utils::{get_env_bool, get_env_string, get_env_u32},
};

const RTMP_PORT_DEFAULT: u32 = 1935;
const TLS_PORT_DEFAULT: u32 = 443;

const MAX_PORT: u32 = 65535;

const CHUNK_SIZE_DEFAULT: u32 = 4096;
const TIMEOUT_SEC_DEFAULT: u32 = 30;

/// TLS listener configuration. Only consulted when both a certificate and a
/// key are configured.
#[derive(Clone)]
pub struct TlsServerConfiguration {
    pub port: u32,
    pub bind_address: String,
    pub certificate: String,
    pub key: String,
}

impl TlsServerConfiguration {
    /// Loads configuration for environment variables
    pub fn load_from_env(logger: &Logger) -> Result<TlsServerConfiguration, ()> {
        let port = get_env_u32("SSL_PORT", TLS_PORT_DEFAULT);

        if port == 0 || port > MAX_PORT {
            logger.log_error(&format!("SSL_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address =
            get_env_string("SSL_BIND_ADDRESS", &get_env_string("BIND_ADDRESS", "0.0.0.0"));

        let certificate = get_env_string("SSL_CERT", "");
        let key = get_env_string("SSL_KEY", "");

        Ok(TlsServerConfiguration {
            port,
            bind_address,
            certificate,
            key,
        })
    }

    /// TLS is active only when both paths are set
    pub fn is_enabled(&self) -> bool {
        !self.certificate.is_empty() && !self.key.is_empty()
    }

    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// RTMP server configuration
#[derive(Clone)]
pub struct RtmpServerConfiguration {
    pub port: u32,
    pub bind_address: String,
    pub tls: TlsServerConfiguration,

    /// Required `app` name in the `connect` command
    pub application: String,

    /// If set, the `publish` stream key must match this value exactly
    pub stream_key: Option<String>,

    /// Idle-disconnect threshold, in seconds
    pub timeout_sec: u32,

    /// Chunk size announced to the publisher at connect time
    pub chunk_size: u32,

    /// Keep listening for a new publisher after the active one disconnects
    pub loop_mode: bool,

    pub log_requests: bool,
}

impl RtmpServerConfiguration {
    /// Loads configuration for environment variables
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32("RTMP_PORT", RTMP_PORT_DEFAULT);

        if port == 0 || port > MAX_PORT {
            logger.log_error(&format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");
        let application = get_env_string("RTMP_APPLICATION", "live");

        let stream_key = match get_env_string("RTMP_STREAM_KEY", "") {
            s if s.is_empty() => None,
            s => Some(s),
        };

        let timeout_sec = get_env_u32("RTMP_TIMEOUT_SECONDS", TIMEOUT_SEC_DEFAULT);

        let chunk_size = get_env_u32("RTMP_CHUNK_SIZE", CHUNK_SIZE_DEFAULT);

        if !(RTMP_MIN_CHUNK_SIZE..=RTMP_MAX_CHUNK_SIZE).contains(&chunk_size) {
            logger.log_error(&format!(
                "RTMP_CHUNK_SIZE has an invalid value: {}. Min: {}. Max: {}",
                chunk_size, RTMP_MIN_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE
            ));
            return Err(());
        }

        let loop_mode = get_env_bool("RTMP_LOOP", false);

        let tls = match TlsServerConfiguration::load_from_env(logger) {
            Ok(c) => c,
            Err(()) => {
                return Err(());
            }
        };

        let log_requests = get_env_bool("LOG_REQUESTS", true);

        Ok(RtmpServerConfiguration {
            port,
            bind_address,
            tls,
            application,
            stream_key,
            timeout_sec,
            chunk_size,
            loop_mode,
            log_requests,
        })
    }

    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
