// Main

mod amf;
mod chunk;
mod error;
mod flv;
mod log;
mod rtmp;
mod server;
mod session;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use flv::{run_egress_writer, FlvTagQueue, DEFAULT_QUEUE_CAPACITY};
use log::{LogConfig, Logger};
use server::{run_server, RtmpServerConfiguration, RtmpServerStatus};
use tokio::sync::Mutex;
use utils::get_env_bool;

/// Main function
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Logger::new(LogConfig {
        prefix: "".to_string(),
        error_enabled: get_env_bool("LOG_ERROR", true),
        warning_enabled: get_env_bool("LOG_WARNING", true),
        info_enabled: get_env_bool("LOG_INFO", true),
        debug_enabled: get_env_bool("LOG_DEBUG", false),
        trace_enabled: get_env_bool("LOG_TRACE", get_env_bool("LOG_DEBUG", false)),
    });

    // Print version

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    logger.log_info(&format!("RTMP Ingest Server (Rust Implementation) ({VERSION})"));

    // Load configuration

    let server_config = match RtmpServerConfiguration::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // Initialize server status and the shared FLV egress queue. The queue
    // is constructed once here, rather than per session, so that loop mode
    // can emit a reset signal between consecutive publishers instead of
    // tearing the egress sink down and back up.

    let server_status = Arc::new(Mutex::new(RtmpServerStatus::new()));
    let egress_queue = FlvTagQueue::new(DEFAULT_QUEUE_CAPACITY);

    // Spawn the egress writer. This binary demonstrates the core engine by
    // writing the muxed FLV byte stream to stdout; a real deployment would
    // plug its own consumer into the same queue.

    tokio::spawn(run_egress_writer(
        egress_queue.clone(),
        tokio::io::stdout(),
        Arc::new(logger.make_child_logger("[EGRESS] ")),
    ));

    // Run server

    run_server(logger, server_config, server_status, egress_queue).await;

    // Give the egress writer a moment to flush the final end-of-stream
    // signal before the process exits.
    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(())
}
