// RTMP server

mod config;
mod connection_handle;
mod context;
mod session_id_generator;
mod shutdown;
mod status;
mod tcp;
mod tls;

use std::sync::Arc;

pub use config::*;
pub use connection_handle::*;
pub use context::*;
pub use session_id_generator::*;
pub use shutdown::*;
pub use status::*;
pub use tcp::*;
pub use tls::*;

use tokio::sync::Mutex;

use crate::{flv::FlvTagQueue, log::Logger};

/// Runs the RTMP server until it is shut down: listens on the configured TCP
/// port and, if configured, a TLS port, spawning one task per accepted
/// connection. Returns once the shutdown signal fires, whether that is
/// triggered by the single active publisher disconnecting in non-loop mode
/// or by an external caller.
pub async fn run_server(
    logger: Logger,
    config: Arc<RtmpServerConfiguration>,
    status: Arc<Mutex<RtmpServerStatus>>,
    queue: Arc<FlvTagQueue>,
) -> ShutdownHandle {
    let shutdown = new_shutdown_handle();
    let session_id_generator = Arc::new(Mutex::new(SessionIdGenerator::new()));

    let server_context = RtmpServerContext {
        config: config.clone(),
        status,
        queue,
        shutdown: shutdown.clone(),
        session_id_generator,
    };

    tcp_server(
        Arc::new(logger.make_child_logger("[SERVER:TCP] ")),
        server_context.clone(),
    );

    if config.tls.is_enabled() {
        tls_server(
            Arc::new(logger.make_child_logger("[SERVER:TLS] ")),
            server_context.clone(),
        );
    }

    let mut watcher = shutdown.watcher();
    watcher.wait().await;

    shutdown
}
