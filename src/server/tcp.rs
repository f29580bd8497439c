// Plain TCP server

use std::{net::IpAddr, sync::Arc};

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::Mutex,
};

use crate::log::Logger;

use super::{handle_connection, RtmpServerContext};

/// Runs the plain TCP listener until the server's shutdown signal fires
pub fn tcp_server(logger: Arc<Logger>, server_context: RtmpServerContext) {
    tokio::spawn(async move {
        let listen_addr = server_context.config.get_tcp_listen_addr();

        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {}", e));
                return;
            }
        };

        logger.log_info(&format!("Listening on {}", listen_addr));

        let mut shutdown_watcher = server_context.shutdown.watcher();

        loop {
            tokio::select! {
                accept_res = listener.accept() => {
                    match accept_res {
                        Ok((connection, addr)) => {
                            handle_connection_tcp(connection, addr.ip(), server_context.clone(), logger.clone());
                        }
                        Err(e) => {
                            logger.log_error(&format!("Could not accept connection: {}", e));
                            return;
                        }
                    }
                }
                _ = shutdown_watcher.wait() => {
                    logger.log_info("TCP listener shutting down");
                    return;
                }
            }
        }
    });
}

fn handle_connection_tcp(connection: TcpStream, ip: IpAddr, server_context: RtmpServerContext, logger: Arc<Logger>) {
    tokio::spawn(async move {
        if let Err(e) = connection.set_nodelay(true) {
            if server_context.config.log_requests {
                logger.log_debug(&format!("Could not set TCP_NODELAY: {}", e));
            }
        }

        let (read_half, write_half) = tokio::io::split(connection);
        let write_half_mu = Arc::new(Mutex::new(write_half));

        handle_connection(logger.clone(), server_context, read_half, write_half_mu.clone(), ip).await;

        let mut write_half_v = write_half_mu.lock().await;
        let _ = write_half_v.shutdown().await;
    });
}
