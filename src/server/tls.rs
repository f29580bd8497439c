// TLS-wrapped (RTMPS) server

use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use tokio_rustls::server::TlsStream;
use tokio_rustls::{rustls, TlsAcceptor};

use crate::log::Logger;

use super::{handle_connection, RtmpServerContext};

/// Runs the TLS listener until the server's shutdown signal fires
pub fn tls_server(logger: Arc<Logger>, server_context: RtmpServerContext) {
    tokio::spawn(async move {
        let certs_iter = match CertificateDer::pem_file_iter(&server_context.config.tls.certificate) {
            Ok(iter) => iter,
            Err(e) => {
                logger.log_error(&format!("Could not load certificate: {}", e));
                return;
            }
        };

        let certificate: Vec<CertificateDer<'_>> = certs_iter.filter_map(|c| c.ok()).collect();

        let key = match PrivateKeyDer::from_pem_file(&server_context.config.tls.key) {
            Ok(k) => k,
            Err(e) => {
                logger.log_error(&format!("Could not load private key: {}", e));
                return;
            }
        };

        let tls_config = match rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certificate, key)
        {
            Ok(c) => c,
            Err(e) => {
                logger.log_error(&format!("Could not load TLS configuration: {}", e));
                return;
            }
        };

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let listen_addr = server_context.config.tls.get_tcp_listen_addr();

        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {}", e));
                return;
            }
        };

        logger.log_info(&format!("Listening on {} (TLS)", listen_addr));

        let mut shutdown_watcher = server_context.shutdown.watcher();

        loop {
            tokio::select! {
                accept_res = listener.accept() => {
                    match accept_res {
                        Ok((connection, addr)) => {
                            handle_connection_tls(
                                acceptor.clone(),
                                connection,
                                addr.ip(),
                                server_context.clone(),
                                logger.clone(),
                            );
                        }
                        Err(e) => {
                            logger.log_error(&format!("Could not accept connection: {}", e));
                            return;
                        }
                    }
                }
                _ = shutdown_watcher.wait() => {
                    logger.log_info("TLS listener shutting down");
                    return;
                }
            }
        }
    });
}

fn handle_connection_tls(
    acceptor: TlsAcceptor,
    connection: TcpStream,
    ip: IpAddr,
    server_context: RtmpServerContext,
    logger: Arc<Logger>,
) {
    tokio::spawn(async move {
        if let Err(e) = connection.set_nodelay(true) {
            if server_context.config.log_requests {
                logger.log_debug(&format!("Could not set TCP_NODELAY: {}", e));
            }
        }

        let stream: TlsStream<TcpStream> = match acceptor.accept(connection).await {
            Ok(s) => s,
            Err(e) => {
                logger.log_debug(&format!("Could not complete TLS handshake: {}", e));
                return;
            }
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let write_half_mu = Arc::new(Mutex::new(write_half));

        handle_connection(logger.clone(), server_context, read_half, write_half_mu.clone(), ip).await;

        let mut write_half_v = write_half_mu.lock().await;
        let _ = write_half_v.shutdown().await;
    });
}
