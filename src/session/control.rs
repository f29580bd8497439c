// Protocol control-message handling (4.5)

use byteorder::{BigEndian, ByteOrder};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    chunk::ChunkDemultiplexer,
    log::Logger,
    rtmp::{
        rtmp_make_ack, rtmp_make_window_ack, RtmpPacket, RTMP_DEFAULT_WINDOW_ACK_SIZE,
        RTMP_MAX_CHUNK_SIZE, RTMP_MIN_CHUNK_SIZE, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT,
        RTMP_TYPE_EVENT, RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
    server::RtmpServerConfiguration,
};

use super::session_write_bytes;

/// Bookkeeping for the acknowledgement protocol: how many bytes this
/// session has read off the transport, and the peer's requested window
#[derive(Default)]
pub struct AckState {
    bytes_received: u64,
    last_acked: u64,
    peer_window_ack_size: Option<u32>,
}

impl AckState {
    pub fn new() -> Self {
        AckState::default()
    }

    /// Call after consuming `n` bytes from the transport. Returns an
    /// Acknowledgement message to send if the peer's window was crossed.
    pub fn note_bytes_received(&mut self, n: u64) -> Option<Vec<u8>> {
        self.bytes_received += n;

        let window = self.peer_window_ack_size?;
        if window == 0 {
            return None;
        }

        if self.bytes_received.saturating_sub(self.last_acked) >= window as u64 {
            self.last_acked = self.bytes_received;
            return Some(rtmp_make_ack(self.bytes_received as u32));
        }

        None
    }
}

/// Handles a protocol control message (Set Chunk Size, Abort, Ack,
/// WindowAckSize, SetPeerBandwidth, UserControl). Returns false on a
/// malformed control message that should end the session.
pub async fn handle_rtmp_packet_control<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    packet: &RtmpPacket,
    demux: &mut ChunkDemultiplexer,
    ack_state: &mut AckState,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    logger: &Logger,
) -> bool {
    let payload = &packet.payload[..packet.header.length];

    match packet.header.packet_type {
        RTMP_TYPE_SET_CHUNK_SIZE => {
            if payload.len() < 4 {
                return false;
            }
            let size = BigEndian::read_u32(&payload[0..4]);
            if !(RTMP_MIN_CHUNK_SIZE..=RTMP_MAX_CHUNK_SIZE).contains(&size) {
                if config.log_requests && logger.config.debug_enabled {
                    logger.log_debug(&format!("Protocol error: invalid chunk size {}", size));
                }
                return false;
            }
            demux.set_chunk_size(size);
            true
        }
        RTMP_TYPE_ABORT => {
            if payload.len() < 4 {
                return false;
            }
            let csid = BigEndian::read_u32(&payload[0..4]);
            demux.abort(csid);
            true
        }
        RTMP_TYPE_ACKNOWLEDGEMENT => {
            // Informational: the peer is reporting bytes it has received.
            true
        }
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
            if payload.len() < 4 {
                return false;
            }
            ack_state.peer_window_ack_size = Some(BigEndian::read_u32(&payload[0..4]));
            true
        }
        RTMP_TYPE_SET_PEER_BANDWIDTH => {
            let bytes = rtmp_make_window_ack(RTMP_DEFAULT_WINDOW_ACK_SIZE);
            if let Err(e) = session_write_bytes(write_stream, &bytes).await {
                if config.log_requests && logger.config.debug_enabled {
                    logger.log_debug(&format!("Send error: could not reply to SetPeerBandwidth: {}", e));
                }
                return false;
            }
            true
        }
        RTMP_TYPE_EVENT => {
            // UserControl messages from the client (e.g. PingResponse) are
            // informational here; this engine never requests a ping.
            true
        }
        _ => true,
    }
}
