// Context types to group parameters

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::flv::FlvTagQueue;

use super::{RtmpServerConfiguration, RtmpServerStatus, SessionIdGenerator, ShutdownHandle};

/// RTMP server context, shared across every accepted connection
#[derive(Clone)]
pub struct RtmpServerContext {
    /// Server configuration
    pub config: Arc<RtmpServerConfiguration>,

    /// Server status (single publisher slot)
    pub status: Arc<Mutex<RtmpServerStatus>>,

    /// Shared FLV tag egress queue. A single queue instance persists across
    /// publishers so that loop mode can emit a reset signal between
    /// consecutive streams instead of tearing the egress sink down.
    pub queue: Arc<FlvTagQueue>,

    /// Server shutdown signal
    pub shutdown: ShutdownHandle,

    /// Session ID generator
    pub session_id_generator: Arc<Mutex<SessionIdGenerator>>,
}
