// Protocol-engine error taxonomy

use std::fmt;

/// Errors produced by the protocol engine (handshake, chunk demultiplexer, AMF
/// codec, command dispatcher). The session driver is the sole place that
/// decides how to recover from each kind.
#[derive(Debug, Clone)]
pub enum RtmpError {
    /// Transport-level failure: read/write/close/TLS handshake
    Io(String),

    /// Transport closed before the expected number of bytes arrived
    Eof,

    /// A wire rule was violated: bad handshake version, impossible chunk
    /// fmt, oversized message, invalid AMF marker. A fresh chunk stream's
    /// first header using fmt 1/2/3 is a parser diagnostic instead, not one
    /// of these: see `ChunkDemultiplexer::diagnostics`.
    Protocol(String),

    /// The handshake's C0 byte did not name RTMP version 3
    UnsupportedVersion,

    /// Parseable but intentionally not implemented (AMF3 references, a
    /// command we choose to reject)
    Unsupported(String),

    /// The app name or stream key did not pass the configured check
    Authorization(String),

    /// The session exceeded its idle-activity bound
    Timeout,

    /// The server is shutting down
    Cancelled,
}

impl fmt::Display for RtmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtmpError::Io(msg) => write!(f, "io error: {msg}"),
            RtmpError::Eof => write!(f, "transport closed unexpectedly"),
            RtmpError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            RtmpError::UnsupportedVersion => write!(f, "unsupported handshake version"),
            RtmpError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            RtmpError::Authorization(msg) => write!(f, "authorization rejected: {msg}"),
            RtmpError::Timeout => write!(f, "idle timeout exceeded"),
            RtmpError::Cancelled => write!(f, "server shutting down"),
        }
    }
}

impl std::error::Error for RtmpError {}

impl RtmpError {
    /// True for errors that are always fatal to the session regardless of
    /// the state it was in when they occurred
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RtmpError::Authorization(_))
    }
}
