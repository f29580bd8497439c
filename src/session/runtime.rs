// Per-connection mutable session state

use tokio::sync::Mutex;

use super::{EnhancedCapabilities, SessionState};

/// Mutable state threaded through a session's lifetime, guarded by a single
/// mutex so the command dispatcher and the media handlers never need to
/// juggle more than one lock at a time.
pub struct RtmpSessionRuntime {
    pub state: SessionState,

    /// `app` value accepted at `connect`; `None` until then
    pub application: Option<String>,

    /// Set once `connect` negotiated `objectEncoding=3`
    pub amf3_capable: bool,

    pub capabilities: EnhancedCapabilities,

    /// Stream ID assigned by `createStream`; the server always hands out 1
    pub stream_id: u32,

    /// Stream key accepted at `publish`, used only for logging
    pub stream_key: Option<String>,

    /// True once this session holds the server's single publisher slot
    pub is_publisher: bool,
}

impl RtmpSessionRuntime {
    pub fn new() -> Self {
        RtmpSessionRuntime {
            state: SessionState::New,
            application: None,
            amf3_capable: false,
            capabilities: EnhancedCapabilities::default(),
            stream_id: 0,
            stream_key: None,
            is_publisher: false,
        }
    }

    /// Whether the session has already completed `connect`
    pub fn is_connected(&self) -> bool {
        self.application.is_some()
    }

    pub async fn get_state(status: &Mutex<RtmpSessionRuntime>) -> SessionState {
        status.lock().await.state
    }

    pub async fn set_state(status: &Mutex<RtmpSessionRuntime>, state: SessionState) {
        status.lock().await.state = state;
    }

    pub async fn is_publisher(status: &Mutex<RtmpSessionRuntime>) -> bool {
        status.lock().await.is_publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_transitions_are_visible_across_the_mutex() {
        let runtime = Mutex::new(RtmpSessionRuntime::new());

        assert_eq!(RtmpSessionRuntime::get_state(&runtime).await, SessionState::New);

        RtmpSessionRuntime::set_state(&runtime, SessionState::Connected).await;

        assert_eq!(RtmpSessionRuntime::get_state(&runtime).await, SessionState::Connected);
        assert!(!RtmpSessionRuntime::is_publisher(&runtime).await);
    }
}
