// Server status model

/// Server-wide status: a single publisher slot.
///
/// This engine accepts one active publisher at a time rather than a
/// per-application/per-channel map: a second `publish` while the slot is
/// occupied is rejected (4.8), and the slot is released when the occupying
/// session leaves `Publishing`.
pub struct RtmpServerStatus {
    /// ID of the session currently holding the publisher slot, if any
    active_session: Option<u64>,
}

impl RtmpServerStatus {
    pub fn new() -> RtmpServerStatus {
        RtmpServerStatus {
            active_session: None,
        }
    }

    /// Attempts to claim the publisher slot for `session_id`. Returns false
    /// if another session already holds it.
    pub fn try_acquire(&mut self, session_id: u64) -> bool {
        match self.active_session {
            Some(_) => false,
            None => {
                self.active_session = Some(session_id);
                true
            }
        }
    }

    /// Releases the publisher slot if `session_id` is the one holding it.
    /// A session that never acquired the slot releasing it is a no-op.
    pub fn release(&mut self, session_id: u64) {
        if self.active_session == Some(session_id) {
            self.active_session = None;
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.active_session.is_some()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let mut status = RtmpServerStatus::new();
        assert!(!status.is_occupied());

        assert!(status.try_acquire(1));
        assert!(status.is_occupied());

        assert!(!status.try_acquire(2)); // already occupied

        status.release(2); // not the holder, no-op
        assert!(status.is_occupied());

        status.release(1);
        assert!(!status.is_occupied());
    }
}
