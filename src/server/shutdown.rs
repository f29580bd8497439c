// Graceful shutdown signaling

use tokio::sync::watch;

/// Handle used to trigger a graceful server shutdown. Cloneable, and
/// triggering it more than once is a no-op: the watch channel only cares
/// about the current value, not how many times it was set.
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // Ignore the error: it only occurs if every watcher was dropped,
        // meaning nobody is left to observe the shutdown anyway.
        let _ = self.sender.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn watcher(&self) -> ShutdownWatcher {
        ShutdownWatcher {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Observer side of a [`ShutdownHandle`]. Cloneable; a late subscriber that
/// only calls `watcher()` after shutdown already fired still sees the
/// triggered value immediately, since `watch` keeps the last value around
/// rather than requiring the waiter to be registered before the send.
#[derive(Clone)]
pub struct ShutdownWatcher {
    receiver: watch::Receiver<bool>,
}

impl ShutdownWatcher {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been triggered. Resolves immediately if
    /// it already had been by the time this is called.
    pub async fn wait(&mut self) {
        if *self.receiver.borrow() {
            return;
        }

        while self.receiver.changed().await.is_ok() {
            if *self.receiver.borrow() {
                return;
            }
        }
    }
}

/// Creates a fresh shutdown handle, not yet triggered
pub fn new_shutdown_handle() -> ShutdownHandle {
    let (sender, _) = watch::channel(false);
    ShutdownHandle { sender }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let handle = new_shutdown_handle();
        let mut watcher = handle.watcher();

        assert!(!watcher.is_triggered());

        handle.trigger();
        handle.trigger();
        handle.trigger();

        watcher.wait().await;
        assert!(watcher.is_triggered());
        assert!(handle.is_triggered());
    }

    #[tokio::test]
    async fn test_late_watcher_sees_already_triggered_shutdown() {
        let handle = new_shutdown_handle();
        handle.trigger();

        let mut late_watcher = handle.watcher();
        assert!(late_watcher.is_triggered());
        late_watcher.wait().await;
    }
}
