// Bounded FIFO tag queue with keyframe-preserving backpressure

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use super::FlvTag;

/// Default capacity of a session's tag queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long `push_tag` blocks waiting for the consumer to make room before
/// falling back to dropping a tag
const BACKPRESSURE_GRACE: Duration = Duration::from_millis(100);

/// An item flowing through the egress channel
#[derive(Clone)]
pub enum FlvQueueItem {
    Tag(FlvTag),

    /// The active publisher finished (FIN, deleteStream, or idle timeout);
    /// the consumer should close out the current FLV stream
    EndOfStream,

    /// `loop=true` reset between consecutive publishers: the consumer must
    /// start a fresh FLV stream (new file header) for what follows
    Reset,
}

struct Inner {
    items: VecDeque<FlvQueueItem>,
}

/// Per-session bounded queue between the RTMP message handler (producer) and
/// the egress writer (consumer). Single-producer/single-consumer: the
/// session driver is the only pusher, one writer task is the only popper.
pub struct FlvTagQueue {
    inner: Mutex<Inner>,
    not_empty: Notify,
    not_full: Notify,
    capacity: usize,
}

impl FlvTagQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(FlvTagQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            capacity,
        })
    }

    /// Enqueues a tag. If the queue is full, waits up to the backpressure
    /// grace period for the consumer to drain it; if it is still full after
    /// that, drops the oldest tag that is neither a keyframe nor a sequence
    /// header, to avoid breaking decode of what remains in the queue.
    pub async fn push_tag(&self, tag: FlvTag) {
        {
            let inner = self.inner.lock().await;
            if inner.items.len() < self.capacity {
                drop(inner);
                self.push_back(FlvQueueItem::Tag(tag)).await;
                return;
            }
        }

        let _ = tokio::time::timeout(BACKPRESSURE_GRACE, self.not_full.notified()).await;

        let mut inner = self.inner.lock().await;

        if inner.items.len() >= self.capacity {
            let drop_pos = inner.items.iter().position(|item| match item {
                FlvQueueItem::Tag(t) => !t.is_keyframe() && !t.is_sequence_header(),
                _ => false,
            });

            match drop_pos {
                Some(pos) => {
                    inner.items.remove(pos);
                }
                None => {
                    inner.items.pop_front();
                }
            }
        }

        inner.items.push_back(FlvQueueItem::Tag(tag));
        drop(inner);
        self.not_empty.notify_one();
    }

    pub async fn push_end_of_stream(&self) {
        self.push_back(FlvQueueItem::EndOfStream).await;
    }

    pub async fn push_reset(&self) {
        self.push_back(FlvQueueItem::Reset).await;
    }

    async fn push_back(&self, item: FlvQueueItem) {
        let mut inner = self.inner.lock().await;
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Pops the next item, waiting for one to arrive
    pub async fn pop(&self) -> FlvQueueItem {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(item) = inner.items.pop_front() {
                    drop(inner);
                    self.not_full.notify_one();
                    return item;
                }
            }

            self.not_empty.notified().await;
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_and_pop_preserves_order() {
        let queue = FlvTagQueue::new(4);
        queue.push_tag(FlvTag::audio(0, vec![1])).await;
        queue.push_tag(FlvTag::audio(10, vec![2])).await;

        match queue.pop().await {
            FlvQueueItem::Tag(t) => assert_eq!(t.timestamp_ms, 0),
            _ => panic!("expected a tag"),
        }
        match queue.pop().await {
            FlvQueueItem::Tag(t) => assert_eq!(t.timestamp_ms, 10),
            _ => panic!("expected a tag"),
        }
    }

    #[tokio::test]
    async fn test_backpressure_drops_oldest_non_keyframe() {
        let queue = FlvTagQueue::new(2);

        queue.push_tag(FlvTag::video(0, vec![0x27, 1, 0, 0, 0])).await; // interframe
        queue.push_tag(FlvTag::video(10, vec![0x17, 1, 0, 0, 0])).await; // keyframe
        // queue is now full (capacity 2); this push must evict the interframe
        queue.push_tag(FlvTag::video(20, vec![0x27, 1, 0, 0, 0])).await;

        let first = queue.pop().await;
        match first {
            FlvQueueItem::Tag(t) => assert_eq!(t.timestamp_ms, 10), // the keyframe survived
            _ => panic!("expected a tag"),
        }
    }

    #[tokio::test]
    async fn test_end_of_stream_flows_through() {
        let queue = FlvTagQueue::new(4);
        queue.push_tag(FlvTag::audio(0, vec![1])).await;
        queue.push_end_of_stream().await;

        let _ = queue.pop().await;
        match queue.pop().await {
            FlvQueueItem::EndOfStream => {}
            _ => panic!("expected end of stream"),
        }
    }
}
