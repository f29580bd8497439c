// Audio/Video/Data message handling: builds FLV tags and enqueues them (4.8, 4.11)

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    flv::{FlvTag, FlvTagQueue},
    rtmp::{RtmpPacket, RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_VIDEO},
};

use super::{RtmpSessionRuntime, SessionState};

/// Wraps an Audio/Video/Data message into a `FlvTag` and pushes it to the
/// shared egress queue. A no-op for any other message type, or when the
/// session is not the active publisher on this stream.
pub async fn handle_rtmp_packet_media(
    packet: &RtmpPacket,
    runtime: &Mutex<RtmpSessionRuntime>,
    queue: &Arc<FlvTagQueue>,
) {
    let (state, stream_id) = {
        let runtime_v = runtime.lock().await;
        (runtime_v.state, runtime_v.stream_id)
    };

    if state != SessionState::Publishing || packet.header.stream_id != stream_id {
        return;
    }

    let timestamp_ms = packet.header.timestamp;
    let payload = packet.payload[..packet.header.length].to_vec();

    let tag = match packet.header.packet_type {
        RTMP_TYPE_AUDIO => FlvTag::audio(timestamp_ms, payload),
        RTMP_TYPE_VIDEO => FlvTag::video(timestamp_ms, payload),
        RTMP_TYPE_DATA => FlvTag::script_data(timestamp_ms, payload),
        _ => return,
    };

    queue.push_tag(tag).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::RtmpPacketHeader;

    fn packet_of(packet_type: u32, stream_id: u32, payload: Vec<u8>) -> RtmpPacket {
        RtmpPacket {
            header: RtmpPacketHeader {
                timestamp: 42,
                format: 0,
                channel_id: 4,
                packet_type,
                stream_id,
                length: payload.len(),
            },
            clock: 0,
            bytes: 0,
            handled: false,
            used: false,
            payload,
        }
    }

    #[tokio::test]
    async fn test_enqueues_audio_while_publishing_on_the_matching_stream() {
        let mut runtime_state = RtmpSessionRuntime::new();
        runtime_state.state = SessionState::Publishing;
        runtime_state.stream_id = 1;
        let runtime = Mutex::new(runtime_state);
        let queue = FlvTagQueue::new(4);

        let packet = packet_of(RTMP_TYPE_AUDIO, 1, vec![0xAF, 0x01, 0x02]);
        handle_rtmp_packet_media(&packet, &runtime, &queue).await;

        match queue.pop().await {
            crate::flv::FlvQueueItem::Tag(tag) => {
                assert_eq!(tag.timestamp_ms, 42);
                assert_eq!(tag.payload, vec![0xAF, 0x01, 0x02]);
            }
            _ => panic!("expected a tag"),
        }
    }

    #[tokio::test]
    async fn test_ignores_media_before_publish_starts() {
        let runtime = Mutex::new(RtmpSessionRuntime::new());
        let queue = FlvTagQueue::new(4);

        let packet = packet_of(RTMP_TYPE_VIDEO, 1, vec![0x17, 0x01]);
        handle_rtmp_packet_media(&packet, &runtime, &queue).await;

        // Nothing was enqueued: pop would hang forever if it were, so just
        // assert the queue has no immediately-available item via try_acquire
        // semantics isn't exposed; instead push a sentinel and confirm it
        // comes out first.
        queue.push_tag(FlvTag::audio(0, vec![0])).await;
        match queue.pop().await {
            crate::flv::FlvQueueItem::Tag(tag) => assert_eq!(tag.timestamp_ms, 0),
            _ => panic!("expected the sentinel tag"),
        }
    }
}
