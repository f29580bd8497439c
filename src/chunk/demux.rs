// Chunk stream demultiplexer

use std::collections::HashMap;

use tokio::io::AsyncRead;

use crate::error::RtmpError;
use crate::rtmp::{
    RtmpPacket, RtmpPacketHeader, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2,
    RTMP_CHUNK_TYPE_3, RTMP_EXTENDED_TIMESTAMP_MARKER, RTMP_MAX_MESSAGE_SIZE,
};

use super::ByteReader;

/// Per-chunk-stream-id state carried across chunks, as required to interpret
/// fmt 1/2/3 headers that omit fields present in a prior fmt 0 header
struct ChunkStreamState {
    timestamp: i64,
    delta: i64,
    length: usize,
    packet_type: u32,
    stream_id: u32,
    extended_timestamp: bool,

    /// Payload accumulated for the message currently in progress on this CSID
    partial: Vec<u8>,
    bytes_remaining: usize,
    initialized: bool,
}

impl ChunkStreamState {
    fn new() -> Self {
        ChunkStreamState {
            timestamp: 0,
            delta: 0,
            length: 0,
            packet_type: 0,
            stream_id: 0,
            extended_timestamp: false,
            partial: Vec::new(),
            bytes_remaining: 0,
            initialized: false,
        }
    }
}

/// Parser diagnostics counters (§7: "counted and exposed via metrics"; they
/// do not terminate a session by themselves).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkDiagnostics {
    /// A chunk stream's first-ever header used fmt 1/2/3 instead of fmt 0;
    /// the chunk was dropped and the CSID state discarded (§4.4 step 2).
    pub invalid_fresh_headers: u64,

    /// A fmt 0 header arrived for a CSID with an in-flight partial message;
    /// that partial was abandoned in favor of the new one (§4.4 step 4).
    pub restarts_from_type0: u64,

    /// A message's declared length exceeded the maximum allowed size; the
    /// chunk and its CSID state were dropped (§4.4 step 5).
    pub dropped_chunks: u64,
}

/// Outcome of parsing one chunk's message header
enum ChunkHeaderOutcome {
    /// This chunk begins a new message. `abandoned_partial` is set when a
    /// fmt 0 header replaced an in-flight partial message on the same CSID.
    NewMessage { abandoned_partial: bool },

    /// This chunk continues the message already in progress on this CSID.
    Continuation,

    /// fmt was 1, 2, or 3 but this CSID has never seen a fmt 0 header; the
    /// chunk must be dropped rather than fail the whole session.
    InvalidFreshHeader,
}

/// Reassembles RTMP messages out of an interleaved chunk stream
///
/// Holds one state slot per chunk stream ID (CSID) so that Type 1/2/3 chunk
/// headers, which omit fields carried over from a stream's last Type 0
/// header, can be resolved. `read_message` returns one complete `RtmpPacket`
/// per call once enough chunks have arrived.
pub struct ChunkDemultiplexer {
    streams: HashMap<u32, ChunkStreamState>,
    chunk_size: usize,

    invalid_fresh_headers: u64,
    restarts_from_type0: u64,
    dropped_chunks: u64,
}

impl ChunkDemultiplexer {
    pub fn new() -> Self {
        ChunkDemultiplexer {
            streams: HashMap::new(),
            chunk_size: 128,
            invalid_fresh_headers: 0,
            restarts_from_type0: 0,
            dropped_chunks: 0,
        }
    }

    /// Applies a new chunk size, as announced by a SetChunkSize control
    /// message. Takes effect for chunks read after this call.
    pub fn set_chunk_size(&mut self, size: u32) {
        self.chunk_size = size as usize;
    }

    /// Discards the in-progress partial payload for one chunk stream, as
    /// requested by an Abort Message control message
    pub fn abort(&mut self, csid: u32) {
        if let Some(state) = self.streams.get_mut(&csid) {
            state.partial.clear();
            state.bytes_remaining = 0;
        }
    }

    /// Snapshot of this demultiplexer's parser diagnostics counters
    pub fn diagnostics(&self) -> ChunkDiagnostics {
        ChunkDiagnostics {
            invalid_fresh_headers: self.invalid_fresh_headers,
            restarts_from_type0: self.restarts_from_type0,
            dropped_chunks: self.dropped_chunks,
        }
    }

    /// Reads chunks from `reader` until a complete message has been
    /// reassembled, then returns it
    pub async fn read_message<R: AsyncRead + Unpin + Send>(
        &mut self,
        reader: &mut ByteReader<R>,
    ) -> Result<RtmpPacket, RtmpError> {
        loop {
            let (fmt, csid) = self.read_basic_header(reader).await?;

            let state = self.streams.entry(csid).or_insert_with(ChunkStreamState::new);
            let outcome = parse_chunk_header(reader, fmt, state).await?;

            let is_new_message = match outcome {
                ChunkHeaderOutcome::InvalidFreshHeader => {
                    self.invalid_fresh_headers += 1;
                    self.streams.remove(&csid);
                    continue;
                }
                ChunkHeaderOutcome::NewMessage { abandoned_partial } => {
                    if abandoned_partial {
                        self.restarts_from_type0 += 1;
                    }
                    true
                }
                ChunkHeaderOutcome::Continuation => false,
            };

            let state = self.streams.get_mut(&csid).expect("state just inserted");

            if is_new_message {
                if state.length > RTMP_MAX_MESSAGE_SIZE {
                    let length = state.length;
                    self.dropped_chunks += 1;
                    self.streams.remove(&csid);
                    return Err(RtmpError::Protocol(format!(
                        "message length {} exceeds the maximum of {}",
                        length, RTMP_MAX_MESSAGE_SIZE
                    )));
                }
                state.partial = Vec::with_capacity(state.length.min(RTMP_MAX_MESSAGE_SIZE));
                state.bytes_remaining = state.length;
            }

            let take = state.bytes_remaining.min(self.chunk_size);

            if take > 0 {
                reader.ensure(take).await?;
                let chunk = reader.take_bytes(take);
                state.partial.extend_from_slice(&chunk);
                state.bytes_remaining -= take;
            }

            if state.bytes_remaining == 0 {
                let packet = RtmpPacket {
                    header: RtmpPacketHeader {
                        timestamp: state.timestamp,
                        format: fmt,
                        channel_id: csid,
                        packet_type: state.packet_type,
                        stream_id: state.stream_id,
                        length: state.length,
                    },
                    clock: state.timestamp,
                    bytes: state.length,
                    handled: false,
                    used: false,
                    payload: std::mem::take(&mut state.partial),
                };

                return Ok(packet);
            }
        }
    }

    async fn read_basic_header<R: AsyncRead + Unpin + Send>(
        &mut self,
        reader: &mut ByteReader<R>,
    ) -> Result<(u32, u32), RtmpError> {
        reader.ensure(1).await?;
        let b0 = reader.read_u8();

        let fmt = (b0 >> 6) as u32;
        let csid_low = b0 & 0x3f;

        let csid = match csid_low {
            0 => {
                reader.ensure(1).await?;
                64 + reader.read_u8() as u32
            }
            1 => {
                reader.ensure(2).await?;
                let b1 = reader.read_u8() as u32;
                let b2 = reader.read_u8() as u32;
                64 + b1 + b2 * 256
            }
            other => other as u32,
        };

        Ok((fmt, csid))
    }
}

/// Parses the message header for the given fmt, updating `state` in place.
///
/// Does not borrow the demultiplexer itself: the fresh-CSID violation case
/// (fmt 1/2/3 with no prior fmt 0 header) still has to consume whatever
/// fixed-size header fields the wire format promises, so the byte stream
/// stays in sync for the next basic header, but it must not touch `state`
/// or fail the read — that decision (count it, drop the CSID) belongs to
/// the caller, which owns the diagnostics counters.
async fn parse_chunk_header<R: AsyncRead + Unpin + Send>(
    reader: &mut ByteReader<R>,
    fmt: u32,
    state: &mut ChunkStreamState,
) -> Result<ChunkHeaderOutcome, RtmpError> {
    match fmt {
        RTMP_CHUNK_TYPE_0 => {
            reader.ensure(11).await?;
            let ts_field = reader.read_u24_be();
            let length = reader.read_u24_be() as usize;
            let packet_type = reader.read_u8() as u32;
            let stream_id = reader.read_u32_le();

            let (timestamp, extended) = resolve_timestamp(reader, ts_field).await?;

            let abandoned_partial = state.initialized && state.bytes_remaining > 0;

            state.timestamp = timestamp as i64;
            state.delta = 0;
            state.length = length;
            state.packet_type = packet_type;
            state.stream_id = stream_id;
            state.extended_timestamp = extended;
            state.initialized = true;

            Ok(ChunkHeaderOutcome::NewMessage { abandoned_partial })
        }
        RTMP_CHUNK_TYPE_1 => {
            reader.ensure(7).await?;
            let delta_field = reader.read_u24_be();
            let length = reader.read_u24_be() as usize;
            let packet_type = reader.read_u8() as u32;

            let (delta, extended) = resolve_timestamp(reader, delta_field).await?;

            if !state.initialized {
                return Ok(ChunkHeaderOutcome::InvalidFreshHeader);
            }

            state.timestamp = state.timestamp.wrapping_add(delta as i64);
            state.delta = delta as i64;
            state.length = length;
            state.packet_type = packet_type;
            state.extended_timestamp = extended;

            Ok(ChunkHeaderOutcome::NewMessage { abandoned_partial: false })
        }
        RTMP_CHUNK_TYPE_2 => {
            reader.ensure(3).await?;
            let delta_field = reader.read_u24_be();

            let (delta, extended) = resolve_timestamp(reader, delta_field).await?;

            if !state.initialized {
                return Ok(ChunkHeaderOutcome::InvalidFreshHeader);
            }

            state.timestamp = state.timestamp.wrapping_add(delta as i64);
            state.delta = delta as i64;
            state.extended_timestamp = extended;

            Ok(ChunkHeaderOutcome::NewMessage { abandoned_partial: false })
        }
        RTMP_CHUNK_TYPE_3 => {
            if !state.initialized {
                // No remembered header to reuse and no extended-timestamp
                // flag to know whether a re-sent timestamp follows; nothing
                // more to consume for this chunk.
                return Ok(ChunkHeaderOutcome::InvalidFreshHeader);
            }

            let continuing = state.bytes_remaining > 0;

            if state.extended_timestamp {
                reader.ensure(4).await?;
                reader.read_u32_be(); // re-sent extended timestamp, not re-applied
            }

            if continuing {
                Ok(ChunkHeaderOutcome::Continuation)
            } else {
                state.timestamp = state.timestamp.wrapping_add(state.delta);
                Ok(ChunkHeaderOutcome::NewMessage { abandoned_partial: false })
            }
        }
        _ => Err(RtmpError::Protocol(format!("invalid chunk fmt {fmt}"))),
    }
}

/// Reads the 4-byte extended timestamp if `field` carries the sentinel
/// value, otherwise returns `field` itself
async fn resolve_timestamp<R: AsyncRead + Unpin + Send>(
    reader: &mut ByteReader<R>,
    field: u32,
) -> Result<(u32, bool), RtmpError> {
    if field == RTMP_EXTENDED_TIMESTAMP_MARKER {
        reader.ensure(4).await?;
        Ok((reader.read_u32_be(), true))
    } else {
        Ok((field, false))
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn basic_header(fmt: u32, csid: u32) -> Vec<u8> {
        RtmpPacket::serialize_basic_header(fmt, csid)
    }

    #[tokio::test]
    async fn test_single_chunk_message() {
        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 3);
        input.extend([0, 0, 0]); // timestamp
        input.extend([0, 0, 5]); // length = 5
        input.push(20); // packet type: invoke
        input.extend([1, 0, 0, 0]); // stream id = 1 (LE)
        input.extend([1, 2, 3, 4, 5]); // payload

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let packet = demux.read_message(&mut reader).await.unwrap();

        assert_eq!(packet.payload, vec![1, 2, 3, 4, 5]);
        assert_eq!(packet.header.packet_type, 20);
        assert_eq!(packet.header.stream_id, 1);
        assert_eq!(demux.diagnostics(), ChunkDiagnostics::default());
    }

    #[tokio::test]
    async fn test_multi_chunk_message_is_reassembled() {
        let mut demux = ChunkDemultiplexer::new();
        demux.set_chunk_size(4);

        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 4);
        input.extend([0, 0, 0]);
        input.extend([0, 0, 6]); // length 6, chunk size 4 -> split into 4 + 2
        input.push(18);
        input.extend([0, 0, 0, 0]);
        input.extend([1, 2, 3, 4]); // first chunk payload (4 bytes)
        input.extend(basic_header(RTMP_CHUNK_TYPE_3, 4));
        input.extend([5, 6]); // continuation (2 bytes)

        let mut reader = ByteReader::new(Cursor::new(input));
        let packet = demux.read_message(&mut reader).await.unwrap();

        assert_eq!(packet.payload, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_fresh_csid_with_type3_is_dropped_not_fatal() {
        // A stray Type 3 for a CSID that has never seen a Type 0 must be
        // dropped (and counted), not tear down the session: the valid
        // Type 0 message that follows on the same CSID still comes through.
        let mut input = basic_header(RTMP_CHUNK_TYPE_3, 7);
        input.extend(basic_header(RTMP_CHUNK_TYPE_0, 7));
        input.extend([0, 0, 0]);
        input.extend([0, 0, 2]); // length = 2
        input.push(18);
        input.extend([0, 0, 0, 0]);
        input.extend([9, 9]);

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let packet = demux.read_message(&mut reader).await.unwrap();

        assert_eq!(packet.payload, vec![9, 9]);
        assert_eq!(demux.diagnostics().invalid_fresh_headers, 1);
    }

    #[tokio::test]
    async fn test_fresh_csid_with_type1_or_type2_is_dropped_not_fatal() {
        let mut input = basic_header(RTMP_CHUNK_TYPE_1, 9);
        input.extend([0, 0, 0]); // ts delta
        input.extend([0, 0, 1]); // length
        input.push(8); // audio

        let mut input2 = basic_header(RTMP_CHUNK_TYPE_2, 9);
        input2.extend([0, 0, 0]); // ts delta
        input.extend(input2);

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let result = demux.read_message(&mut reader).await;

        // Both stray headers are consumed and dropped; the stream then runs
        // dry, which surfaces as Eof, not a protocol error.
        assert!(matches!(result, Err(RtmpError::Eof)));
        assert_eq!(demux.diagnostics().invalid_fresh_headers, 2);
    }

    #[tokio::test]
    async fn test_type3_without_prior_type0_ends_in_eof_once_the_stream_runs_dry() {
        let input = basic_header(RTMP_CHUNK_TYPE_3, 7);
        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let result = demux.read_message(&mut reader).await;
        assert!(matches!(result, Err(RtmpError::Eof)));
        assert_eq!(demux.diagnostics().invalid_fresh_headers, 1);
    }

    #[tokio::test]
    async fn test_restarts_from_type0_counts_an_abandoned_partial() {
        let mut demux = ChunkDemultiplexer::new();
        demux.set_chunk_size(4);

        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 5);
        input.extend([0, 0, 0]);
        input.extend([0, 0, 10]); // length = 10, only 4 bytes will arrive
        input.push(9);
        input.extend([0, 0, 0, 0]);
        input.extend([1, 2, 3, 4]); // partial payload, 6 bytes still outstanding

        input.extend(basic_header(RTMP_CHUNK_TYPE_0, 5)); // abandons the partial above
        input.extend([0, 0, 0]);
        input.extend([0, 0, 2]); // length = 2
        input.push(18);
        input.extend([0, 0, 0, 0]);
        input.extend([7, 7]);

        let mut reader = ByteReader::new(Cursor::new(input));
        let packet = demux.read_message(&mut reader).await.unwrap();

        assert_eq!(packet.payload, vec![7, 7]);
        assert_eq!(demux.diagnostics().restarts_from_type0, 1);
    }

    #[tokio::test]
    async fn test_zero_length_message() {
        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 2);
        input.extend([0, 0, 0]);
        input.extend([0, 0, 0]); // length = 0
        input.push(1); // SetChunkSize
        input.extend([0, 0, 0, 0]);

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let packet = demux.read_message(&mut reader).await.unwrap();
        assert!(packet.payload.is_empty());
    }

    #[tokio::test]
    async fn test_extended_timestamp_is_decoded() {
        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 3);
        input.extend([0xff, 0xff, 0xff]); // sentinel
        input.extend([0, 0, 1]);
        input.push(8);
        input.extend([0, 0, 0, 0]);
        input.extend([0x01, 0x00, 0x00, 0x00]); // extended timestamp = 16777216
        input.push(0xAB); // 1-byte payload

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let packet = demux.read_message(&mut reader).await.unwrap();
        assert_eq!(packet.header.timestamp, 16_777_216);
        assert_eq!(packet.payload, vec![0xAB]);
    }

    #[tokio::test]
    async fn test_oversized_message_is_rejected() {
        let mut input = basic_header(RTMP_CHUNK_TYPE_0, 3);
        input.extend([0, 0, 0]);
        input.extend([0xff, 0xff, 0xff]); // length = 0xFFFFFF, above the ceiling
        input.push(9);
        input.extend([0, 0, 0, 0]);

        let mut reader = ByteReader::new(Cursor::new(input));
        let mut demux = ChunkDemultiplexer::new();

        let result = demux.read_message(&mut reader).await;
        assert!(matches!(result, Err(RtmpError::Protocol(_))));
        assert_eq!(demux.diagnostics().dropped_chunks, 1);
    }
}
