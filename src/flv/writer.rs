// FLV byte-stream writer

use byteorder::{BigEndian, ByteOrder};

use super::FlvTag;

const FLV_HEADER_AUDIO_FLAG: u8 = 0x04;
const FLV_HEADER_VIDEO_FLAG: u8 = 0x01;

/// Builds the 13-byte FLV file header
///
/// `has_audio`/`has_video` set the type-flags byte; a consumer that has not
/// yet seen one of the two media types should still announce it if it
/// expects to see it later, since the flags are advisory only.
pub fn flv_file_header(has_audio: bool, has_video: bool) -> [u8; 13] {
    let mut flags = 0u8;
    if has_audio {
        flags |= FLV_HEADER_AUDIO_FLAG;
    }
    if has_video {
        flags |= FLV_HEADER_VIDEO_FLAG;
    }

    [
        b'F', b'L', b'V', 0x01, flags, 0, 0, 0, 9, // header size = 9
        0, 0, 0, 0, // first previous-tag-size, always 0
    ]
}

/// Encodes one tag as an 11-byte tag header, the payload, and the trailing
/// 4-byte previous-tag-size field
pub fn encode_tag(tag: &FlvTag) -> Vec<u8> {
    let mut out = Vec::with_capacity(11 + tag.payload.len() + 4);

    out.push(tag.tag_type);

    let mut size_field = [0u8; 4];
    BigEndian::write_u32(&mut size_field, tag.payload.len() as u32);
    out.extend_from_slice(&size_field[1..4]); // 24-bit size

    let ts = tag.timestamp_ms as u32;
    let mut ts_field = [0u8; 4];
    BigEndian::write_u32(&mut ts_field, ts);
    out.extend_from_slice(&ts_field[1..4]); // lower 24 bits
    out.push(ts_field[0]); // extended timestamp byte (upper 8 bits)

    out.extend_from_slice(&[0, 0, 0]); // stream id, always 0

    out.extend_from_slice(&tag.payload);

    let previous_tag_size = (11 + tag.payload.len()) as u32;
    let mut size_trailer = [0u8; 4];
    BigEndian::write_u32(&mut size_trailer, previous_tag_size);
    out.extend_from_slice(&size_trailer);

    out
}

// Tests
