// FLV tag model

/// FLV tag type byte
pub const FLV_TAG_TYPE_AUDIO: u8 = 8;
pub const FLV_TAG_TYPE_VIDEO: u8 = 9;
pub const FLV_TAG_TYPE_SCRIPT_DATA: u8 = 18;

/// Enhanced RTMP video packet types (carried in the low nibble of byte 0
/// when the extended video header flag is set)
const EX_VIDEO_PACKET_TYPE_SEQUENCE_START: u8 = 0;

/// Video codec, legacy FLV `CodecID` or Enhanced RTMP FourCC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    SorensonH263,
    ScreenVideo,
    Vp6,
    H264,
    Hevc,
    Vp9,
    Av1,
    Other,
}

/// Audio codec, legacy FLV `SoundFormat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Other,
}

/// One reassembled media or script-data unit ready for FLV framing
///
/// The payload is carried verbatim from the RTMP message body: for audio and
/// video this means the codec-info byte (and, for AVC/HEVC, the AVCPacketType
/// byte and composition-time offset) stays as the first byte(s), exactly as
/// the publisher sent it.
#[derive(Clone)]
pub struct FlvTag {
    pub tag_type: u8,
    pub timestamp_ms: i64,
    pub payload: Vec<u8>,
}

impl FlvTag {
    pub fn audio(timestamp_ms: i64, payload: Vec<u8>) -> Self {
        FlvTag {
            tag_type: FLV_TAG_TYPE_AUDIO,
            timestamp_ms,
            payload,
        }
    }

    pub fn video(timestamp_ms: i64, payload: Vec<u8>) -> Self {
        FlvTag {
            tag_type: FLV_TAG_TYPE_VIDEO,
            timestamp_ms,
            payload,
        }
    }

    pub fn script_data(timestamp_ms: i64, payload: Vec<u8>) -> Self {
        FlvTag {
            tag_type: FLV_TAG_TYPE_SCRIPT_DATA,
            timestamp_ms,
            payload,
        }
    }

    fn is_extended_video_header(&self) -> bool {
        matches!(self.payload.first(), Some(byte) if byte & 0x80 != 0)
    }

    /// True for a video tag whose frame-type bits mark it as a keyframe.
    /// Works for both the legacy layout (frame type in the top nibble) and
    /// the Enhanced RTMP layout (frame type in bits 4-6, bit 7 reserved for
    /// the extended-header flag). Non-video tags are never keyframes.
    pub fn is_keyframe(&self) -> bool {
        if self.tag_type != FLV_TAG_TYPE_VIDEO {
            return false;
        }

        match self.payload.first() {
            Some(byte) => ((byte >> 4) & 0x07) == 1,
            None => false,
        }
    }

    /// True for an AVC/HEVC/AV1 sequence header (codec configuration) tag,
    /// which the queue's backpressure policy must never drop
    pub fn is_sequence_header(&self) -> bool {
        if self.tag_type != FLV_TAG_TYPE_VIDEO {
            return false;
        }

        if self.is_extended_video_header() {
            let packet_type = self.payload.first().map(|b| b & 0x0F);
            return packet_type == Some(EX_VIDEO_PACKET_TYPE_SEQUENCE_START);
        }

        match self.payload.get(1) {
            Some(avc_packet_type) => *avc_packet_type == 0,
            None => false,
        }
    }

    /// Derives the video codec in use, from the legacy `CodecID` nibble or
    /// the Enhanced RTMP FourCC. Returns `None` for non-video tags.
    pub fn video_codec(&self) -> Option<VideoCodec> {
        if self.tag_type != FLV_TAG_TYPE_VIDEO {
            return None;
        }

        let byte0 = *self.payload.first()?;

        if byte0 & 0x80 != 0 {
            let fourcc = self.payload.get(1..5)?;
            return Some(match fourcc {
                b"hvc1" => VideoCodec::Hevc,
                b"vp09" => VideoCodec::Vp9,
                b"av01" => VideoCodec::Av1,
                _ => VideoCodec::Other,
            });
        }

        Some(match byte0 & 0x0F {
            2 => VideoCodec::SorensonH263,
            3 => VideoCodec::ScreenVideo,
            4 | 5 => VideoCodec::Vp6,
            7 => VideoCodec::H264,
            _ => VideoCodec::Other,
        })
    }

    /// Derives the audio codec in use from the legacy `SoundFormat` nibble.
    /// Returns `None` for non-audio tags.
    pub fn audio_codec(&self) -> Option<AudioCodec> {
        if self.tag_type != FLV_TAG_TYPE_AUDIO {
            return None;
        }

        let byte0 = *self.payload.first()?;

        Some(match byte0 >> 4 {
            2 => AudioCodec::Mp3,
            10 => AudioCodec::Aac,
            _ => AudioCodec::Other,
        })
    }

    /// Derives channel count (1 = mono, 2 = stereo) from the legacy sound
    /// header. Returns `None` for non-audio tags.
    pub fn audio_channels(&self) -> Option<u8> {
        if self.tag_type != FLV_TAG_TYPE_AUDIO {
            return None;
        }

        let byte0 = *self.payload.first()?;
        Some(if byte0 & 0x01 != 0 { 2 } else { 1 })
    }

    /// Derives the sample rate in Hz from the legacy sound header. Returns
    /// `None` for non-audio tags.
    pub fn audio_sample_rate(&self) -> Option<u32> {
        if self.tag_type != FLV_TAG_TYPE_AUDIO {
            return None;
        }

        let byte0 = *self.payload.first()?;
        Some(match (byte0 >> 2) & 0x03 {
            0 => 5512,
            1 => 11025,
            2 => 22050,
            _ => 44100,
        })
    }

    /// Derives the sample size in bits (8 or 16) from the legacy sound
    /// header. Returns `None` for non-audio tags.
    pub fn audio_sample_size(&self) -> Option<u8> {
        if self.tag_type != FLV_TAG_TYPE_AUDIO {
            return None;
        }

        let byte0 = *self.payload.first()?;
        Some(if byte0 & 0x02 != 0 { 16 } else { 8 })
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_detection() {
        let key = FlvTag::video(0, vec![0x17, 1, 0, 0, 0]);
        assert!(key.is_keyframe());

        let inter = FlvTag::video(0, vec![0x27, 1, 0, 0, 0]);
        assert!(!inter.is_keyframe());

        let audio = FlvTag::audio(0, vec![0xAF, 1]);
        assert!(!audio.is_keyframe());
    }

    #[test]
    fn test_extended_header_keyframe_detection() {
        // isExHeader=1, frameType=1 (key), packetType=0 (sequence start), fourcc "hvc1"
        let key = FlvTag::video(0, vec![0x90, b'h', b'v', b'c', b'1']);
        assert!(key.is_keyframe());
        assert!(key.is_sequence_header());
        assert_eq!(key.video_codec(), Some(VideoCodec::Hevc));
    }

    #[test]
    fn test_sequence_header_detection() {
        let header = FlvTag::video(0, vec![0x17, 0, 0, 0, 0]);
        assert!(header.is_sequence_header());

        let nalu = FlvTag::video(0, vec![0x17, 1, 0, 0, 0]);
        assert!(!nalu.is_sequence_header());
    }

    #[test]
    fn test_legacy_video_codec() {
        let avc = FlvTag::video(0, vec![0x17, 1, 0, 0, 0]);
        assert_eq!(avc.video_codec(), Some(VideoCodec::H264));
    }

    #[test]
    fn test_audio_derived_fields() {
        // soundFormat=10 (AAC), soundRate=3 (44kHz), soundSize=1 (16-bit), soundType=1 (stereo)
        let tag = FlvTag::audio(0, vec![0b1010_1111, 0]);
        assert_eq!(tag.audio_codec(), Some(AudioCodec::Aac));
        assert_eq!(tag.audio_channels(), Some(2));
        assert_eq!(tag.audio_sample_rate(), Some(44100));
        assert_eq!(tag.audio_sample_size(), Some(16));
    }
}
