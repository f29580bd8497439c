// Enhanced RTMP capability negotiation

use crate::amf::AMF0Value;
use crate::rtmp::{
    RTMP_ENHANCED_CAPS_MULTITRACK, RTMP_ENHANCED_CAPS_RECONNECT,
    RTMP_ENHANCED_CAPS_TIMESTAMP_NANO_OFFSET,
};

/// Video FourCCs this server can decode, in the order they should be echoed
pub const SUPPORTED_VIDEO_FOURCCS: [&str; 3] = ["hvc1", "vp09", "av01"];

/// Enhanced RTMP capabilities negotiated during `connect`
#[derive(Debug, Clone, Default)]
pub struct EnhancedCapabilities {
    pub reconnect: bool,
    pub multitrack: bool,
    pub timestamp_nano_offset: bool,

    /// Video FourCCs the client advertised in `videoFourCcInfoMap` that this
    /// server also supports
    pub video_fourcc_support: Vec<String>,
}

impl EnhancedCapabilities {
    /// Parses `capsEx` and `videoFourCcInfoMap` out of a `connect` command
    /// object. Both fields are optional; their absence just leaves the
    /// capability record at its defaults.
    pub fn from_connect_cmd_obj(cmd_obj: &AMF0Value) -> EnhancedCapabilities {
        let mut caps = EnhancedCapabilities::default();

        if let Some(caps_ex) = cmd_obj.get_object_property("capsEx") {
            let flags = caps_ex.get_integer() as u8;
            caps.reconnect = flags & RTMP_ENHANCED_CAPS_RECONNECT != 0;
            caps.multitrack = flags & RTMP_ENHANCED_CAPS_MULTITRACK != 0;
            caps.timestamp_nano_offset = flags & RTMP_ENHANCED_CAPS_TIMESTAMP_NANO_OFFSET != 0;
        }

        if let Some(fourcc_map) = cmd_obj.get_object_property("videoFourCcInfoMap") {
            if let Some(entries) = fourcc_map.get_object() {
                for fourcc in SUPPORTED_VIDEO_FOURCCS {
                    if entries.contains_key(fourcc) {
                        caps.video_fourcc_support.push(fourcc.to_string());
                    }
                }
            }
        }

        caps
    }
}
