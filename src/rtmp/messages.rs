// RTMP message generators

use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AMF0Value;

use super::{RtmpCommand, RtmpPacket, RTMP_CHANNEL_INVOKE, RTMP_CHUNK_TYPE_0, RTMP_TYPE_INVOKE};

/// Makes RTMP invoke command message on an explicit channel, rather than the
/// default invoke channel. Used for replies that conventionally share a chunk
/// stream with the media they describe, e.g. a publish `onStatus` on the
/// video channel.
pub fn rtmp_make_invoke_message_on_channel(
    cmd: &RtmpCommand,
    channel_id: u32,
    stream_id: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = channel_id;
    packet.header.packet_type = RTMP_TYPE_INVOKE;
    packet.header.stream_id = stream_id;
    packet.payload = cmd.encode();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

/// Makes RTMP ACK message
pub fn rtmp_make_ack(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP window ACK
pub fn rtmp_make_window_ack(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP control message to indicate peer bandwidth
pub fn rtmp_make_peer_bandwidth_set_message(size: u32, t: u8) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);
    b[16] = t;

    b
}

/// Makes RTMP control message to indicate chunk size
pub fn rtmp_make_chunk_size_set_message(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP control message to indicate stream status
/// Use one of these for status: STREAM_BEGIN, STREAM_EOF, STREAM_DRY, STREAM_EMPTY, STREAM_READY
pub fn rtmp_make_stream_status_message(status: u16, stream_id: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];

    BigEndian::write_u16(&mut b[12..14], status);
    BigEndian::write_u32(&mut b[14..18], stream_id);

    b
}

/// Makes RTMP invoke command message
pub fn rtmp_make_invoke_message(cmd: &RtmpCommand, stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    rtmp_make_invoke_message_on_channel(cmd, RTMP_CHANNEL_INVOKE, stream_id, out_chunk_size)
}

/// Makes RTMP status message (onStatus) on an explicit channel
pub fn rtmp_make_status_message_on_channel(
    channel_id: u32,
    stream_id: u32,
    level: String,
    code: String,
    description: Option<String>,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("onStatus".to_string());

    cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 0.0 });
    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);

    let mut info: HashMap<String, AMF0Value> = HashMap::new();

    info.insert("level".to_string(), AMF0Value::String { value: level });
    info.insert("code".to_string(), AMF0Value::String { value: code });

    if let Some(d) = description {
        info.insert("description".to_string(), AMF0Value::String { value: d });
    }

    cmd.set_argument("info".to_string(), AMF0Value::Object { properties: info });

    rtmp_make_invoke_message_on_channel(&cmd, channel_id, stream_id, out_chunk_size)
}

/// Makes RTMP status message (onStatus), sent over the invoke channel
pub fn rtmp_make_status_message(
    stream_id: u32,
    level: String,
    code: String,
    description: Option<String>,
    out_chunk_size: usize,
) -> Vec<u8> {
    rtmp_make_status_message_on_channel(
        RTMP_CHANNEL_INVOKE,
        stream_id,
        level,
        code,
        description,
        out_chunk_size,
    )
}

/// Makes a generic `_result(transId, null, info)` reply, used by the small
/// acknowledgement-style commands (`releaseStream`, `_checkbw`) whose `info`
/// payload is a bare scalar rather than a status object
pub fn rtmp_make_generic_result_message(
    trans_id: i64,
    info: AMF0Value,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number { value: trans_id as f64 },
    );
    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);
    cmd.set_argument("info".to_string(), info);

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes the `_error` reply to a rejected command invocation
pub fn rtmp_make_error_response(
    trans_id: i64,
    code: String,
    description: Option<String>,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_error".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number { value: trans_id as f64 },
    );
    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);

    let mut info: HashMap<String, AMF0Value> = HashMap::new();
    info.insert(
        "level".to_string(),
        AMF0Value::String { value: "error".to_string() },
    );
    info.insert("code".to_string(), AMF0Value::String { value: code });

    if let Some(d) = description {
        info.insert("description".to_string(), AMF0Value::String { value: d });
    }

    cmd.set_argument("info".to_string(), AMF0Value::Object { properties: info });

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes the `onBWDone` notification sent after a bandwidth check reply
pub fn rtmp_make_on_bw_done(out_chunk_size: usize) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("onBWDone".to_string());

    cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 0.0 });
    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);
    cmd.set_argument("info".to_string(), AMF0Value::Number { value: 0.0 });

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes message to respond to a connect command. `fourcc_support` lists the
/// Enhanced RTMP video FourCCs the client advertised in `videoFourCcInfoMap`
/// that the server also supports, echoed back verbatim.
pub fn rtmp_make_connect_response(
    trans_id: i64,
    object_encoding: Option<u32>,
    fourcc_support: &[String],
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number { value: trans_id as f64 },
    );

    let mut cmd_obj: HashMap<String, AMF0Value> = HashMap::new();

    cmd_obj.insert("fmsVer".to_string(), AMF0Value::String { value: "FMS/3,0,1,123".to_string() });
    cmd_obj.insert("capabilities".to_string(), AMF0Value::Number { value: 31.0 });

    let object_encoding_value = match object_encoding {
        Some(oe) => oe as f64,
        None => 0.0,
    };
    cmd_obj.insert("objectEncoding".to_string(), AMF0Value::Number { value: object_encoding_value });

    if !fourcc_support.is_empty() {
        let mut fourcc_map: HashMap<String, AMF0Value> = HashMap::new();
        for fourcc in fourcc_support {
            fourcc_map.insert(fourcc.clone(), AMF0Value::Object { properties: HashMap::new() });
        }
        cmd_obj.insert(
            "videoFourCcInfoMap".to_string(),
            AMF0Value::Object { properties: fourcc_map },
        );
    }

    cmd.set_argument(
        "cmdObj".to_string(),
        AMF0Value::Object {
            properties: cmd_obj,
        },
    );

    let mut info: HashMap<String, AMF0Value> = HashMap::new();

    info.insert(
        "level".to_string(),
        AMF0Value::String {
            value: "status".to_string(),
        },
    );
    info.insert(
        "code".to_string(),
        AMF0Value::String {
            value: "NetConnection.Connect.Success".to_string(),
        },
    );
    info.insert(
        "description".to_string(),
        AMF0Value::String {
            value: "Connection succeeded.".to_string(),
        },
    );

    info.insert(
        "objectEncoding".to_string(),
        AMF0Value::Number { value: object_encoding_value },
    );

    cmd.set_argument("info".to_string(), AMF0Value::Object { properties: info });

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes message to respond to a createStream command
pub fn rtmp_make_create_stream_response(
    trans_id: i64,
    stream_index: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number { value: trans_id as f64 },
    );

    cmd.set_argument(
        "cmdObj".to_string(),
        AMF0Value::Null,
    );

    cmd.set_argument("info".to_string(), AMF0Value::Number { value: stream_index as f64 });

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}
