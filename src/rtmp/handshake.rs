// RTMP handshake

use byteorder::{BigEndian, ByteOrder};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::RTMP_HANDSHAKE_PACKET_SIZE;
use crate::error::RtmpError;

const RTMP_VERSION: u8 = 0x03;

/// Runs the server side of the plain (non-HMAC) RTMP version-3 handshake.
///
/// Reads C0/C1, writes S0/S1/S2, then reads C2 without validating its content,
/// matching the lenient handshake this engine treats as normative: strict
/// validation of C2 against S1's random bytes is a documented open question,
/// not implemented behavior.
pub async fn perform_handshake<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    read_stream: &mut TR,
    write_stream: &mut TW,
) -> Result<(), RtmpError> {
    // C0

    let c0 = read_stream.read_u8().await.map_err(|_| RtmpError::Eof)?;

    if c0 != RTMP_VERSION {
        return Err(RtmpError::UnsupportedVersion);
    }

    // C1

    let mut c1 = vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE];
    read_stream
        .read_exact(&mut c1)
        .await
        .map_err(|_| RtmpError::Eof)?;

    let c1_timestamp = BigEndian::read_u32(&c1[0..4]);

    // S0 + S1 + S2

    let mut rng = StdRng::from_os_rng();

    let mut s1_random = vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE - 8];
    rng.fill_bytes(&mut s1_random);

    let mut s2_random = vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE - 8];
    rng.fill_bytes(&mut s2_random);

    let now = server_uptime_ms();

    let mut response = Vec::with_capacity(1 + RTMP_HANDSHAKE_PACKET_SIZE * 2);

    response.push(RTMP_VERSION); // S0

    // S1
    let mut s1_header = [0u8; 8];
    BigEndian::write_u32(&mut s1_header[0..4], now);
    BigEndian::write_u32(&mut s1_header[4..8], 0);
    response.extend_from_slice(&s1_header);
    response.extend_from_slice(&s1_random);

    // S2: echoes C1's timestamp, as permitted by the spec for lenient servers
    let mut s2_header = [0u8; 8];
    BigEndian::write_u32(&mut s2_header[0..4], now);
    BigEndian::write_u32(&mut s2_header[4..8], c1_timestamp);
    response.extend_from_slice(&s2_header);
    response.extend_from_slice(&s2_random);

    write_stream
        .write_all(&response)
        .await
        .map_err(|e| RtmpError::Io(e.to_string()))?;
    write_stream
        .flush()
        .await
        .map_err(|e| RtmpError::Io(e.to_string()))?;

    // C2: content is not validated, per spec leniency

    let mut c2 = vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE];
    read_stream
        .read_exact(&mut c2)
        .await
        .map_err(|_| RtmpError::Eof)?;

    Ok(())
}

fn server_uptime_ms() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_handshake_rejects_bad_version() {
        let mut input = Cursor::new(vec![0x06]); // not version 3
        let mut output: Vec<u8> = Vec::new();

        let result = perform_handshake(&mut input, &mut output).await;

        assert!(matches!(result, Err(RtmpError::UnsupportedVersion)));
    }

    #[tokio::test]
    async fn test_handshake_happy_path() {
        let mut c1 = vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE];
        BigEndian::write_u32(&mut c1[0..4], 12345);

        let mut input_bytes = vec![RTMP_VERSION];
        input_bytes.extend(c1);
        input_bytes.extend(vec![0u8; RTMP_HANDSHAKE_PACKET_SIZE]); // C2

        let mut input = Cursor::new(input_bytes);
        let mut output: Vec<u8> = Vec::new();

        let result = perform_handshake(&mut input, &mut output).await;

        assert!(result.is_ok());
        // S0 + S1 + S2
        assert_eq!(output.len(), 1 + RTMP_HANDSHAKE_PACKET_SIZE * 2);
        assert_eq!(output[0], RTMP_VERSION);

        let s2_timestamp_echo = BigEndian::read_u32(&output[1 + RTMP_HANDSHAKE_PACKET_SIZE + 4..1 + RTMP_HANDSHAKE_PACKET_SIZE + 8]);
        assert_eq!(s2_timestamp_echo, 12345);
    }

    #[tokio::test]
    async fn test_handshake_fails_on_truncated_c1() {
        let mut input_bytes = vec![RTMP_VERSION];
        input_bytes.extend(vec![0u8; 10]); // far short of 1536 bytes
        let mut input = Cursor::new(input_bytes);
        let mut output: Vec<u8> = Vec::new();

        let result = perform_handshake(&mut input, &mut output).await;

        assert!(matches!(result, Err(RtmpError::Eof)));
    }
}
