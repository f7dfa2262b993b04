//! Wire codec for the transport substrate (§4.9): every message is exactly
//! two length-prefixed frames, routing key then JSON payload.
//!
//! `[u32 LE key_len][key bytes][u32 LE payload_len][payload bytes]`

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Payloads above this size are treated as a data error rather than read
/// into memory; guards against a corrupt length prefix turning into an
/// unbounded allocation.
const MAX_PAYLOAD_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
        }
    }
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> std::io::Result<()> {
    let key_bytes = frame.routing_key.as_bytes();
    writer.write_u32_le(key_bytes.len() as u32).await?;
    writer.write_all(key_bytes).await?;
    writer.write_u32_le(frame.payload.len() as u32).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await
}

/// Reads one frame, or `Ok(None)` on a clean EOF between frames (the peer
/// closed the connection). Any other I/O failure is returned as-is; the
/// caller classifies it as transient or fatal depending on context.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Frame>> {
    let key_len = match read_u32_or_eof(reader).await? {
        Some(n) => n,
        None => return Ok(None),
    };
    if key_len > MAX_PAYLOAD_BYTES {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "routing key too long"));
    }
    let mut key_buf = vec![0u8; key_len as usize];
    reader.read_exact(&mut key_buf).await?;
    let routing_key = String::from_utf8(key_buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let payload_len = reader.read_u32_le().await?;
    if payload_len > MAX_PAYLOAD_BYTES {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "payload too long"));
    }
    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Frame { routing_key, payload }))
}

async fn read_u32_or_eof<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut read = 0;
    while read < 4 {
        let n = reader.read(&mut buf[read..]).await?;
        if n == 0 {
            return if read == 0 {
                Ok(None)
            } else {
                Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
            };
        }
        read += n;
    }
    Ok(Some(u32::from_le_bytes(buf)))
}
