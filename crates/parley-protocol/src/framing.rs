//! Length-prefixed framing for byte-stream peer links.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON frame      |
//! +----------------+------------------+
//! ```
//!
//! The `*_async` helpers read and write frames on tokio streams.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_FRAME_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;

fn check_len(len: usize) -> ProtocolResult<()> {
    if len > MAX_FRAME_SIZE as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: u32::try_from(len).unwrap_or(u32::MAX),
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }
    Ok(())
}

/// Encodes a frame with its length prefix.
pub fn encode_frame(frame: &Frame) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(frame)?;
    check_len(json.len())?;

    let mut buffer = Vec::with_capacity(4 + json.len());
    buffer.extend_from_slice(&(json.len() as u32).to_be_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Decodes one complete length-prefixed frame.
pub fn decode_frame(data: &[u8]) -> ProtocolResult<Frame> {
    let Some((prefix, rest)) = data.split_first_chunk::<4>() else {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4,
            received: data.len(),
        });
    };

    let len = u32::from_be_bytes(*prefix) as usize;
    check_len(len)?;

    if rest.len() < len {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4 + len,
            received: data.len(),
        });
    }

    Ok(serde_json::from_slice(&rest[..len])?)
}

/// Reads the next frame from an async stream.
///
/// Returns `Ok(None)` on a clean EOF before any byte of a new frame.
pub async fn read_frame_async<R>(reader: &mut R) -> ProtocolResult<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    check_len(len)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Writes one frame to an async stream and flushes it.
pub async fn write_frame_async<W>(writer: &mut W, frame: &Frame) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let data = encode_frame(frame)?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ChatMessage, MessageIdGenerator, PeerIdentity};

    fn handshake() -> Frame {
        Frame::handshake(PeerIdentity::new("peer-1", "Ana", "es"))
    }

    fn message(text: &str) -> Frame {
        let mut ids = MessageIdGenerator::new("peer-1");
        let sender = PeerIdentity::new("peer-1", "Ana", "es");
        Frame::message(ChatMessage::new(ids.next_at(10), &sender, text, 10))
    }

    #[test]
    fn length_prefix_matches_payload() {
        let bytes = encode_frame(&handshake()).unwrap();
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(len as usize, bytes.len() - 4);
        assert_eq!(decode_frame(&bytes).unwrap(), handshake());
    }

    #[test]
    fn decode_short_prefix() {
        assert!(matches!(
            decode_frame(&[0, 0]),
            Err(ProtocolError::IncompleteFrame { expected: 4, .. })
        ));
    }

    #[test]
    fn decode_truncated_payload() {
        let mut data = vec![0, 0, 0, 100];
        data.extend_from_slice(&[b'{'; 10]);
        assert!(matches!(
            decode_frame(&data),
            Err(ProtocolError::IncompleteFrame { expected: 104, .. })
        ));
    }

    #[test]
    fn decode_oversized_frame() {
        let data = (MAX_FRAME_SIZE + 1).to_be_bytes();
        assert!(matches!(
            decode_frame(&data),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn decode_rejects_zero_length_frame() {
        assert!(matches!(
            decode_frame(&0u32.to_be_bytes()),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[tokio::test]
    async fn async_reader_preserves_frame_order() {
        let mut bytes = encode_frame(&handshake()).unwrap();
        bytes.extend(encode_frame(&message("uno")).unwrap());
        bytes.extend(encode_frame(&message("dos")).unwrap());

        let mut stream = bytes.as_slice();
        assert_eq!(read_frame_async(&mut stream).await.unwrap(), Some(handshake()));
        assert_eq!(read_frame_async(&mut stream).await.unwrap(), Some(message("uno")));
        assert_eq!(read_frame_async(&mut stream).await.unwrap(), Some(message("dos")));
        assert_eq!(read_frame_async(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn async_helpers_roundtrip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        write_frame_async(&mut client, &handshake()).await.unwrap();
        write_frame_async(&mut client, &message("hola")).await.unwrap();
        drop(client);

        assert_eq!(read_frame_async(&mut server).await.unwrap(), Some(handshake()));
        assert_eq!(read_frame_async(&mut server).await.unwrap(), Some(message("hola")));
        assert_eq!(read_frame_async(&mut server).await.unwrap(), None);
    }
}
