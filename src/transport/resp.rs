//! RESP2 encoding for commands and incremental parsing for replies.
//!
//! Commands go out as arrays of bulk strings. Replies are parsed from a
//! byte slice that may hold a partial frame; [`parse_reply`] returns
//! `Ok(None)` until a full frame is available.

use super::{Command, Reply, TransportError};
use bytes::{Bytes, BytesMut};

/// Largest bulk string or array we are willing to accept from the server.
const MAX_FRAME_LEN: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a reply.
const MAX_DEPTH: usize = 32;

/// Append the RESP encoding of `command` to `buf`.
pub fn encode_command(command: &Command, buf: &mut BytesMut) {
    let parts = 1 + command.args().len();
    buf.extend_from_slice(b"*");
    buf.extend_from_slice(parts.to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");

    encode_bulk(command.name().as_bytes(), buf);
    for arg in command.args() {
        encode_bulk(arg.to_string().as_bytes(), buf);
    }
}

fn encode_bulk(data: &[u8], buf: &mut BytesMut) {
    buf.extend_from_slice(b"$");
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Parse one reply from the front of `buffer`.
///
/// Returns the reply and the number of bytes it occupied, or `None` if the
/// buffer does not yet contain a complete reply.
pub fn parse_reply(buffer: &[u8]) -> Result<Option<(Reply, usize)>, TransportError> {
    parse_at(buffer, 0, 0)
}

fn parse_at(
    buffer: &[u8],
    pos: usize,
    depth: usize,
) -> Result<Option<(Reply, usize)>, TransportError> {
    if depth > MAX_DEPTH {
        return Err(TransportError::Protocol(format!(
            "reply nested deeper than {} arrays",
            MAX_DEPTH
        )));
    }
    if pos >= buffer.len() {
        return Ok(None);
    }

    let line_end = match find_crlf(buffer, pos + 1) {
        Some(end) => end,
        None => return Ok(None),
    };
    let line = &buffer[pos + 1..line_end];
    let next = line_end + 2;

    match buffer[pos] {
        b'+' => Ok(Some((Reply::Simple(lossy(line)), next))),
        b'-' => Ok(Some((Reply::Error(lossy(line)), next))),
        b':' => Ok(Some((Reply::Integer(parse_int(line)?), next))),
        b'$' => {
            let len = parse_len(line)?;
            if len < 0 {
                return Ok(Some((Reply::Bulk(None), next)));
            }
            let len = len as usize;
            let end = next + len;
            if buffer.len() < end + 2 {
                return Ok(None);
            }
            if &buffer[end..end + 2] != b"\r\n" {
                return Err(TransportError::Protocol(
                    "bulk string not terminated by CRLF".to_string(),
                ));
            }
            let data = Bytes::copy_from_slice(&buffer[next..end]);
            Ok(Some((Reply::Bulk(Some(data)), end + 2)))
        }
        b'*' => {
            let count = parse_len(line)?;
            if count < 0 {
                return Ok(Some((Reply::Array(None), next)));
            }
            let mut items = Vec::with_capacity((count as usize).min(1024));
            let mut cursor = next;
            for _ in 0..count {
                match parse_at(buffer, cursor, depth + 1)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(Some(items)), cursor)))
        }
        other => Err(TransportError::Protocol(format!(
            "unexpected reply type byte 0x{:02x}",
            other
        ))),
    }
}

fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    if from >= buffer.len() {
        return None;
    }
    buffer[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|offset| from + offset)
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_int(line: &[u8]) -> Result<i64, TransportError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| TransportError::Protocol(format!("invalid integer: {:?}", lossy(line))))
}

fn parse_len(line: &[u8]) -> Result<i64, TransportError> {
    let len = parse_int(line)?;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Protocol(format!(
            "frame length {} exceeds limit",
            len
        )));
    }
    Ok(len)
}
