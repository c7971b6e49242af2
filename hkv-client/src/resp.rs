//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and decode server replies incrementally
//! from a receive buffer, keeping allocations under control.
//!
//! ## Design Principles
//! 1. **Incremental Decoding**: A reply is only consumed from the buffer once
//!    it is complete; partial frames stay put until more bytes arrive.
//! 2. **Buffer Reuse**: Callers own the buffers; nothing here holds state.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing returns protocol errors immediately.
//! 5. **Bounded Frames**: Bulk lengths, nesting depth and the size of a
//!    still-incomplete frame are capped, so a hostile peer cannot make the
//!    reader allocate or recurse without limit.

use bytes::{Buf, BufMut, BytesMut};

use crate::driver::{DriverError, DriverResult};

/// Largest bulk string accepted, matching the server's own default.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
/// Deepest array nesting accepted.
pub const MAX_DEPTH: usize = 32;
/// Largest number of buffered bytes that may still form one incomplete reply.
pub const MAX_FRAME_BYTES: usize = MAX_BULK_LEN + 64 * 1024 * 1024;

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, with None for null.
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Convenience constructor for a non-null bulk string.
    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        RespValue::Bulk(Some(data.into()))
    }

    /// Convenience constructor for a non-null array.
    pub fn array(items: Vec<RespValue>) -> Self {
        RespValue::Array(Some(items))
    }

    /// Short name of the reply kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::Simple(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::Bulk(Some(_)) => "bulk string",
            RespValue::Bulk(None) => "null bulk string",
            RespValue::Array(Some(_)) => "array",
            RespValue::Array(None) => "null array",
        }
    }
}

/// Turns an error reply into a `DriverError::Server`.
pub fn into_result(value: RespValue) -> DriverResult<RespValue> {
    match value {
        RespValue::Error(message) => Err(DriverError::Server(
            String::from_utf8_lossy(&message).into_owned(),
        )),
        other => Ok(other),
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command<A: AsRef<[u8]>>(args: &[A], out: &mut BytesMut) {
    out.put_u8(b'*');
    push_usize(out, args.len());
    out.put_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        out.put_u8(b'$');
        push_usize(out, arg.len());
        out.put_slice(b"\r\n");
        out.put_slice(arg);
        out.put_slice(b"\r\n");
    }
}

/// Decodes one reply from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete reply; in
/// that case nothing is consumed.
pub fn decode_reply(buf: &mut BytesMut) -> DriverResult<Option<RespValue>> {
    decode_reply_within(buf, MAX_FRAME_BYTES)
}

fn decode_reply_within(buf: &mut BytesMut, max_frame: usize) -> DriverResult<Option<RespValue>> {
    match parse_value(buf, 0, 0)? {
        Some((value, consumed)) => {
            buf.advance(consumed);
            Ok(Some(value))
        }
        None if buf.len() > max_frame => Err(DriverError::Protocol(format!(
            "incomplete reply exceeds {max_frame} bytes"
        ))),
        None => Ok(None),
    }
}

fn parse_value(data: &[u8], start: usize, depth: usize) -> DriverResult<Option<(RespValue, usize)>> {
    let (line, next) = match read_line(data, start)? {
        Some(found) => found,
        None => return Ok(None),
    };
    if line.is_empty() {
        return Err(DriverError::Protocol("empty reply line".into()));
    }

    let payload = &line[1..];
    match line[0] {
        b'+' => Ok(Some((RespValue::Simple(payload.to_vec()), next))),
        b'-' => Ok(Some((RespValue::Error(payload.to_vec()), next))),
        b':' => Ok(Some((RespValue::Integer(parse_i64(payload)?), next))),
        b'$' => parse_bulk(data, parse_i64(payload)?, next),
        b'*' => parse_array(data, parse_i64(payload)?, next, depth),
        other => Err(DriverError::Protocol(format!(
            "unexpected reply prefix {:?}",
            other as char
        ))),
    }
}

fn parse_bulk(
    data: &[u8],
    len: i64,
    start: usize,
) -> DriverResult<Option<(RespValue, usize)>> {
    if len < 0 {
        return Ok(Some((RespValue::Bulk(None), start)));
    }
    if len as u64 > MAX_BULK_LEN as u64 {
        return Err(DriverError::Protocol(format!("bulk length {len} exceeds limit")));
    }
    let end = start + len as usize;
    if data.len() < end + 2 {
        return Ok(None);
    }
    if &data[end..end + 2] != b"\r\n" {
        return Err(DriverError::Protocol("bulk string not terminated by CRLF".into()));
    }
    Ok(Some((RespValue::Bulk(Some(data[start..end].to_vec())), end + 2)))
}

fn parse_array(
    data: &[u8],
    len: i64,
    start: usize,
    depth: usize,
) -> DriverResult<Option<(RespValue, usize)>> {
    if len < 0 {
        return Ok(Some((RespValue::Array(None), start)));
    }
    if depth >= MAX_DEPTH {
        return Err(DriverError::Protocol(format!("arrays nested deeper than {MAX_DEPTH}")));
    }

    // Cap the pre-allocation; the length comes from the wire.
    let mut items = Vec::with_capacity((len as usize).min(1024));
    let mut pos = start;
    for _ in 0..len {
        match parse_value(data, pos, depth + 1)? {
            Some((item, next)) => {
                items.push(item);
                pos = next;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespValue::Array(Some(items)), pos)))
}

fn read_line(data: &[u8], start: usize) -> DriverResult<Option<(&[u8], usize)>> {
    let rest = &data[start..];
    let lf = match rest.iter().position(|&b| b == b'\n') {
        Some(lf) => lf,
        None => return Ok(None),
    };
    if lf == 0 || rest[lf - 1] != b'\r' {
        return Err(DriverError::Protocol("reply line not terminated by CRLF".into()));
    }
    Ok(Some((&rest[..lf - 1], start + lf + 1)))
}

fn parse_i64(data: &[u8]) -> DriverResult<i64> {
    if data.is_empty() {
        return Err(DriverError::Protocol("empty integer".into()));
    }
    let mut negative = false;
    let mut idx = 0;
    if data[0] == b'-' {
        negative = true;
        idx = 1;
    }

    let mut value: i64 = 0;
    while idx < data.len() {
        let b = data[idx];
        if !b.is_ascii_digit() {
            return Err(DriverError::Protocol("invalid integer".into()));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
        idx += 1;
    }

    if negative {
        Ok(-value)
    } else {
        Ok(value)
    }
}

fn push_usize(out: &mut BytesMut, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.put_u8(buf[idx]);
    }
}
