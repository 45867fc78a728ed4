//! Incremental RESP Reply Parser
//!
//! Replies arrive over TCP in arbitrary chunks, so the parser works on
//! whatever is buffered and reports one of:
//! - `Ok(Some((value, consumed)))` - a full reply was decoded from the first `consumed` bytes
//! - `Ok(None)` - the reply is incomplete, read more and try again
//! - `Err(ParseError)` - the stream is not valid RESP
//!
//! The caller owns the buffer and advances it by `consumed` after each value.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, nesting too deep, ...)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("reply too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Parser for server replies.
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to decode one reply from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&type_prefix) = buf.first() else {
            return Ok(None);
        };

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        // Every type starts with a header line
        let Some((header, header_len)) = read_line(buf)? else {
            return Ok(None);
        };

        match type_prefix {
            prefix::SIMPLE_STRING => Ok(Some((
                RespValue::SimpleString(header.to_string()),
                header_len,
            ))),
            prefix::ERROR => Ok(Some((RespValue::Error(header.to_string()), header_len))),
            prefix::INTEGER => Ok(Some((RespValue::Integer(parse_int(header)?), header_len))),
            prefix::BULK_STRING => parse_bulk_body(buf, parse_int(header)?, header_len),
            prefix::ARRAY => self.parse_array_body(buf, parse_int(header)?, header_len),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Decodes `count` elements following an array header.
    fn parse_array_body(
        &mut self,
        buf: &[u8],
        count: i64,
        header_len: usize,
    ) -> ParseResult<Option<(RespValue, usize)>> {
        if count == -1 {
            return Ok(Some((RespValue::Null, header_len)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        // Cap the preallocation; a bogus header must not reserve gigabytes
        let mut elements = Vec::with_capacity(count.min(1024));
        let mut consumed = header_len;

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Decodes the payload following a bulk string header.
fn parse_bulk_body(
    buf: &[u8],
    length: i64,
    header_len: usize,
) -> ParseResult<Option<(RespValue, usize)>> {
    if length == -1 {
        return Ok(Some((RespValue::Null, header_len)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let end = header_len + length;
    if buf.len() < end + CRLF.len() {
        return Ok(None);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[header_len..end]);
    Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
}

/// Reads the header line after the type prefix.
///
/// Returns the line content (without prefix and CRLF) and the number of
/// bytes the whole line occupies.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let line = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((line, 1 + pos + CRLF.len())))
        }
        None => Ok(None),
    }
}

fn parse_int(s: &str) -> ParseResult<i64> {
    s.parse()
        .map_err(|e: std::num::ParseIntError| ParseError::InvalidInteger(format!("{s:?}: {e}")))
}

/// Finds the position of CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single reply with a fresh parser.
pub fn parse_reply(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
