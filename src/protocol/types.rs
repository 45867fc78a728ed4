//! RESP (Redis Serialization Protocol) Data Types
//!
//! Every RESP value starts with a one byte type prefix and ends with CRLF:
//! - `+` Simple String, e.g. `+string\r\n` (reply to `TYPE`)
//! - `-` Error, e.g. `-ERR no such key\r\n`
//! - `:` Integer, e.g. `:-1\r\n` (reply to `TTL` for a persistent key)
//! - `$` Bulk String, e.g. `$8\r\nuser:101\r\n`, or `$-1\r\n` for null
//! - `*` Array, e.g. a `SCAN` reply `*2\r\n$1\r\n0\r\n*0\r\n`
//!
//! Clients only ever send arrays of bulk strings, so encoding is limited to
//! [`RespValue::command`] plus [`RespValue::serialize`].

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP2 value, either a decoded reply or an encoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply, e.g. `OK` or a type name.
    SimpleString(String),

    /// Error reply. The first word is the error code (`ERR`, `WRONGTYPE`, ...).
    Error(String),

    /// 64-bit signed integer reply.
    Integer(i64),

    /// Binary-safe string.
    BulkString(Bytes),

    /// Null bulk string or null array.
    Null,

    /// Possibly nested array.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Builds a request: an array of bulk strings, command name first.
    ///
    /// # Example
    /// ```
    /// use keyaudit::protocol::types::RespValue;
    /// let scan = RespValue::command(["SCAN", "0", "COUNT", "1000"]);
    /// assert_eq!(scan.serialize().first(), Some(&b'*'));
    /// ```
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        RespValue::Array(
            args.into_iter()
                .map(|arg| RespValue::BulkString(Bytes::copy_from_slice(arg.as_ref())))
                .collect(),
        )
    }

    /// Serializes the value to its wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer, so a pipeline of
    /// commands can share one write.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Returns the text of a simple or UTF-8 bulk string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the integer value. Bulk strings holding a decimal number are
    /// accepted too, since `SCAN` returns its cursor that way.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok()?.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Converts a string reply into its raw bytes. Keys must travel this
    /// way, since they are binary safe on the server.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            RespValue::SimpleString(s) => Some(Bytes::from(s)),
            RespValue::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Converts a string reply into an owned `String`, replacing invalid
    /// UTF-8. Only for text meant for display.
    pub fn into_string(self) -> Option<String> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => Some(String::from_utf8_lossy(&b).into_owned()),
            _ => None,
        }
    }
}

fn write_line(buf: &mut Vec<u8>, type_prefix: u8, content: &[u8]) {
    buf.push(type_prefix);
    buf.extend_from_slice(content);
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => write!(f, "(array of {})", values.len()),
        }
    }
}
