//! RESP Protocol Implementation (client side)
//!
//! The auditor talks to the store with the Redis Serialization Protocol.
//! Requests are always arrays of bulk strings; replies may be any RESP2 type.
//!
//! ## Modules
//!
//! - `types`: The `RespValue` enum, command encoding and reply accessors
//! - `parser`: Incremental parser for server replies
//!
//! ## Example
//!
//! ```ignore
//! use keyaudit::protocol::{parse_reply, RespValue};
//!
//! // Encoding a request
//! let request = RespValue::command(["TYPE", "user:1001"]).serialize();
//!
//! // Decoding a reply
//! let (reply, consumed) = parse_reply(b"+string\r\n").unwrap().unwrap();
//! assert_eq!(reply.as_str(), Some("string"));
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_reply, ParseError, ParseResult, RespParser};
pub use types::RespValue;
