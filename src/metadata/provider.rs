//! Metadata provider backed by a live store connection.
//!
//! | Operation         | Commands                                      |
//! |-------------------|-----------------------------------------------|
//! | `total_key_count` | `DBSIZE`                                      |
//! | `random_key`      | `RANDOMKEY`                                   |
//! | `list_all_keys`   | `SCAN <cursor> COUNT 1000` until cursor is 0  |
//! | `fetch_metadata`  | `DEBUG OBJECT`, `TYPE`, `TTL` in one pipeline |

use crate::connection::Connection;
use crate::metadata::{KeyRecord, MetadataProvider, ProviderError};
use crate::protocol::RespValue;
use bytes::Bytes;
use hashlink::LinkedHashSet;
use tracing::{debug, trace};

/// Keys requested per `SCAN` call
pub const SCAN_BATCH: u64 = 1000;

/// `TTL` reply for a key that does not exist
const TTL_MISSING: i64 = -2;

/// `TTL` reply for a key without an expiry
const TTL_PERSISTENT: i64 = -1;

/// Fields extracted from a `DEBUG OBJECT` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugObject {
    pub serialized_length: u64,
    pub idle_seconds: u64,
}

/// Extracts `serializedlength` and `lru_seconds_idle` from a `DEBUG OBJECT` line,
/// e.g. `Value at:0x7f refcount:1 encoding:embstr serializedlength:5 lru:123 lru_seconds_idle:10`.
pub fn parse_debug_object(line: &str) -> Option<DebugObject> {
    let mut serialized_length = None;
    let mut idle_seconds = None;

    for field in line.split_whitespace() {
        match field.split_once(':') {
            Some(("serializedlength", v)) => serialized_length = v.parse().ok(),
            Some(("lru_seconds_idle", v)) => idle_seconds = v.parse().ok(),
            _ => {}
        }
    }

    Some(DebugObject {
        serialized_length: serialized_length?,
        idle_seconds: idle_seconds?,
    })
}

/// [`MetadataProvider`] that queries a store over RESP.
pub struct RedisProvider {
    conn: Connection,
}

impl RedisProvider {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl MetadataProvider for RedisProvider {
    async fn total_key_count(&mut self) -> Result<u64, ProviderError> {
        let reply = self.conn.query(RespValue::command(["DBSIZE"])).await?;
        match reply {
            RespValue::Integer(n) if n >= 0 => Ok(n as u64),
            RespValue::Error(message) => Err(ProviderError::Command(message)),
            other => Err(unexpected("DBSIZE", &other)),
        }
    }

    async fn random_key(&mut self) -> Result<Option<Bytes>, ProviderError> {
        let reply = self.conn.query(RespValue::command(["RANDOMKEY"])).await?;
        match reply {
            RespValue::Null => Ok(None),
            RespValue::Error(message) => Err(ProviderError::Command(message)),
            other => other
                .clone()
                .into_bytes()
                .map(Some)
                .ok_or_else(|| unexpected("RANDOMKEY", &other)),
        }
    }

    async fn list_all_keys(&mut self) -> Result<Vec<Bytes>, ProviderError> {
        // SCAN may return a key more than once; keep first-seen order
        let mut keys = LinkedHashSet::new();
        let batch = SCAN_BATCH.to_string();
        let mut cursor = "0".to_string();
        let mut calls = 0u64;

        loop {
            let reply = self
                .conn
                .query(RespValue::command([
                    "SCAN",
                    cursor.as_str(),
                    "COUNT",
                    batch.as_str(),
                ]))
                .await?;
            calls += 1;

            let (next, page) = split_scan_reply(reply)?;
            trace!(cursor = %next, page = page.len(), "SCAN page");
            keys.extend(page);

            if next == "0" {
                break;
            }
            cursor = next;
        }

        debug!(keys = keys.len(), calls, "Listed all keys");
        Ok(keys.into_iter().collect())
    }

    async fn fetch_metadata(&mut self, key: &[u8]) -> Result<KeyRecord, ProviderError> {
        let replies = self
            .conn
            .pipeline(&[
                RespValue::command([&b"DEBUG"[..], &b"OBJECT"[..], key]),
                RespValue::command([&b"TYPE"[..], key]),
                RespValue::command([&b"TTL"[..], key]),
            ])
            .await?;

        let replies: [RespValue; 3] =
            replies
                .try_into()
                .map_err(|v: Vec<RespValue>| ProviderError::UnexpectedReply {
                    command: "DEBUG OBJECT/TYPE/TTL",
                    reply: format!("{} replies", v.len()),
                })?;

        interpret_metadata(key, replies)
    }
}

/// Turns the three pipelined replies for `key` into a [`KeyRecord`].
fn interpret_metadata(key: &[u8], replies: [RespValue; 3]) -> Result<KeyRecord, ProviderError> {
    let [debug_reply, type_reply, ttl_reply] = replies;
    let key = String::from_utf8_lossy(key).into_owned();
    let not_found = || ProviderError::NotFound(key.clone());

    let debug = match debug_reply {
        RespValue::Error(message) if message.contains("no such key") => return Err(not_found()),
        RespValue::Error(message) => return Err(ProviderError::Command(message)),
        other => other
            .as_str()
            .and_then(parse_debug_object)
            .ok_or_else(|| unexpected("DEBUG OBJECT", &other))?,
    };

    let key_type = match type_reply {
        RespValue::Error(message) => return Err(ProviderError::Command(message)),
        other => match other.as_str() {
            Some("none") => return Err(not_found()),
            Some(t) => t.to_string(),
            None => return Err(unexpected("TYPE", &other)),
        },
    };

    let ttl_seconds = match ttl_reply {
        RespValue::Integer(TTL_MISSING) => return Err(not_found()),
        RespValue::Integer(TTL_PERSISTENT) => None,
        RespValue::Integer(n) if n >= 0 => Some(n as u64),
        RespValue::Error(message) => return Err(ProviderError::Command(message)),
        other => return Err(unexpected("TTL", &other)),
    };

    Ok(KeyRecord {
        key,
        key_type,
        idle_seconds: debug.idle_seconds,
        serialized_length: debug.serialized_length,
        ttl_seconds,
    })
}

/// Splits a `SCAN` reply into the next cursor and the page of keys.
fn split_scan_reply(reply: RespValue) -> Result<(String, Vec<Bytes>), ProviderError> {
    if let RespValue::Error(message) = reply {
        return Err(ProviderError::Command(message));
    }

    let shape_error = |reply: &RespValue| unexpected("SCAN", reply);
    let parts = match reply {
        RespValue::Array(parts) if parts.len() == 2 => parts,
        other => return Err(shape_error(&other)),
    };

    let mut parts = parts.into_iter();
    let (Some(cursor), Some(page)) = (parts.next(), parts.next()) else {
        return Err(ProviderError::UnexpectedReply {
            command: "SCAN",
            reply: "truncated reply".to_string(),
        });
    };

    let cursor = cursor
        .clone()
        .into_string()
        .ok_or_else(|| shape_error(&cursor))?;
    let page = match page {
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| item.clone().into_bytes().ok_or_else(|| shape_error(&item)))
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(shape_error(&other)),
    };

    Ok((cursor, page))
}

fn unexpected(command: &'static str, reply: &RespValue) -> ProviderError {
    ProviderError::UnexpectedReply {
        command,
        reply: reply.to_string(),
    }
}
