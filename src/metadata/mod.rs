//! Key Metadata Retrieval
//!
//! The audit engine never talks to the network directly. It asks a
//! [`MetadataProvider`] for the key count, for keys to examine, and for
//! each key's type, size, idle time and TTL. [`RedisProvider`] is the
//! implementation backed by a live [`Connection`](crate::connection::Connection).

pub mod provider;
pub mod record;

pub use provider::{parse_debug_object, RedisProvider, SCAN_BATCH};
pub use record::KeyRecord;

use crate::connection::ConnectionError;
use bytes::Bytes;
use thiserror::Error;

/// Errors raised by a metadata provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The key disappeared between being listed and being inspected
    #[error("key not found: {0}")]
    NotFound(String),

    /// The server answered with an error reply
    #[error("command failed: {0}")]
    Command(String),

    /// The server answered with a reply of the wrong shape
    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ProviderError {
    /// True when the run cannot continue. Everything else only affects the
    /// key being inspected.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Connection(_))
    }
}

/// Source of keys and key metadata.
///
/// Keys are raw bytes: the store does not require them to be UTF-8, and a
/// key must be sent back exactly as it was received.
///
/// Implementations are driven from a single task, one call at a time.
#[allow(async_fn_in_trait)]
pub trait MetadataProvider {
    /// Number of keys in the selected database.
    async fn total_key_count(&mut self) -> Result<u64, ProviderError>;

    /// A uniformly random key, or `None` when the database is empty.
    async fn random_key(&mut self) -> Result<Option<Bytes>, ProviderError>;

    /// Every key in the database, each exactly once.
    async fn list_all_keys(&mut self) -> Result<Vec<Bytes>, ProviderError>;

    /// Type, size, idle time and TTL of `key`.
    async fn fetch_metadata(&mut self, key: &[u8]) -> Result<KeyRecord, ProviderError>;
}
