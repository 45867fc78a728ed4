/// Metadata for one sampled key, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// Printable form of the key, with invalid UTF-8 replaced
    pub key: String,
    /// `string`, `hash`, `list`, ...
    pub key_type: String,
    /// Seconds since the key was last accessed
    pub idle_seconds: u64,
    /// Encoded size of the value in bytes
    pub serialized_length: u64,
    /// Remaining time to live; `None` for keys that never expire
    pub ttl_seconds: Option<u64>,
}

impl KeyRecord {
    pub fn new(key: impl Into<String>, key_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            key_type: key_type.into(),
            idle_seconds: 0,
            serialized_length: 0,
            ttl_seconds: None,
        }
    }

    pub fn with_idle(mut self, seconds: u64) -> Self {
        self.idle_seconds = seconds;
        self
    }

    pub fn with_length(mut self, bytes: u64) -> Self {
        self.serialized_length = bytes;
        self
    }

    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }
}
