//! In-process fake store speaking just enough RESP for an audit run.
//!
//! Supports `AUTH`, `SELECT`, `DBSIZE`, `RANDOMKEY`, `SCAN`, `DEBUG OBJECT`,
//! `TYPE` and `TTL`. Every request is logged so tests can assert on the
//! traffic a run produced.

#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use keyaudit::protocol::{RespParser, RespValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One stored key as the fake reports it.
#[derive(Debug, Clone)]
pub struct FakeKey {
    pub key_type: &'static str,
    pub serialized_length: u64,
    pub idle_seconds: u64,
    pub ttl: Option<u64>,
}

impl FakeKey {
    pub fn new(key_type: &'static str, serialized_length: u64) -> Self {
        Self {
            key_type,
            serialized_length,
            idle_seconds: 0,
            ttl: None,
        }
    }

    pub fn idle(mut self, seconds: u64) -> Self {
        self.idle_seconds = seconds;
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }
}

/// Keyspace plus behavior switches.
#[derive(Debug, Default)]
pub struct FakeStore {
    /// SCAN and RANDOMKEY order; may name keys missing from `records`
    listing: Vec<Bytes>,
    records: HashMap<Bytes, FakeKey>,
    password: Option<String>,
    page_size: Option<usize>,
    /// Each SCAN page after the first repeats the previous page's last key
    overlap_pages: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, name: impl AsRef<[u8]>, key: FakeKey) -> Self {
        let name = Bytes::copy_from_slice(name.as_ref());
        self.listing.push(name.clone());
        self.records.insert(name, key);
        self
    }

    /// A key that is listed but gone by the time it is inspected.
    pub fn vanished(mut self, name: impl AsRef<[u8]>) -> Self {
        self.listing.push(Bytes::copy_from_slice(name.as_ref()));
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn overlapping_pages(mut self) -> Self {
        self.overlap_pages = true;
        self
    }
}

struct Shared {
    store: FakeStore,
    random_cursor: AtomicUsize,
    log: Mutex<Vec<Vec<String>>>,
}

/// A running fake store bound to an ephemeral local port.
pub struct FakeServer {
    addr: String,
    port: u16,
    shared: Arc<Shared>,
}

impl FakeServer {
    pub async fn start(store: FakeStore) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            store,
            random_cursor: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        });

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, Arc::clone(&accept_shared)));
            }
        });

        Self {
            addr: local.to_string(),
            port: local.port(),
            shared,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Every request received so far, as upper-cased name plus arguments.
    /// Arguments that are not UTF-8 are shown lossily.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.shared.log.lock().unwrap().clone()
    }

    /// Number of requests whose name is `name`.
    pub fn count(&self, name: &str) -> usize {
        self.commands()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some(name))
            .count()
    }
}

async fn serve(mut socket: TcpStream, shared: Arc<Shared>) {
    let mut buffer = BytesMut::with_capacity(4096);
    let mut parser = RespParser::new();

    loop {
        while let Ok(Some((request, used))) = parser.parse(&buffer) {
            let _ = buffer.split_to(used);
            let args = request_args(request);
            shared.log.lock().unwrap().push(
                args.iter()
                    .map(|arg| String::from_utf8_lossy(arg).into_owned())
                    .collect(),
            );

            let reply = execute(&shared, &args);
            if socket.write_all(&reply.serialize()).await.is_err() {
                return;
            }
        }

        match socket.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Command arguments as raw bytes, with the command name upper-cased.
fn request_args(request: RespValue) -> Vec<Bytes> {
    let mut args: Vec<Bytes> = request
        .into_array()
        .unwrap_or_default()
        .into_iter()
        .filter_map(RespValue::into_bytes)
        .collect();
    if let Some(name) = args.first_mut() {
        *name = Bytes::from(name.to_ascii_uppercase());
    }
    args
}

fn execute(shared: &Shared, args: &[Bytes]) -> RespValue {
    let store = &shared.store;
    let args: Vec<&[u8]> = args.iter().map(|arg| &arg[..]).collect();

    match args.as_slice() {
        [b"AUTH", .., password] => match &store.password {
            Some(expected) if expected.as_bytes() == *password => ok(),
            _ => RespValue::Error("WRONGPASS invalid username-password pair".to_string()),
        },
        [b"SELECT", db] => match std::str::from_utf8(db).ok().and_then(|db| db.parse::<u32>().ok()) {
            Some(n) if n < 16 => ok(),
            _ => RespValue::Error("ERR DB index is out of range".to_string()),
        },
        [b"DBSIZE"] => RespValue::Integer(store.listing.len() as i64),
        [b"RANDOMKEY"] => {
            if store.listing.is_empty() {
                return RespValue::Null;
            }
            let i = shared.random_cursor.fetch_add(1, Ordering::SeqCst);
            RespValue::BulkString(store.listing[i % store.listing.len()].clone())
        }
        [b"SCAN", cursor, ..] => scan(store, cursor),
        [b"DEBUG", sub, key] if sub.eq_ignore_ascii_case(b"OBJECT") => match store.records.get(*key) {
            Some(record) => RespValue::SimpleString(format!(
                "Value at:0x7f0000000000 refcount:1 encoding:raw serializedlength:{} lru:0 lru_seconds_idle:{}",
                record.serialized_length, record.idle_seconds
            )),
            None => RespValue::Error("ERR no such key".to_string()),
        },
        [b"TYPE", key] => RespValue::SimpleString(
            store
                .records
                .get(*key)
                .map_or("none", |record| record.key_type)
                .to_string(),
        ),
        [b"TTL", key] => RespValue::Integer(match store.records.get(*key) {
            None => -2,
            Some(FakeKey { ttl: None, .. }) => -1,
            Some(FakeKey { ttl: Some(t), .. }) => *t as i64,
        }),
        _ => RespValue::Error(format!(
            "ERR unknown command '{}'",
            String::from_utf8_lossy(&args.concat())
        )),
    }
}

fn scan(store: &FakeStore, cursor: &[u8]) -> RespValue {
    let Some(cursor) = std::str::from_utf8(cursor)
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
    else {
        return RespValue::Error("ERR invalid cursor".to_string());
    };
    let page_size = store.page_size.unwrap_or(usize::MAX);
    let len = store.listing.len();

    let start = if store.overlap_pages && cursor > 0 {
        cursor - 1
    } else {
        cursor
    }
    .min(len);
    let end = cursor.saturating_add(page_size).min(len);
    let next = if end >= len { 0 } else { end };

    let page = store.listing[start..end]
        .iter()
        .map(|k| RespValue::BulkString(k.clone()))
        .collect();
    RespValue::Array(vec![bulk(&next.to_string()), RespValue::Array(page)])
}

fn ok() -> RespValue {
    RespValue::SimpleString("OK".to_string())
}

fn bulk(s: &str) -> RespValue {
    RespValue::BulkString(Bytes::copy_from_slice(s.as_bytes()))
}
