//! # keyaudit - Memory Usage Breakdown for Redis-Compatible Stores
//!
//! keyaudit samples keys from a running store, sorts them into groups of
//! keys that serve the same purpose (`session:<id>`, `user:<id>:cart`, ...)
//! and reports how much memory each group holds, how many of its keys
//! expire and how recently they were used.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              keyaudit                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────────┐    ┌──────────────────────┐     │
//! │  │   Sampler   │───>│ RedisProvider   │───>│    KeyClassifier     │     │
//! │  │ (random or  │    │ DEBUG OBJECT +  │    │ digit stripping +    │     │
//! │  │  full SCAN) │    │ TYPE + TTL      │    │ longest prefix match │     │
//! │  └─────────────┘    └────────┬────────┘    └──────────┬───────────┘     │
//! │                              │                        │                 │
//! │                     ┌────────┴────────┐               ▼                 │
//! │                     │   Connection    │    ┌──────────────────────┐     │
//! │                     │  RESP pipeline  │    │   StatsAggregator    │     │
//! │                     └─────────────────┘    │ GroupId -> KeyStats  │     │
//! │                                            └──────────┬───────────┘     │
//! │                                                       ▼                 │
//! │                                            ┌──────────────────────┐     │
//! │                                            │   ReportGenerator    │     │
//! │                                            └──────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use keyaudit::audit::{Auditor, KeyClassifier};
//! use keyaudit::connection::{Connection, ConnectionTarget};
//! use keyaudit::metadata::RedisProvider;
//! use keyaudit::report::{ReportGenerator, Style};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = ConnectionTarget::new("127.0.0.1", 6379, 0);
//!     let conn = Connection::open(&target).await?;
//!
//!     let auditor = Auditor::new(RedisProvider::new(conn), KeyClassifier::default());
//!     let (report, _provider) = auditor.run(Some(10_000)).await?;
//!
//!     ReportGenerator::new(&report, Style::plain()).render(&mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP reply parser and command encoder
//! - [`connection`]: Store connection with pipelining, connection targets
//! - [`metadata`]: The `MetadataProvider` seam and its store-backed implementation
//! - [`audit`]: Sampling, classification and aggregation
//! - [`report`]: Text rendering of the aggregated groups
//! - [`config`]: Command-line arguments
//!
//! ## Design Highlights
//!
//! ### One Round Trip Per Key
//!
//! `DEBUG OBJECT`, `TYPE` and `TTL` are written in one pipeline, so each
//! key costs a single network round trip.
//!
//! ### Groups Are Discovered, Not Declared
//!
//! Digits are stripped from every key and the remainder is matched against
//! the groups seen so far by longest common prefix. Explicit regex rules can
//! override the heuristic for keys it splits or merges wrongly.

pub mod audit;
pub mod config;
pub mod connection;
pub mod metadata;
pub mod protocol;
pub mod report;

pub use audit::{AuditReport, Auditor, GroupId, KeyClassifier, KeyStats, StatsAggregator};
pub use connection::{Connection, ConnectionError, ConnectionTarget};
pub use metadata::{KeyRecord, MetadataProvider, ProviderError, RedisProvider};
pub use protocol::{ParseError, RespParser, RespValue};
pub use report::{ReportGenerator, Style};

/// Default store port
pub const DEFAULT_PORT: u16 = 6379;

/// Default store host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of keyaudit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
