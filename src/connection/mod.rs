//! Store Connection Module
//!
//! The auditor keeps exactly one connection open for the whole run.
//!
//! ## Components
//!
//! - [`ConnectionTarget`]: host/port/db/credentials, from a URL or discrete arguments
//! - [`Connection`]: RESP client with single-command and pipelined round trips
//! - [`ClientStats`]: round trip and byte counters, logged at the end of a run

pub mod client;
pub mod target;

pub use client::{ClientStats, Connection, ConnectionError};
pub use target::{ConnectionTarget, TargetError};
