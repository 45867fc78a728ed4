//! Where to connect and how to authenticate.
//!
//! A target comes either from a `redis://` URL or from separate host, port
//! and database number arguments.

use percent_encoding::percent_decode_str;
use std::fmt;
use thiserror::Error;
use url::{ParseError, Url};

/// Errors produced while resolving a connection target.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetError {
    #[error("unsupported URL scheme {0:?} (expected redis://)")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("invalid database number {0:?}")]
    InvalidDatabase(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// A fully resolved store address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    /// The URL this target was parsed from, kept for display.
    pub url: Option<String>,
}

impl ConnectionTarget {
    /// Creates a target from discrete parts, with no credentials.
    pub fn new(host: impl Into<String>, port: u16, db: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db,
            username: None,
            password: None,
            url: None,
        }
    }

    /// Parses `redis://[[username]:password@]host[:port][/db]`.
    ///
    /// Port defaults to [`crate::DEFAULT_PORT`] and the database to 0.
    /// Percent-encoded credentials are decoded.
    pub fn from_url(url: &str) -> Result<Self, TargetError> {
        let parsed = Url::parse(url).map_err(|e| match e {
            ParseError::EmptyHost => TargetError::MissingHost(url.to_string()),
            ParseError::InvalidPort => TargetError::InvalidPort(url.to_string()),
            ParseError::RelativeUrlWithoutBase => TargetError::UnsupportedScheme(String::new()),
            other => TargetError::InvalidUrl(other.to_string()),
        })?;

        if parsed.scheme() != "redis" {
            return Err(TargetError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(TargetError::MissingHost(url.to_string())),
        };

        let db = match parsed.path().trim_matches('/') {
            "" => 0,
            db => db
                .parse::<u32>()
                .map_err(|_| TargetError::InvalidDatabase(db.to_string()))?,
        };

        Ok(Self {
            host,
            port: parsed.port().unwrap_or(crate::DEFAULT_PORT),
            db,
            username: decode_credential(parsed.username())?,
            password: parsed.password().map(decode_credential).transpose()?.flatten(),
            url: Some(url.to_string()),
        })
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Percent-decodes one userinfo component; empty means absent.
fn decode_credential(raw: &str) -> Result<Option<String>, TargetError> {
    if raw.is_empty() {
        return Ok(None);
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| Some(decoded.into_owned()))
        .map_err(|_| TargetError::InvalidUrl(format!("credentials are not UTF-8: {raw}")))
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            // Never echo credentials
            Some(_) if self.password.is_some() => {
                write!(f, "redis://***@{}:{}/{}", self.host, self.port, self.db)
            }
            Some(url) => write!(f, "{}", url),
            None => write!(f, "{}:{} dbnum:{}", self.host, self.port, self.db),
        }
    }
}
