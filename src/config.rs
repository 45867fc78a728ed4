//! Command-line configuration.
//!
//! Two invocation styles are accepted:
//!
//! ```text
//! keyaudit --url redis://localhost:6379/0 --sample 5000
//! keyaudit --host localhost [--port 6379] [--dbnum 0] [--sample 5000]
//! keyaudit localhost 6379 0 [5000]          # positional form
//! ```

use crate::audit::{ClassifierConfig, GroupRule, MatchThreshold};
use crate::connection::{ConnectionTarget, TargetError};
use clap::{ArgAction, Parser};
use thiserror::Error;

const EXAMPLES: &str = "\
EXAMPLES:
    keyaudit --host 127.0.0.1                      # sample 10% of db 0
    keyaudit --url redis://:secret@cache:6380/2 -s 20000
    keyaudit -h 127.0.0.1 -g '^feed:' -g '^cart:'  # force two groups
    keyaudit 127.0.0.1 6379 0 1000                 # positional form

Log verbosity follows RUST_LOG (default: info). Logs go to stderr.";

/// Raw command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "keyaudit",
    version,
    about = "Samples keys from a Redis-compatible store and breaks memory usage down by key group",
    disable_help_flag = true,
    after_help = EXAMPLES
)]
pub struct Args {
    /// Connection URL: redis://[[user]:password@]host[:port][/db]
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Store host
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Store port (default: 6379)
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Database number (default: 0)
    #[arg(short = 'd', long)]
    pub dbnum: Option<u32>,

    /// Number of keys to sample; 0 samples 10% of the database
    #[arg(short = 's', long = "sample", value_name = "NUM")]
    pub sample_size: Option<u64>,

    /// Regex forcing matching keys into one group; may be repeated
    #[arg(short = 'g', long = "group", value_name = "REGEX")]
    pub groups: Vec<String>,

    /// A prefix match must cover at least 1/N of the digit-stripped key
    #[arg(long, value_name = "N", default_value_t = MatchThreshold::DEFAULT_DIVISOR)]
    pub match_divisor: usize,

    /// Disable ANSI colors in the report
    #[arg(long)]
    pub no_color: bool,

    /// Only log warnings (skipped keys) and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,

    /// HOST PORT DBNUM [SAMPLE], used when neither --url nor --host is given
    #[arg(value_name = "ARGS")]
    pub positional: Vec<String>,
}

/// Configuration problems detected before contacting the store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("invalid group pattern {pattern:?}: {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("match divisor must be at least 1")]
    InvalidDivisor,

    #[error("invalid {name} {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0}")]
    Usage(String),
}

/// Everything a run needs, resolved from [`Args`].
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub target: ConnectionTarget,
    /// `None` samples the default share of the database
    pub sample_size: Option<u64>,
    pub classifier: ClassifierConfig,
    /// Colors requested; the caller still checks for a terminal
    pub color: bool,
    pub quiet: bool,
}

impl Args {
    /// Validates the arguments and resolves the connection target.
    pub fn resolve(self) -> Result<AuditConfig, ConfigError> {
        let (target, positional_sample) = self.resolve_target()?;

        let rules = self
            .groups
            .iter()
            .map(|pattern| {
                GroupRule::new(pattern).map_err(|source| ConfigError::InvalidRule {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let threshold =
            MatchThreshold::new(self.match_divisor).ok_or(ConfigError::InvalidDivisor)?;

        let sample_size = positional_sample
            .or(self.sample_size)
            .filter(|&n| n > 0);

        Ok(AuditConfig {
            target,
            sample_size,
            classifier: ClassifierConfig { rules, threshold },
            color: !self.no_color,
            quiet: self.quiet,
        })
    }

    fn resolve_target(&self) -> Result<(ConnectionTarget, Option<u64>), ConfigError> {
        if (self.url.is_some() || self.host.is_some()) && !self.positional.is_empty() {
            return Err(ConfigError::Usage(
                "positional arguments cannot be combined with --url or --host".to_string(),
            ));
        }

        if let Some(url) = &self.url {
            return Ok((ConnectionTarget::from_url(url)?, None));
        }

        if let Some(host) = &self.host {
            let target = ConnectionTarget::new(
                host.clone(),
                self.port.unwrap_or(crate::DEFAULT_PORT),
                self.dbnum.unwrap_or(0),
            );
            return Ok((target, None));
        }

        match self.positional.as_slice() {
            [host, port, db, rest @ ..] if rest.len() <= 1 => {
                let port = parse_number("port", port)?;
                let db = parse_number("database number", db)?;
                let sample = rest
                    .first()
                    .map(|s| parse_number("sample size", s))
                    .transpose()?;
                Ok((ConnectionTarget::new(host.clone(), port, db), sample))
            }
            _ => Err(ConfigError::Usage(
                "Run keyaudit --help for information on how to use this tool.".to_string(),
            )),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}
