//! keyaudit - Memory Usage Breakdown for Redis-Compatible Stores
//!
//! Entry point: parses arguments, connects, runs the audit and prints the
//! report to stdout. Logs and skipped-key warnings go to stderr.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use keyaudit::audit::{Auditor, KeyClassifier};
use keyaudit::config::{Args, AuditConfig};
use keyaudit::connection::Connection;
use keyaudit::metadata::RedisProvider;
use keyaudit::report::{ReportGenerator, Style};
use std::io::{BufWriter, IsTerminal, Write};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn print_banner(config: &AuditConfig) {
    let sample = match config.sample_size {
        Some(n) => n.to_string(),
        None => "10% of".to_string(),
    };
    println!(
        "keyaudit v{} - auditing {} sampling {} keys",
        keyaudit::VERSION,
        config.target,
        sample
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Argument problems exit with usage text before touching the store
    let config = match Args::parse().resolve() {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    init_logging(config.quiet);
    print_banner(&config);

    let conn = Connection::open(&config.target)
        .await
        .with_context(|| format!("failed to connect to {}", config.target))?;
    info!(server = %config.target, "Connected");

    let classifier = KeyClassifier::new(config.classifier.clone());
    let auditor = Auditor::new(RedisProvider::new(conn), classifier);
    let (report, provider) = auditor
        .run(config.sample_size)
        .await
        .context("audit aborted")?;

    let stats = provider.connection().stats();
    info!(
        round_trips = stats.round_trips,
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        "Connection statistics"
    );

    let style = Style::new(config.color && std::io::stdout().is_terminal());
    let mut out = BufWriter::new(std::io::stdout().lock());
    ReportGenerator::new(&report, style).render(&mut out)?;
    out.flush()?;

    Ok(())
}
