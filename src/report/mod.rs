//! Audit Report Rendering
//!
//! Turns an [`AuditReport`] into the text shown to the operator:
//!
//! 1. A header with the database size, sampled bytes and group count
//! 2. One detail block per group, smallest first
//! 3. A summary table, largest first
//!
//! Output goes to any `std::io::Write`; ANSI styling is optional.

pub mod format;

pub use format::{format_bytes, format_duration, format_percentage, truncate};

use crate::audit::{AuditReport, GroupId, KeyStats};
use std::io::{self, Write};

const RULE: &str =
    "==============================================================================";

/// Summary table columns: title and width
const SUMMARY_COLUMNS: [(&str, usize); 4] = [
    ("Key", 50),
    ("Memory Usage", 12),
    ("Expiry Proportion", 17),
    ("Last Access Time", 50),
];

/// ANSI styling toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Yellow, used for sample keys.
    fn highlight(&self, text: &str) -> String {
        self.wrap("\x1b[0;33m", text)
    }

    /// Bold underline, used for headline numbers.
    fn emphasis(&self, text: &str) -> String {
        self.wrap("\x1b[0;1;4m", text)
    }

    fn wrap(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

/// Renders one audit report.
pub struct ReportGenerator<'a> {
    report: &'a AuditReport,
    style: Style,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(report: &'a AuditReport, style: Style) -> Self {
        Self { report, style }
    }

    /// Writes the full report.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let groups = &self.report.groups;
        let sorted = groups.by_serialized_length();

        writeln!(out, "DB has {} keys", self.report.db_size)?;
        writeln!(
            out,
            "Sampled {} of memory",
            format_bytes(groups.total_serialized_length())
        )?;
        writeln!(out)?;
        writeln!(out, "Found {} key groups", groups.len())?;
        writeln!(out)?;

        for (id, stats) in &sorted {
            self.render_group(out, id, stats)?;
        }

        self.render_summary(out, sorted.iter().rev().map(|(_, stats)| *stats))?;

        if self.report.skipped > 0 {
            writeln!(
                out,
                "{} keys could not be inspected and were skipped",
                self.report.skipped
            )?;
        }
        Ok(())
    }

    fn render_group<W: Write>(&self, out: &mut W, id: &GroupId, stats: &KeyStats) -> io::Result<()> {
        let samples: Vec<&str> = stats.sample_keys.iter().map(String::as_str).collect();

        writeln!(out, "{RULE}")?;
        writeln!(
            out,
            "Found {} keys containing {}s, like:",
            stats.total_instances,
            id.key_type()
        )?;
        writeln!(out, "{}", self.style.highlight(&samples.join(", ")))?;
        writeln!(out)?;
        writeln!(
            out,
            "These keys use {} of the total sampled memory ({})",
            self.style
                .emphasis(&format_percentage(self.report.groups.memory_proportion(stats))),
            format_bytes(stats.total_serialized_length)
        )?;

        if stats.total_expirys_set == 0 {
            writeln!(out, "{} of these keys expire", self.style.emphasis("None"))?;
        } else {
            writeln!(
                out,
                "{} of these keys expire ({}), with maximum ttl of {}",
                self.style
                    .emphasis(&format_percentage(stats.expiry_proportion())),
                stats.total_expirys_set,
                format_duration(stats.max_ttl.unwrap_or(0))
            )?;
        }

        writeln!(
            out,
            "Average last accessed time: {} - (Max: {} Min:{})",
            self.style
                .emphasis(&format_duration(stats.average_idle_time())),
            format_duration(stats.max_idle_time.unwrap_or(0)),
            format_duration(stats.min_idle_time.unwrap_or(0))
        )?;
        writeln!(out)
    }

    fn render_summary<'s, W, I>(&self, out: &mut W, rows: I) -> io::Result<()>
    where
        W: Write,
        I: Iterator<Item = &'s KeyStats>,
    {
        let separator = SUMMARY_COLUMNS
            .iter()
            .map(|(_, width)| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");

        writeln!(out, "{RULE}")?;
        writeln!(out, "Summary")?;
        writeln!(out)?;
        writeln!(out, "{separator}")?;
        write_row(out, SUMMARY_COLUMNS.map(|(title, _)| title.to_string()))?;
        writeln!(out, "{separator}")?;

        for stats in rows {
            // Most recent access in the group
            let last_access = format_duration(stats.min_idle_time.unwrap_or(0));
            write_row(
                out,
                [
                    truncate(stats.first_sample_key().unwrap_or(""), 50).to_string(),
                    format_percentage(self.report.groups.memory_proportion(stats)),
                    format_percentage(stats.expiry_proportion()),
                    truncate(&last_access, 50).to_string(),
                ],
            )?;
        }

        writeln!(out, "{separator}")
    }
}

fn write_row<W: Write>(out: &mut W, cells: [String; 4]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(SUMMARY_COLUMNS)
        .map(|(cell, (_, width))| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(out, "{}", line.trim_end())
}
