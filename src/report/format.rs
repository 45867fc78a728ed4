//! Human-readable renderings of sizes, durations and proportions.

/// Formats a byte count with a 1024 base: `512 bytes`, `1.50 kB`, `3.25 MB`, `1.00 GB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let scaled = |unit: u64| bytes as f64 / unit as f64;
    if bytes >= GB {
        format!("{:.2} GB", scaled(GB))
    } else if bytes >= MB {
        format!("{:.2} MB", scaled(MB))
    } else if bytes >= KB {
        format!("{:.2} kB", scaled(KB))
    } else {
        format!("{} bytes", bytes)
    }
}

/// Formats seconds as `1 day, 2 hours, 5 seconds`. Zero parts are left out.
pub fn format_duration(seconds: u64) -> String {
    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, mins) = (minutes / 60, minutes % 60);
    let (days, hrs) = (hours / 24, hours % 24);

    let parts: Vec<String> = [
        (days, "day"),
        (hrs, "hour"),
        (mins, "minute"),
        (secs, "second"),
    ]
    .into_iter()
    .filter(|(n, _)| *n != 0)
    .map(|(n, unit)| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" }))
    .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// Formats a `[0, 1]` proportion as a percentage with two decimals.
pub fn format_percentage(proportion: f64) -> String {
    format!("{:.2}%", proportion * 100.0)
}

/// Cuts `s` to at most `max` characters.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
