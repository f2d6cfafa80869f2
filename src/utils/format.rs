use std::time::Duration;

/// Format a duration as a short human-readable wait time
///
/// Sub-second remainders are rounded up so a pending wait never shows as zero.
///
/// # Examples
/// ```
/// use rs_wallet_scanner::utils::format::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(599)), "9m 59s");
/// assert_eq!(format_duration(Duration::from_secs(3720)), "1h 2m");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs += 1;
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Display form of an address in user-facing messages
pub fn format_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return "N/A".to_string();
    }
    trimmed.to_string()
}
