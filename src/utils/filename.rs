//! Recording filename and timer formatting

use chrono::{DateTime, TimeZone};

/// Product name used as the filename prefix
pub const PRODUCT_NAME: &str = "Reclip";

/// Generate a timestamped filename for a recording
///
/// Format: `Reclip_YYYY-MM-DD_HH-MM-SS.<ext>`
pub fn recording_filename<Tz: TimeZone>(at: &DateTime<Tz>, extension: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}.{}",
        PRODUCT_NAME,
        at.format("%Y-%m-%d_%H-%M-%S"),
        extension
    )
}

/// Format a second count as `HH:MM:SS` for timer displays
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
