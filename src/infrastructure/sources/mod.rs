pub mod beeper;
pub mod granola;
pub mod process;

pub use beeper::BeeperSource;
pub use granola::GranolaSource;
pub use process::CommandRunner;

use chrono::{DateTime, NaiveDateTime, Utc};

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` read as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}
