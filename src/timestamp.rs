use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CaptionError;

// @module: SRT timestamp codec

// @const: SRT timestamp regex, comma or period before the milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})$").unwrap()
});

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Largest value that still fits the two-digit hour field (99:59:59,999)
pub const MAX_TWO_DIGIT_HOUR_MS: u64 = 359_999_999;

/// Format an elapsed duration in milliseconds as `HH:MM:SS,mmm`
///
/// The value is a duration, not a wall-clock time, so no timezone is applied.
pub fn encode(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Parse `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`) into milliseconds
pub fn decode(timestamp: &str) -> Result<u64, CaptionError> {
    let malformed = || CaptionError::MalformedTimestamp(timestamp.to_string());

    let caps = TIMESTAMP_REGEX.captures(timestamp.trim()).ok_or_else(malformed)?;
    let field = |i: usize| -> Result<u64, CaptionError> {
        caps[i].parse::<u64>().map_err(|_| malformed())
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(malformed());
    }

    hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|h| h.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
        .ok_or_else(malformed)
}
