//! Countdown parsing and carriage-return aware line splitting.

use chrono::{DateTime, Days, Duration, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::LivestreamError;

/// A parsed `HH:MM:SS` countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn total_secs(&self) -> u64 {
        ((self.days * 24 + self.hours) * 60 + self.minutes) * 60 + self.seconds
    }

    /// Absolute time the countdown ends at, counted from `now`.
    pub fn target(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let clock = Duration::seconds(((self.hours * 60 + self.minutes) * 60 + self.seconds) as i64);
        now.checked_add_days(Days::new(self.days))?
            .checked_add_signed(clock)
    }
}

static COUNTDOWN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+):(\d{2}):(\d{2})").unwrap());

/// Parse a countdown such as `05:30:00` or `30:15:00`.
///
/// Hours past a day roll over into whole days.
pub fn parse_time_span(span: &str) -> Result<Countdown, LivestreamError> {
    let invalid = || LivestreamError::InvalidCountdown(span.to_string());

    let caps = COUNTDOWN.captures(span).ok_or_else(invalid)?;
    let field = |i: usize| -> Result<u64, LivestreamError> {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)
    };

    let (mut hours, minutes, seconds) = (field(1)?, field(2)?, field(3)?);
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    let mut days = 0;
    if hours > 24 {
        days = hours / 24;
        hours %= 24;
    }

    Ok(Countdown {
        days,
        hours,
        minutes,
        seconds,
    })
}

/// Read the next token terminated by `\r` or `\n`.
///
/// The downloader redraws countdowns in place with bare carriage returns,
/// so both count as line ends. Empty tokens are returned as is.
pub async fn next_token<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut token = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if token.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&token).into_owned())
            });
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\r' || *b == b'\n') {
            token.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            return Ok(Some(String::from_utf8_lossy(&token).into_owned()));
        }

        let len = available.len();
        token.extend_from_slice(available);
        reader.consume(len);
    }
}
