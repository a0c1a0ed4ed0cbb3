use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Days, Month, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;
use serde::Serialize;

/// Hour (local to the publisher) after which the day's announcement is out.
pub const PUBLISH_HOUR: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("No timestamp like 'Fri, 31 Oct 2025 20:00 EDT' found in: {0}")]
    ClockParse(String),
    #[error("Window length must be at least one day and start within the calendar")]
    InvalidWindow,
}

static RE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(Mon|Tue|Wed|Thu|Fri|Sat|Sun)[a-z]*,\s+(\d{1,2})\s+([A-Za-z]{3})[a-z]*\s+(\d{4})\s+(\d{1,2}):(\d{2})(?::\d{2})?\s+([A-Za-z]{1,5})\b",
    )
    .expect("invalid regex: timestamp")
});

/// Clock reading taken from the publisher's time page, together with the
/// announcement day it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementClock {
    pub observed: NaiveDateTime,
    /// Zone label as printed. Never used for offset conversion.
    pub zone: String,
    pub target: NaiveDate,
}

impl AnnouncementClock {
    /// Finds the first `Weekday, D Mon YYYY HH:MM ZONE` timestamp in `text`.
    pub fn parse(text: &str) -> Result<Self, ClockError> {
        let caps = RE_TIMESTAMP
            .captures(text)
            .ok_or_else(|| ClockError::ClockParse(snippet(text)))?;

        let bad = || ClockError::ClockParse(caps[0].to_string());

        let day: u32 = caps[2].parse().map_err(|_| bad())?;
        let month = Month::from_str(&caps[3]).map_err(|_| bad())?;
        let year: i32 = caps[4].parse().map_err(|_| bad())?;
        let hour: u32 = caps[5].parse().map_err(|_| bad())?;
        let minute: u32 = caps[6].parse().map_err(|_| bad())?;

        let date =
            NaiveDate::from_ymd_opt(year, month.number_from_month(), day).ok_or_else(bad)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(bad)?;

        if let Ok(label) = Weekday::from_str(&caps[1])
            && label != date.weekday()
        {
            log::warn!(
                "Timestamp '{}' says {} but {} is a {}",
                &caps[0],
                label,
                date,
                date.weekday()
            );
        }

        let observed = NaiveDateTime::new(date, time);

        Ok(Self {
            observed,
            zone: caps[7].to_string(),
            target: target_date_for(observed),
        })
    }
}

impl FromStr for AnnouncementClock {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn resolve_target_date(timestamp: &str) -> Result<NaiveDate, ClockError> {
    AnnouncementClock::parse(timestamp).map(|clock| clock.target)
}

/// Most recent announcement day as seen at `observed`.
///
/// Announcements go out every weekday at [`PUBLISH_HOUR`]. A weekend reading
/// always maps to the preceding Friday. A weekday reading before the publish
/// hour maps to the previous weekday.
pub fn target_date_for(observed: NaiveDateTime) -> NaiveDate {
    let date = observed.date();

    match date.weekday() {
        Weekday::Sat | Weekday::Sun => {
            let back = date.weekday().num_days_from_monday() - Weekday::Fri.num_days_from_monday();
            date - Days::new(u64::from(back))
        }
        _ if observed.hour() >= PUBLISH_HOUR => date,
        _ => roll_back_weekend(date - Days::new(1)),
    }
}

fn roll_back_weekend(mut date: NaiveDate) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date - Days::new(1);
    }
    date
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(80) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Inclusive `[start, end]` range of announcement days ending at `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub target: NaiveDate,
    pub days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(target: NaiveDate, days: u32) -> Result<Self, ClockError> {
        let start = days
            .checked_sub(1)
            .and_then(|back| target.checked_sub_days(Days::new(u64::from(back))))
            .ok_or(ClockError::InvalidWindow)?;

        Ok(Self {
            target,
            days,
            start,
            end: target,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.days == 1 {
            write!(f, "{}", self.target)
        } else {
            write!(f, "{} .. {} ({} days)", self.start, self.end, self.days)
        }
    }
}

pub fn resolve_window(timestamp: &str, window_days: u32) -> Result<Window, ClockError> {
    let target = resolve_target_date(timestamp)?;
    Window::new(target, window_days)
}
