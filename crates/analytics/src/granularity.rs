//! Time-bucket resolutions and the truncation applied to every record
//! timestamp before aggregation.

use std::fmt::Display;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Datelike;
use chrono::Days;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Timelike;
use chrono::Utc;
use serde::Serialize;

/// The resolution of a time bucket, ordered from the finest to the coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

/// How a granularity is applied to a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationMode {
    /// Truncate once, to the start of the selected bucket.
    #[default]
    Exact,

    /// Truncate to the selected level, then through every finer level
    /// down to minutes. A month bucket therefore starts on the Sunday on
    /// or before the first day of the month.
    Cascade,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
    ];

    /// Truncates `timestamp` according to `mode`.
    ///
    /// Returns `None` when the bucket would start before the earliest
    /// representable date.
    pub fn truncate(
        self,
        timestamp: DateTime<Utc>,
        mode: TruncationMode,
    ) -> Option<DateTime<Utc>> {
        match mode {
            TruncationMode::Exact => self.floor(timestamp),
            TruncationMode::Cascade => Self::ALL
                .iter()
                .rev()
                .filter(|level| **level <= self)
                .try_fold(timestamp, |ts, level| level.floor(ts)),
        }
    }

    /// The start of the bucket of this granularity that contains `timestamp`.
    pub fn floor(self, timestamp: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let date = timestamp.date_naive();

        let bucket = match self {
            Granularity::Minute => at(date, timestamp.hour(), timestamp.minute()),
            Granularity::Hour => at(date, timestamp.hour(), 0),
            Granularity::Day => at(date, 0, 0),
            Granularity::Week => {
                let days_since_sunday = date.weekday().num_days_from_sunday();
                let sunday = date.checked_sub_days(Days::new(u64::from(days_since_sunday)))?;
                at(sunday, 0, 0)
            }
            Granularity::Month => at(date.with_day(1)?, 0, 0),
        };

        Some(bucket)
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };

        f.write_str(name)
    }
}

/// Returned when a granularity name is not one of
/// `minute`, `hour`, `day`, `week` or `month`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGranularity(pub String);

impl Display for UnknownGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown granularity: `{}`", self.0)
    }
}

impl std::error::Error for UnknownGranularity {}

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGranularity(s.to_owned()))
    }
}
