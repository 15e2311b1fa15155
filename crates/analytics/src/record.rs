use std::sync::Arc;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One row of a consultation log.
///
/// Every recognized column is optional; an absent column and an empty
/// cell are both `None`. Columns that are not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub platform_name: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub rtype: Option<String>,
    #[serde(default)]
    pub publication_title: Option<String>,
    #[serde(default, rename = "geoip-latitude")]
    pub latitude: Option<String>,
    #[serde(default, rename = "geoip-longitude")]
    pub longitude: Option<String>,

    /// The record time truncated to the granularity of the import.
    #[serde(skip)]
    pub bucketed_time: Option<DateTime<Utc>>,

    /// The name of the nearest reference region, if one is close enough.
    #[serde(skip)]
    pub region: Option<Arc<str>>,
}

/// A recognized column, used to build conditional aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Platform,
    Mime,
    Rtype,
    PublicationTitle,
    Region,
}

/// The geographic columns of a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coordinates {
    /// At least one of the two columns is absent.
    Absent,

    /// Both columns are present but at least one is not a number.
    Invalid,

    Valid { latitude: f64, longitude: f64 },
}

/// Which time column a record's time was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Timestamp,
    Datetime,
    Date,
}

/// The outcome of reading the time columns of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTime {
    pub time: Option<(DateTime<Utc>, TimeSource)>,

    /// Number of present time columns that could not be parsed.
    pub invalid: u32,
}

impl Record {
    /// The platform, taken from `platform` or else from `platform_name`.
    pub fn platform(&self) -> Option<&str> {
        self.platform
            .as_deref()
            .or(self.platform_name.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub fn mime(&self) -> Option<&str> {
        non_empty(&self.mime)
    }

    pub fn rtype(&self) -> Option<&str> {
        non_empty(&self.rtype)
    }

    pub fn publication_title(&self) -> Option<&str> {
        non_empty(&self.publication_title)
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The derived region name, or the empty string when there is none.
    pub fn region_name(&self) -> &str {
        self.region().unwrap_or_default()
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Platform => self.platform(),
            Field::Mime => self.mime(),
            Field::Rtype => self.rtype(),
            Field::PublicationTitle => self.publication_title(),
            Field::Region => self.region(),
        }
    }

    /// Both geographic columns parsed as latitude and longitude.
    pub fn coordinates(&self) -> Coordinates {
        let (Some(latitude), Some(longitude)) =
            (non_empty(&self.latitude), non_empty(&self.longitude))
        else {
            return Coordinates::Absent;
        };

        match (latitude.trim().parse::<f64>(), longitude.trim().parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) => Coordinates::Valid {
                latitude,
                longitude,
            },
            _ => Coordinates::Invalid,
        }
    }

    /// Reads the record time from, in priority order, `timestamp` (Unix
    /// seconds), `datetime` (ISO-8601) and `date` (`YYYY-MM-DD`).
    ///
    /// A column that is present but cannot be parsed is skipped and counted.
    pub fn parse_time(&self) -> ParsedTime {
        let mut invalid = 0;

        let candidates: [(Option<&str>, TimeSource, fn(&str) -> Option<DateTime<Utc>>); 3] = [
            (non_empty(&self.timestamp), TimeSource::Timestamp, parse_timestamp),
            (non_empty(&self.datetime), TimeSource::Datetime, parse_datetime),
            (non_empty(&self.date), TimeSource::Date, parse_date),
        ];

        for (value, source, parse) in candidates {
            let Some(value) = value else { continue };

            match parse(value.trim()) {
                Some(time) => {
                    return ParsedTime {
                        time: Some((time, source)),
                        invalid,
                    };
                }
                None => invalid += 1,
            }
        }

        ParsedTime {
            time: None,
            invalid,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Utc.timestamp_opt(seconds, 0).single();
    }

    let seconds = value.parse::<f64>().ok().filter(|s| s.is_finite())?;
    Utc.timestamp_millis_opt((seconds * 1000.0).round() as i64).single()
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::default()
    }

    #[test]
    fn timestamp_takes_priority_over_other_time_columns() {
        let r = Record {
            timestamp: Some(String::from("1400000000")),
            datetime: Some(String::from("2020-01-01T00:00:00Z")),
            date: Some(String::from("2021-01-01")),
            ..record()
        };

        let parsed = r.parse_time();

        assert_eq!(
            parsed.time,
            Some((Utc.timestamp_opt(1_400_000_000, 0).unwrap(), TimeSource::Timestamp))
        );
        assert_eq!(parsed.invalid, 0);
    }

    #[test]
    fn fractional_timestamp_is_accepted() {
        let r = Record {
            timestamp: Some(String::from("1400000000.5")),
            ..record()
        };

        let (time, _) = r.parse_time().time.unwrap();

        assert_eq!(time.timestamp_millis(), 1_400_000_000_500);
    }

    #[test]
    fn unparseable_column_falls_through_to_next() {
        let r = Record {
            timestamp: Some(String::from("soon")),
            datetime: Some(String::from("2020-05-06T07:08:09Z")),
            ..record()
        };

        let parsed = r.parse_time();

        assert_eq!(
            parsed.time,
            Some((
                Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap(),
                TimeSource::Datetime
            ))
        );
        assert_eq!(parsed.invalid, 1);
    }

    #[test]
    fn naive_datetime_and_plain_date_are_utc() {
        let naive = Record {
            datetime: Some(String::from("2020-05-06T07:08:09.250")),
            ..record()
        };
        let date = Record {
            date: Some(String::from("2020-05-06")),
            ..record()
        };

        let (naive_time, _) = naive.parse_time().time.unwrap();
        let (date_time, source) = date.parse_time().time.unwrap();

        assert_eq!(naive_time.timestamp_millis() % 1000, 250);
        assert_eq!(date_time, Utc.with_ymd_and_hms(2020, 5, 6, 0, 0, 0).unwrap());
        assert_eq!(source, TimeSource::Date);
    }

    #[test]
    fn no_time_columns_yield_nothing() {
        let parsed = record().parse_time();

        assert_eq!(parsed.time, None);
        assert_eq!(parsed.invalid, 0);
    }

    #[test]
    fn platform_falls_back_to_platform_name() {
        let r = Record {
            platform_name: Some(String::from("JSTOR")),
            ..record()
        };

        assert_eq!(r.platform(), Some("JSTOR"));
        assert_eq!(r.field(Field::Platform), Some("JSTOR"));
    }

    #[test]
    fn coordinates_require_both_columns() {
        let only_lat = Record {
            latitude: Some(String::from("47.0")),
            ..record()
        };
        let both = Record {
            latitude: Some(String::from("47.0")),
            longitude: Some(String::from(" 8.5")),
            ..record()
        };
        let garbage = Record {
            latitude: Some(String::from("north")),
            longitude: Some(String::from("8.5")),
            ..record()
        };

        assert_eq!(only_lat.coordinates(), Coordinates::Absent);
        assert_eq!(
            both.coordinates(),
            Coordinates::Valid {
                latitude: 47.0,
                longitude: 8.5
            }
        );
        assert_eq!(garbage.coordinates(), Coordinates::Invalid);
        assert_eq!(both.region_name(), "");
    }
}
