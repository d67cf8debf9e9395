use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// RFC3339 timestamp used on record metadata and clinical events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClinicalDateTime(pub OffsetDateTime);

impl ClinicalDateTime {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    pub fn inner(&self) -> &OffsetDateTime {
        &self.0
    }

    pub fn timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Calendar date portion, in the timestamp's own offset.
    pub fn date(&self) -> PlainDate {
        PlainDate(self.0.date())
    }
}

impl fmt::Display for ClinicalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .0
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for ClinicalDateTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let datetime = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339)
            .map_err(|e| CoreError::invalid_date(format!("Failed to parse timestamp '{s}': {e}")))?;
        Ok(ClinicalDateTime(datetime))
    }
}

impl Serialize for ClinicalDateTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self
            .0
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for ClinicalDateTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ClinicalDateTime::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn now_utc() -> ClinicalDateTime {
    ClinicalDateTime(OffsetDateTime::now_utc())
}

const PLAIN_DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Calendar date (`YYYY-MM-DD`) as stored on birth dates, appointments and
/// report ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlainDate(pub Date);

impl PlainDate {
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn inner(&self) -> &Date {
        &self.0
    }
}

impl fmt::Display for PlainDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(PLAIN_DATE_FORMAT).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for PlainDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let date = Date::parse(s, PLAIN_DATE_FORMAT)
            .map_err(|e| CoreError::invalid_date(format!("Failed to parse date '{s}': {e}")))?;
        Ok(PlainDate(date))
    }
}

impl Serialize for PlainDate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PlainDate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PlainDate::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Whole-year age at `on`, floor semantics: the year difference drops by one
/// when the month/day of `on` falls before the birthday. A birth date in the
/// future yields 0.
pub fn age_on(birth: PlainDate, on: PlainDate) -> u32 {
    if birth > on {
        return 0;
    }
    let mut years = on.0.year() - birth.0.year();
    if (on.0.month() as u8, on.0.day()) < (birth.0.month() as u8, birth.0.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
