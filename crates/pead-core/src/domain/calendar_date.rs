use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, Month};

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const COMPACT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Timezone-naive calendar date shared by earnings report dates and daily price bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(Date);

impl CalendarDate {
    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Parses a date or a date-time, keeping only the calendar date as written.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYYMMDD`, `MM/DD/YYYY` and any ISO-like
    /// date-time (`YYYY-MM-DDTHH:MM:SSZ`, `YYYY-MM-DD HH:MM:SS EST`, ...).
    /// Zone suffixes are ignored rather than converted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        if trimmed.len() > 10 {
            let date_part = trimmed.get(..10).ok_or_else(invalid)?;
            let separator = trimmed.as_bytes()[10];
            if separator == b'T' || separator == b' ' {
                return Date::parse(date_part, ISO_DATE)
                    .map(Self)
                    .map_err(|_| invalid());
            }
            return Err(invalid());
        }

        if let Ok(date) = Date::parse(trimmed, ISO_DATE) {
            return Ok(Self(date));
        }

        if trimmed.len() == 8 && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Date::parse(trimmed, COMPACT_DATE)
                .map(Self)
                .map_err(|_| invalid());
        }

        parse_us_date(trimmed).ok_or_else(invalid)
    }

    pub fn format_iso(self) -> String {
        self.0
            .format(ISO_DATE)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }

    pub fn saturating_sub_days(self, days: u32) -> Self {
        Self(
            self.0
                .checked_sub(Duration::days(i64::from(days)))
                .unwrap_or(Date::MIN),
        )
    }

    pub fn saturating_add_days(self, days: u32) -> Self {
        Self(
            self.0
                .checked_add(Duration::days(i64::from(days)))
                .unwrap_or(Date::MAX),
        )
    }
}

fn parse_us_date(input: &str) -> Option<CalendarDate> {
    let mut parts = input.split('/');
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    let year_part = parts.next()?;
    if parts.next().is_some() || year_part.len() != 4 {
        return None;
    }
    let year = year_part.parse::<i32>().ok()?;
    CalendarDate::from_ymd(year, month, day).ok()
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_iso())
    }
}

impl Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_iso())
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive span of calendar dates used for price history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: CalendarDate,
    pub end: CalendarDate,
}

impl DateRange {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange {
                start: start.format_iso(),
                end: end.format_iso(),
            });
        }
        Ok(Self { start, end })
    }

    /// Smallest range covering every date, widened by `padding_days` on each side.
    pub fn spanning<I>(dates: I, padding_days: u32) -> Option<Self>
    where
        I: IntoIterator<Item = CalendarDate>,
    {
        let mut dates = dates.into_iter();
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(min, max), date| {
            (min.min(date), max.max(date))
        });

        Some(Self {
            start: min.saturating_sub_days(padding_days),
            end: max.saturating_add_days(padding_days),
        })
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
