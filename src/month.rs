//! Calendar months and the lenient month parser used by forms and the importer.

use crate::error::{Error, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::fmt;

/// A calendar month, always represented by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        // Day 1 exists in every month, so this cannot fail.
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The calendar month immediately before this one.
    pub fn previous(self) -> Self {
        let (y, m) = if self.month() == 1 {
            (self.year() - 1, 12)
        } else {
            (self.year(), self.month() - 1)
        };
        Self::new(y, m).unwrap_or(self)
    }

    pub fn next(self) -> Self {
        let (y, m) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        Self::new(y, m).unwrap_or(self)
    }

    /// `YYYY-MM`, the format used by query strings, JSON and chart labels.
    pub fn label(self) -> String {
        format!("{:04}-{:02}", self.year(), self.month())
    }

    /// Strict `YYYY-MM` parsing for the dashboard filters.
    pub fn parse_label(raw: &str) -> Option<Self> {
        NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
            .ok()
            .map(Self::from_date)
    }
}

/// Storage form: `YYYY-MM-DD`.
impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl ToSql for Month {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Month {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Self::from_date)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// What a caller hands to the parser.
#[derive(Debug, Clone, Copy)]
pub enum MonthInput<'a> {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(&'a str),
    Missing,
}

impl<'a> From<Option<&'a str>> for MonthInput<'a> {
    fn from(raw: Option<&'a str>) -> Self {
        match raw {
            Some(s) => MonthInput::Text(s),
            None => MonthInput::Missing,
        }
    }
}

/// Outcome of [`parse_month`]: either the input named a month, or nothing
/// matched and the current month was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthParse {
    Parsed(Month),
    Defaulted(Month),
}

impl MonthParse {
    pub fn month(self) -> Month {
        match self {
            MonthParse::Parsed(m) | MonthParse::Defaulted(m) => m,
        }
    }

    pub fn is_defaulted(self) -> bool {
        matches!(self, MonthParse::Defaulted(_))
    }

    pub fn parsed(self) -> Option<Month> {
        match self {
            MonthParse::Parsed(m) => Some(m),
            MonthParse::Defaulted(_) => None,
        }
    }

    /// Rejects a defaulted result, reporting `raw` back to the user.
    pub fn require(self, raw: Option<&str>) -> Result<Month> {
        self.parsed()
            .ok_or_else(|| Error::InvalidMonth(raw.unwrap_or_default().to_string()))
    }
}

enum Pattern {
    Date(&'static str),
    DateTime(&'static str),
    /// Formats without a day; parsed by prefixing or suffixing day 01.
    MonthPrefixed(&'static str),
    MonthSuffixed(&'static str),
}

const PATTERNS: [Pattern; 5] = [
    Pattern::Date("%Y-%m-%d"),
    Pattern::DateTime("%Y-%m-%d %H:%M:%S"),
    Pattern::Date("%d/%m/%Y"),
    Pattern::MonthPrefixed("%d/%m/%Y"),
    Pattern::MonthSuffixed("%Y-%m-%d"),
];

fn try_pattern(pattern: &Pattern, s: &str) -> Option<NaiveDate> {
    match pattern {
        Pattern::Date(fmt) => NaiveDate::parse_from_str(s, fmt).ok(),
        Pattern::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|dt| dt.date()),
        Pattern::MonthPrefixed(fmt) => NaiveDate::parse_from_str(&format!("01/{s}"), fmt).ok(),
        Pattern::MonthSuffixed(fmt) => NaiveDate::parse_from_str(&format!("{s}-01"), fmt).ok(),
    }
}

pub fn parse_month(input: MonthInput<'_>) -> MonthParse {
    parse_month_at(input, Month::current())
}

/// Like [`parse_month`] with an explicit fallback month.
///
/// Text is trimmed and tried against `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`,
/// `DD/MM/YYYY`, `MM/YYYY` and `YYYY-MM`, in that order.
pub fn parse_month_at(input: MonthInput<'_>, fallback: Month) -> MonthParse {
    match input {
        MonthInput::Date(d) => MonthParse::Parsed(Month::from_date(d)),
        MonthInput::DateTime(dt) => MonthParse::Parsed(Month::from_date(dt.date())),
        MonthInput::Text(raw) => {
            let s = raw.trim();
            PATTERNS
                .iter()
                .find_map(|p| try_pattern(p, s))
                .map(|d| MonthParse::Parsed(Month::from_date(d)))
                .unwrap_or(MonthParse::Defaulted(fallback))
        }
        MonthInput::Missing => MonthParse::Defaulted(fallback),
    }
}

/// Inclusive month filter; an open side means "no bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthRange {
    pub from: Option<Month>,
    pub to: Option<Month>,
}

impl MonthRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, month: Month) -> bool {
        self.from.is_none_or(|f| month >= f) && self.to.is_none_or(|t| month <= t)
    }
}
