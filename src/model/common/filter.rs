use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use thiserror::Error;

use super::poll::TalliedPoll;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid month {0}: expected 1-12")]
    Month(u32),
    #[error("Invalid day {0}: expected 1-31")]
    Day(u32),
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    Date(String),
    #[error("Invalid {0} '{1}': expected a number")]
    NotANumber(&'static str, String),
}

/// Case-insensitive substring match on a title. An empty query matches everything.
pub fn title_matches(title: &str, query: &str) -> bool {
    title.to_lowercase().contains(&query.to_lowercase())
}

/// An end-date filter at year, month or day granularity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DateFilter {
    Year(i32),
    Month { year: i32, month: u32 },
    Day { year: i32, month: u32, day: u32 },
}

impl DateFilter {
    /// Build a filter from its components. Only a prefix (year, year + month,
    /// year + month + day) forms a granular filter; anything else is `None`.
    pub fn from_parts(
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
    ) -> Result<Option<Self>, FilterError> {
        check_month(month)?;
        check_day(day)?;
        Ok(match (year, month, day) {
            (Some(year), None, None) => Some(Self::Year(year)),
            (Some(year), Some(month), None) => Some(Self::Month { year, month }),
            (Some(year), Some(month), Some(day)) => Some(Self::Day { year, month, day }),
            _ => None,
        })
    }

    /// Does `end_date` (in UTC) match every component of this filter?
    pub fn matches(&self, end_date: DateTime<Utc>) -> bool {
        let date = end_date.date_naive();
        match *self {
            Self::Year(year) => date.year() == year,
            Self::Month { year, month } => date.year() == year && date.month() == month,
            Self::Day { year, month, day } => {
                date.year() == year && date.month() == month && date.day() == day
            }
        }
    }
}

/// An end-date filter where every supplied constraint is checked on its own.
///
/// `from` and `to` are inclusive calendar dates. Absent constraints always pass.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateRange {
    pub fn matches(&self, end_date: DateTime<Utc>) -> bool {
        let date = end_date.date_naive();
        self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
            && self.year.map_or(true, |year| date.year() == year)
            && self.month.map_or(true, |month| date.month() == month)
            && self.day.map_or(true, |day| date.day() == day)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Either flavour of date filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DateSelection {
    Any,
    Exact(DateFilter),
    Range(DateRange),
}

impl DateSelection {
    pub fn matches(&self, end_date: DateTime<Utc>) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(filter) => filter.matches(end_date),
            Self::Range(range) => range.matches(end_date),
        }
    }
}

/// Title search plus end-date selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollFilter {
    pub search: Option<String>,
    pub dates: DateSelection,
}

impl PollFilter {
    /// Build a filter from raw query components.
    ///
    /// Bounds, or components that do not form a year / month / day prefix,
    /// select the range variant. Otherwise the granular variant is used.
    pub fn new(
        search: Option<String>,
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self, FilterError> {
        let from = from.map(parse_date).transpose()?;
        let to = to.map(parse_date).transpose()?;

        let dates = match DateFilter::from_parts(year, month, day)? {
            Some(exact) if from.is_none() && to.is_none() => DateSelection::Exact(exact),
            _ => {
                let range = DateRange {
                    from,
                    to,
                    year,
                    month,
                    day,
                };
                if range.is_empty() {
                    DateSelection::Any
                } else {
                    DateSelection::Range(range)
                }
            }
        };

        Ok(Self { search, dates })
    }

    pub fn matches(&self, poll: &TalliedPoll) -> bool {
        self.search
            .as_deref()
            .map_or(true, |query| title_matches(&poll.poll.title, query))
            && self.dates.matches(poll.poll.end_date)
    }

    /// Keep only matching polls, newest first.
    pub fn apply(&self, polls: Vec<TalliedPoll>) -> Vec<TalliedPoll> {
        let mut polls: Vec<_> = polls.into_iter().filter(|p| self.matches(p)).collect();
        polls.sort_by(|a, b| b.poll.created_at.cmp(&a.poll.created_at));
        polls
    }
}

impl Default for PollFilter {
    fn default() -> Self {
        Self {
            search: None,
            dates: DateSelection::Any,
        }
    }
}

fn check_month(month: Option<u32>) -> Result<(), FilterError> {
    match month {
        Some(month) if !(1..=12).contains(&month) => Err(FilterError::Month(month)),
        _ => Ok(()),
    }
}

fn check_day(day: Option<u32>) -> Result<(), FilterError> {
    match day {
        Some(day) if !(1..=31).contains(&day) => Err(FilterError::Day(day)),
        _ => Ok(()),
    }
}

/// Parse one numeric date component from the query string. Blank values
/// count as absent.
pub fn parse_component<T: FromStr>(
    name: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, FilterError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| FilterError::NotANumber(name, value.to_string())),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FilterError::Date(raw.to_string()))
}
